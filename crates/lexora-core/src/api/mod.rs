pub mod http;
pub mod types;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

pub use http::HttpBackend;
pub use types::{ClearResponse, QueryResponse, StatusResponse, UploadResponse};

/// The four endpoints exposed by the document backend.
///
/// An `Err` from any method is a transport error: the request never produced
/// a usable JSON body (connection refused, unexpected HTTP status, malformed
/// payload, unreadable upload file). Application failures come back as
/// `Ok` with `success: false`.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn status(&self) -> Result<StatusResponse>;

    async fn upload(&self, path: &Path) -> Result<UploadResponse>;

    async fn query(&self, query: &str) -> Result<QueryResponse>;

    async fn clear(&self) -> Result<ClearResponse>;
}
