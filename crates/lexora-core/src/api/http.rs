use std::path::Path;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use super::types::{ClearResponse, QueryRequest, QueryResponse, StatusResponse, UploadResponse};
use super::Backend;

const PDF_MIME: &str = "application/pdf";

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

/// Decode a JSON body, keeping the server's message on error statuses.
///
/// The backend answers 4xx/5xx with `{"success": false, "message": ...}`; that
/// body is an application failure, not a transport one. Anything else with a
/// bad status is reported as `"<action> failed: HTTP <code>"`.
async fn decode<T: DeserializeOwned>(response: Response, action: &str) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        return serde_json::from_slice(&body)
            .with_context(|| format!("{} returned malformed JSON", action));
    }

    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) if value.get("message").is_some() => Ok(serde_json::from_value(value)?),
        _ => Err(anyhow!("{} failed: HTTP {}", action, status)),
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn status(&self) -> Result<StatusResponse> {
        let response = self.client.get(self.url("/status")).send().await?;
        decode(response, "Status").await
    }

    async fn upload(&self, path: &Path) -> Result<UploadResponse> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Could not read {}", path.display()))?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.pdf")
            .to_string();

        tracing::debug!(file = %file_name, bytes = bytes.len(), "sending upload");

        let part = Part::bytes(bytes).file_name(file_name).mime_str(PDF_MIME)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;

        decode(response, "Upload").await
    }

    async fn query(&self, query: &str) -> Result<QueryResponse> {
        let response = self
            .client
            .post(self.url("/query"))
            .json(&QueryRequest { query })
            .send()
            .await?;

        decode(response, "Query").await
    }

    async fn clear(&self) -> Result<ClearResponse> {
        let response = self.client.post(self.url("/clear")).send().await?;
        decode(response, "Clear").await
    }
}
