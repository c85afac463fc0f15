pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod render;
pub mod state;

// Re-export main types for convenience
pub use api::{Backend, HttpBackend};
pub use config::Config;
pub use controller::{Controller, QueryAnswer, UploadReceipt};
pub use error::{FlowError, FlowResult};
pub use state::{ChatLog, ChatMessage, ChatRole, Notice, NoticeKind, StatusSummary, UploadState};
