//! The chat page controller.
//!
//! `Controller` owns every piece of page state and exposes the four flows
//! (status, upload, query, clear). Each flow is split in two synchronous
//! halves so a front end can keep drawing while the request runs:
//!
//! - `begin_*` validates, applies the immediate UI feedback (the user's own
//!   chat bubble, disabled controls) and hands back what to send;
//! - `finish_*` applies the backend result and always restores the controls
//!   it disabled, whichever way the request went.
//!
//! Flows only touch the state they own, so a status poll and a query can be
//! outstanding at the same time without stepping on each other. The async
//! wrappers (`refresh_status`, `upload`, `send_query`, `clear`) run both
//! halves around a backend call for hosts that can hold `&mut self` across
//! the await.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::api::{Backend, ClearResponse, QueryResponse, StatusResponse, UploadResponse};
use crate::error::{FlowError, FlowResult};
use crate::state::{ChatLog, ChatMessage, Notice, NoticeKind, StatusSummary, UploadState};

pub const NO_FILE_MESSAGE: &str = "Please select a PDF file";
pub const QUERY_CONNECTION_FAILED: &str = "Error: Connection failed";
const UNKNOWN_MODEL: &str = "N/A";

/// What a successful upload reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub filename: String,
    pub chunks: u64,
    pub total_documents: Option<u64>,
}

/// What a successful query returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Controller {
    /// Text in the query field.
    pub query_input: String,
    /// Path typed into the file field.
    pub file_input: String,

    chat: ChatLog,
    upload: UploadState,
    uploading_file: Option<String>,
    query_in_flight: bool,
    clear_in_flight: bool,
    confirm_clear_pending: bool,

    status: StatusSummary,
    status_dispatched: u64,
    status_applied: u64,
    status_refresh_due: bool,

    notice: Option<Notice>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn status(&self) -> &StatusSummary {
        &self.status
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_uploading(&self) -> bool {
        self.upload.in_progress
    }

    /// File name of the upload currently in flight, for the busy indicator.
    pub fn uploading_file(&self) -> Option<&str> {
        self.uploading_file.as_deref()
    }

    pub fn is_query_in_flight(&self) -> bool {
        self.query_in_flight
    }

    /// The send control is enabled whenever no query is outstanding.
    pub fn send_enabled(&self) -> bool {
        !self.query_in_flight
    }

    pub fn is_clear_in_flight(&self) -> bool {
        self.clear_in_flight
    }

    pub fn confirm_clear_pending(&self) -> bool {
        self.confirm_clear_pending
    }

    /// Returns true once after a flow asked for a status refresh.
    pub fn take_status_refresh_due(&mut self) -> bool {
        std::mem::take(&mut self.status_refresh_due)
    }

    /// Hide the notice once its display time is over.
    pub fn expire_notice(&mut self, now: Instant) {
        if self.notice.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.notice = None;
        }
    }

    fn show_notice(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.notice = Some(Notice::new(kind, text, Instant::now()));
    }

    // Status

    pub fn begin_status_refresh(&mut self) -> u64 {
        self.status_dispatched += 1;
        debug!(seq = self.status_dispatched, "status refresh dispatched");
        self.status_dispatched
    }

    /// Replace the status summary with the result of poll `seq`.
    ///
    /// A response older than the newest applied one is dropped. Failures are
    /// rendered into the summary instead of being raised.
    pub fn finish_status_refresh(
        &mut self,
        seq: u64,
        result: Result<StatusResponse>,
    ) -> FlowResult<StatusSummary> {
        if seq <= self.status_applied {
            debug!(seq, applied = self.status_applied, "dropping stale status response");
            return Err(FlowError::Ignored("stale status response"));
        }
        self.status_applied = seq;

        match result {
            Ok(response) => {
                self.status = StatusSummary {
                    document_count: response.documents.unwrap_or(0),
                    model_name: response.model.unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
                    error: response.error,
                };
                match &self.status.error {
                    Some(error) => {
                        warn!(%error, "backend reported a status error");
                        Err(FlowError::Application(error.clone()))
                    }
                    None => Ok(self.status.clone()),
                }
            }
            Err(e) => {
                warn!(error = %e, "status poll failed");
                let text = format!("Status unavailable: {}", e);
                self.status = StatusSummary {
                    document_count: 0,
                    model_name: UNKNOWN_MODEL.to_string(),
                    error: Some(text.clone()),
                };
                Err(FlowError::Transport(text))
            }
        }
    }

    pub async fn refresh_status(&mut self, backend: &dyn Backend) -> FlowResult<StatusSummary> {
        let seq = self.begin_status_refresh();
        let result = backend.status().await;
        self.finish_status_refresh(seq, result)
    }

    // Upload

    /// Enter the uploading state and return the file to send.
    pub fn begin_upload(&mut self) -> FlowResult<PathBuf> {
        if self.upload.in_progress {
            debug!("upload requested while another is in flight");
            return Err(FlowError::Ignored("upload already in progress"));
        }

        let path = self.file_input.trim();
        if path.is_empty() {
            self.show_notice(NoticeKind::Error, NO_FILE_MESSAGE);
            return Err(FlowError::Validation(NO_FILE_MESSAGE.to_string()));
        }
        let path = PathBuf::from(path);

        self.upload.in_progress = true;
        self.uploading_file = Some(file_label(&path));
        info!(path = %path.display(), "upload started");
        Ok(path)
    }

    pub fn finish_upload(&mut self, result: Result<UploadResponse>) -> FlowResult<UploadReceipt> {
        // Controls come back first, on every path
        self.upload.in_progress = false;
        let fallback_name = self.uploading_file.take().unwrap_or_default();

        match result {
            Ok(response) if response.success => {
                let receipt = UploadReceipt {
                    filename: response.filename.unwrap_or(fallback_name),
                    chunks: response.chunks.unwrap_or(0),
                    total_documents: response.total_documents,
                };
                let text = format!(
                    "PDF uploaded successfully! Processed {} chunks from {}.",
                    receipt.chunks, receipt.filename
                );
                info!(file = %receipt.filename, chunks = receipt.chunks, "upload complete");

                // The header count updates now; the follow-up poll confirms it
                if let Some(total) = receipt.total_documents {
                    self.status.document_count = total;
                }
                self.show_notice(NoticeKind::Success, text.clone());
                self.chat.push(ChatMessage::system(format!("✓ {}", text)));
                self.file_input.clear();
                self.status_refresh_due = true;
                Ok(receipt)
            }
            Ok(response) => {
                let message = response.message.unwrap_or_else(|| "Unknown error".to_string());
                warn!(%message, "upload rejected");
                self.show_notice(NoticeKind::Error, format!("Error: {}", message));
                Err(FlowError::Application(message))
            }
            Err(e) => {
                warn!(error = %e, "upload failed");
                let text = format!("Upload error: {}", e);
                self.show_notice(NoticeKind::Error, text.clone());
                Err(FlowError::Transport(text))
            }
        }
    }

    pub async fn upload(&mut self, backend: &dyn Backend) -> FlowResult<UploadReceipt> {
        let path = self.begin_upload()?;
        let result = backend.upload(&path).await;
        self.finish_upload(result)
    }

    // Query

    /// Record the user's message, lock the send control and return the query.
    pub fn begin_query(&mut self) -> FlowResult<String> {
        if self.query_in_flight {
            return Err(FlowError::Ignored("query already in flight"));
        }

        let query = self.query_input.trim().to_string();
        if query.is_empty() {
            return Err(FlowError::Ignored("empty query"));
        }

        self.chat.push(ChatMessage::user(query.clone()));
        self.query_input.clear();
        self.query_in_flight = true;
        debug!(len = query.len(), "query dispatched");
        Ok(query)
    }

    /// Append exactly one assistant message for the outstanding query.
    pub fn finish_query(&mut self, result: Result<QueryResponse>) -> FlowResult<QueryAnswer> {
        if !self.query_in_flight {
            return Err(FlowError::Ignored("no query in flight"));
        }
        self.query_in_flight = false;

        match result {
            Ok(response) if response.success => {
                let answer = QueryAnswer {
                    answer: response.answer.unwrap_or_else(|| "No response".to_string()),
                    sources: response.sources,
                };
                info!(sources = answer.sources.len(), "query answered");
                self.chat
                    .push(ChatMessage::assistant(answer.answer.clone(), answer.sources.clone()));
                Ok(answer)
            }
            Ok(response) => {
                let message = response
                    .message
                    .unwrap_or_else(|| "Failed to get response".to_string());
                warn!(%message, "query rejected");
                self.chat
                    .push(ChatMessage::assistant(format!("Error: {}", message), Vec::new()));
                Err(FlowError::Application(message))
            }
            Err(e) => {
                warn!(error = %e, "query failed");
                self.chat
                    .push(ChatMessage::assistant(QUERY_CONNECTION_FAILED, Vec::new()));
                Err(FlowError::Transport(e.to_string()))
            }
        }
    }

    pub async fn send_query(&mut self, backend: &dyn Backend) -> FlowResult<QueryAnswer> {
        let query = self.begin_query()?;
        let result = backend.query(&query).await;
        self.finish_query(result)
    }

    // Clear

    /// Ask for confirmation before wiping the database.
    pub fn request_clear(&mut self) {
        self.confirm_clear_pending = true;
    }

    /// Answer the confirmation. `Ok` means the clear request should be sent.
    pub fn resolve_clear(&mut self, accepted: bool) -> FlowResult<()> {
        self.confirm_clear_pending = false;
        if !accepted {
            debug!("clear declined");
            return Err(FlowError::Ignored("clear declined"));
        }
        if self.clear_in_flight {
            return Err(FlowError::Ignored("clear already in flight"));
        }
        self.clear_in_flight = true;
        info!("clearing database");
        Ok(())
    }

    pub fn finish_clear(&mut self, result: Result<ClearResponse>) -> FlowResult<()> {
        self.clear_in_flight = false;

        match result {
            Ok(response) if response.success => {
                info!("database cleared");
                self.chat.clear();
                self.show_notice(NoticeKind::Success, "Database cleared successfully!");
                self.status_refresh_due = true;
                Ok(())
            }
            Ok(response) => {
                let message = response.message.unwrap_or_else(|| "Unknown error".to_string());
                warn!(%message, "clear rejected");
                self.show_notice(NoticeKind::Error, format!("Error: {}", message));
                Err(FlowError::Application(message))
            }
            Err(e) => {
                warn!(error = %e, "clear failed");
                let text = format!("Error clearing database: {}", e);
                self.show_notice(NoticeKind::Error, text.clone());
                Err(FlowError::Transport(text))
            }
        }
    }

    /// Run the whole clear flow with an already collected confirmation.
    pub async fn clear(&mut self, backend: &dyn Backend, confirmed: bool) -> FlowResult<()> {
        self.request_clear();
        self.resolve_clear(confirmed)?;
        let result = backend.clear().await;
        self.finish_clear(result)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_upload_without_file_is_validation_error() {
        let mut controller = Controller::new();
        controller.file_input = "   ".to_string();

        let err = controller.begin_upload().unwrap_err();
        assert_eq!(err, FlowError::Validation(NO_FILE_MESSAGE.to_string()));
        assert!(!controller.is_uploading());
        assert_eq!(controller.notice().map(|n| n.kind), Some(NoticeKind::Error));
    }

    #[test]
    fn test_upload_restores_controls_on_transport_error() {
        let mut controller = Controller::new();
        controller.file_input = "/tmp/report.pdf".to_string();

        let path = controller.begin_upload().unwrap();
        assert_eq!(path, PathBuf::from("/tmp/report.pdf"));
        assert!(controller.is_uploading());
        assert_eq!(controller.uploading_file(), Some("report.pdf"));

        let err = controller
            .finish_upload(Err(anyhow!("connection refused")))
            .unwrap_err();
        assert_eq!(
            err,
            FlowError::Transport("Upload error: connection refused".to_string())
        );
        assert!(!controller.is_uploading());
        assert_eq!(controller.uploading_file(), None);
        // The path stays so the user can retry
        assert_eq!(controller.file_input, "/tmp/report.pdf");
    }

    #[test]
    fn test_upload_success_falls_back_to_local_name() {
        let mut controller = Controller::new();
        controller.file_input = "docs/f.pdf".to_string();
        controller.begin_upload().unwrap();

        let receipt = controller
            .finish_upload(Ok(UploadResponse {
                success: true,
                chunks: Some(4),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(receipt.filename, "f.pdf");
        assert_eq!(receipt.chunks, 4);
        assert!(controller.file_input.is_empty());
        assert!(controller.take_status_refresh_due());
        assert!(!controller.take_status_refresh_due());
    }

    #[test]
    fn test_upload_total_updates_document_count() {
        let mut controller = Controller::new();
        controller.file_input = "f.pdf".to_string();
        controller.begin_upload().unwrap();

        let receipt = controller
            .finish_upload(Ok(UploadResponse {
                success: true,
                chunks: Some(2),
                filename: Some("f.pdf".to_string()),
                total_documents: Some(14),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(receipt.total_documents, Some(14));
        assert_eq!(controller.status().document_count, 14);
    }

    #[test]
    fn test_stale_status_is_dropped() {
        let mut controller = Controller::new();
        let first = controller.begin_status_refresh();
        let second = controller.begin_status_refresh();

        let fresh = StatusResponse {
            documents: Some(5),
            model: Some("mistral".to_string()),
            ..Default::default()
        };
        controller.finish_status_refresh(second, Ok(fresh)).unwrap();

        let stale = StatusResponse {
            documents: Some(1),
            ..Default::default()
        };
        let err = controller.finish_status_refresh(first, Ok(stale)).unwrap_err();
        assert!(err.is_silent());
        assert_eq!(controller.status().document_count, 5);
        assert_eq!(controller.status().model_name, "mistral");
    }

    #[test]
    fn test_status_missing_fields_replace_wholesale() {
        let mut controller = Controller::new();
        let seq = controller.begin_status_refresh();
        controller
            .finish_status_refresh(
                seq,
                Ok(StatusResponse {
                    documents: Some(9),
                    model: Some("gpt".to_string()),
                    ..Default::default()
                }),
            )
            .unwrap();

        let seq = controller.begin_status_refresh();
        controller
            .finish_status_refresh(seq, Ok(StatusResponse::default()))
            .unwrap();
        assert_eq!(controller.status().document_count, 0);
        assert_eq!(controller.status().display_model(), UNKNOWN_MODEL);
    }

    #[test]
    fn test_status_transport_error_is_displayed() {
        let mut controller = Controller::new();
        let seq = controller.begin_status_refresh();
        let err = controller
            .finish_status_refresh(seq, Err(anyhow!("connection refused")))
            .unwrap_err();
        assert!(matches!(err, FlowError::Transport(_)));
        assert_eq!(
            controller.status().display_model(),
            "Status unavailable: connection refused"
        );

        // The next tick recovers
        let seq = controller.begin_status_refresh();
        controller
            .finish_status_refresh(
                seq,
                Ok(StatusResponse {
                    documents: Some(2),
                    model: Some("mistral".to_string()),
                    ..Default::default()
                }),
            )
            .unwrap();
        assert_eq!(controller.status().display_model(), "mistral");
    }

    #[test]
    fn test_late_query_result_without_request_is_dropped() {
        let mut controller = Controller::new();
        let err = controller
            .finish_query(Ok(QueryResponse::default()))
            .unwrap_err();
        assert!(err.is_silent());
        assert!(controller.chat().is_empty());
    }

    #[test]
    fn test_notice_expires() {
        let mut controller = Controller::new();
        controller.file_input.clear();
        let _ = controller.begin_upload();
        assert!(controller.notice().is_some());

        controller.expire_notice(Instant::now());
        assert!(controller.notice().is_some());

        controller.expire_notice(Instant::now() + crate::state::NOTICE_TTL);
        assert!(controller.notice().is_none());
    }
}
