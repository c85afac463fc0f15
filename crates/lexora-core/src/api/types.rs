//! JSON bodies exchanged with the document backend.
//!
//! Every field carries a default: the backend omits fields freely (for
//! example `/status` drops `error` when healthy and `/upload` only sends
//! `message` on failure), and a missing field must never turn into a
//! decode error.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug, Clone)]
pub(crate) struct QueryRequest<'a> {
    pub query: &'a str,
}

/// `GET /status`
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StatusResponse {
    pub documents: Option<u64>,
    pub model: Option<String>,
    pub error: Option<String>,
}

/// `POST /upload`
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct UploadResponse {
    pub success: bool,
    pub chunks: Option<u64>,
    pub filename: Option<String>,
    pub message: Option<String>,
    pub total_documents: Option<u64>,
}

/// `POST /query`
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct QueryResponse {
    pub success: bool,
    pub answer: Option<String>,
    pub sources: Vec<String>,
    pub message: Option<String>,
}

/// `POST /clear`
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ClearResponse {
    pub success: bool,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tolerates_missing_fields() {
        let status: StatusResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(status, StatusResponse::default());

        let status: StatusResponse =
            serde_json::from_str(r#"{"documents": 12, "model": "mistral-7b"}"#).unwrap();
        assert_eq!(status.documents, Some(12));
        assert_eq!(status.model.as_deref(), Some("mistral-7b"));
        assert!(status.error.is_none());
    }

    #[test]
    fn test_status_error_payload() {
        let body = r#"{"success": false, "message": "boom", "documents": 0, "model": "Error", "error": "boom"}"#;
        let status: StatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(status.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_upload_failure_has_only_message() {
        let body = r#"{"success": false, "message": "Only PDF files allowed"}"#;
        let upload: UploadResponse = serde_json::from_str(body).unwrap();
        assert!(!upload.success);
        assert_eq!(upload.chunks, None);
        assert_eq!(upload.message.as_deref(), Some("Only PDF files allowed"));
    }

    #[test]
    fn test_query_success_with_extra_fields() {
        let body = r#"{"success": true, "answer": "42", "sources": ["a.pdf:1"], "query": "why"}"#;
        let query: QueryResponse = serde_json::from_str(body).unwrap();
        assert!(query.success);
        assert_eq!(query.answer.as_deref(), Some("42"));
        assert_eq!(query.sources, vec!["a.pdf:1".to_string()]);
    }

    #[test]
    fn test_query_request_shape() {
        let body = serde_json::to_string(&QueryRequest { query: "hello" }).unwrap();
        assert_eq!(body, r#"{"query":"hello"}"#);
    }
}
