use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use lexora_core::render::citation_lines;
use lexora_core::{Backend, ChatRole, Controller, FlowError};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    FileInput,
    QueryInput,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: Focus,
    pub controller: Controller,

    // Input cursors (char index into the controller's input fields)
    pub file_cursor: usize,
    pub query_cursor: usize,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of chat area for scroll calculations
    pub chat_width: u16,  // Inner width of chat area for wrap calculations
    pub follow_tail: bool,
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Backend
    pub server_url: String,
    backend: Arc<dyn Backend>,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(backend: Arc<dyn Backend>, events: UnboundedSender<AppEvent>, server_url: String) -> Self {
        Self {
            should_quit: false,
            focus: Focus::QueryInput,
            controller: Controller::new(),

            file_cursor: 0,
            query_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_tail: true,
            chat_area: None,

            animation_frame: 0,

            server_url,
            backend,
            events,
        }
    }

    /// Run `request` on its own task and post the result back as an event.
    ///
    /// The request runs inside a nested task so a panic still produces a
    /// result event and the flow that started it can restore its controls.
    fn spawn_request<T, F, E>(&self, request: F, into_event: E)
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
        E: FnOnce(Result<T>) -> AppEvent + Send + 'static,
    {
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = match tokio::spawn(request).await {
                Ok(result) => result,
                Err(e) => Err(anyhow!("request task failed: {}", e)),
            };
            if tx.send(into_event(result)).is_err() {
                tracing::debug!("event channel closed before request finished");
            }
        });
    }

    pub fn dispatch_status_refresh(&mut self) {
        let seq = self.controller.begin_status_refresh();
        let backend = Arc::clone(&self.backend);
        self.spawn_request(
            async move { backend.status().await },
            move |result| AppEvent::Status { seq, result },
        );
    }

    pub fn submit_upload(&mut self) {
        match self.controller.begin_upload() {
            Ok(path) => {
                let backend = Arc::clone(&self.backend);
                self.spawn_request(async move { backend.upload(&path).await }, AppEvent::Upload);
            }
            Err(e) => log_skipped("upload", &e),
        }
    }

    pub fn submit_query(&mut self) {
        match self.controller.begin_query() {
            Ok(query) => {
                self.query_cursor = 0;
                self.scroll_chat_to_bottom();
                let backend = Arc::clone(&self.backend);
                self.spawn_request(async move { backend.query(&query).await }, AppEvent::Query);
            }
            Err(e) => log_skipped("query", &e),
        }
    }

    pub fn request_clear(&mut self) {
        self.controller.request_clear();
    }

    pub fn resolve_clear(&mut self, accepted: bool) {
        match self.controller.resolve_clear(accepted) {
            Ok(()) => {
                let backend = Arc::clone(&self.backend);
                self.spawn_request(async move { backend.clear().await }, AppEvent::Clear);
            }
            Err(e) => log_skipped("clear", &e),
        }
    }

    /// Apply a finished request to the page.
    pub fn apply_response(&mut self, event: AppEvent) {
        match event {
            AppEvent::Status { seq, result } => {
                let _ = self.controller.finish_status_refresh(seq, result);
            }
            AppEvent::Upload(result) => {
                let _ = self.controller.finish_upload(result);
                self.file_cursor = self.file_cursor.min(self.controller.file_input.chars().count());
                self.scroll_chat_to_bottom();
            }
            AppEvent::Query(result) => {
                let _ = self.controller.finish_query(result);
                self.scroll_chat_to_bottom();
            }
            AppEvent::Clear(result) => {
                if self.controller.finish_clear(result).is_ok() {
                    self.chat_scroll = 0;
                }
            }
            _ => {}
        }

        if self.controller.take_status_refresh_due() {
            self.dispatch_status_refresh();
        }
    }

    /// Tick animation frame and expire notices (called by Tick event)
    pub fn tick(&mut self) {
        if self.controller.is_query_in_flight() || self.controller.is_uploading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.controller.expire_notice(Instant::now());
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::FileInput => Focus::QueryInput,
            Focus::QueryInput => Focus::FileInput,
        };
    }

    // Chat scrolling
    pub fn scroll_chat_down(&mut self, lines: u16) {
        let max_scroll = self.chat_line_count().saturating_sub(self.visible_chat_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
        self.follow_tail = self.chat_scroll >= max_scroll;
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    /// Scroll chat to bottom so the newest message (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        self.follow_tail = true;
        self.chat_scroll = self
            .chat_line_count()
            .saturating_sub(self.visible_chat_height());
    }

    fn visible_chat_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Estimated wrapped line count of the chat as drawn by the UI.
    pub fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let wrapped = |text: &str| -> u16 {
            // Use character count, not byte length, for proper UTF-8 handling
            let char_count = text.chars().count();
            if char_count == 0 {
                1 // Empty line still takes one line
            } else {
                char_count.div_ceil(wrap_width).min(u16::MAX as usize) as u16
            }
        };

        let mut total_lines: u16 = 0;
        for msg in self.controller.chat().messages() {
            if msg.role != ChatRole::System {
                total_lines = total_lines.saturating_add(1); // Role line ("You:" or "AI:")
            }
            for line in msg.content.lines() {
                total_lines = total_lines.saturating_add(wrapped(line));
            }
            for line in citation_lines(&msg.sources) {
                total_lines = total_lines.saturating_add(wrapped(&line));
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.controller.is_query_in_flight() {
            total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
        }

        total_lines
    }
}

fn log_skipped(flow: &str, error: &FlowError) {
    if error.is_silent() {
        tracing::debug!(flow, %error, "action skipped");
    } else {
        tracing::info!(flow, %error, "action rejected");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lexora_core::api::{ClearResponse, QueryResponse, StatusResponse, UploadResponse};
    use lexora_core::NoticeKind;
    use tokio::sync::mpsc;

    /// Echoes queries, refuses uploads, and counts every call.
    #[derive(Default)]
    pub(crate) struct EchoBackend {
        calls: AtomicUsize,
    }

    impl EchoBackend {
        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Backend for EchoBackend {
        async fn status(&self) -> Result<StatusResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StatusResponse {
                documents: Some(1),
                model: Some("mistral".to_string()),
                ..Default::default()
            })
        }

        async fn upload(&self, _path: &Path) -> Result<UploadResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("connection refused"))
        }

        async fn query(&self, query: &str) -> Result<QueryResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(QueryResponse {
                success: true,
                answer: Some(format!("echo: {}", query)),
                ..Default::default()
            })
        }

        async fn clear(&self) -> Result<ClearResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ClearResponse {
                success: true,
                ..Default::default()
            })
        }
    }

    pub(crate) fn test_app() -> (App, Arc<EchoBackend>, mpsc::UnboundedReceiver<AppEvent>) {
        let backend = Arc::new(EchoBackend::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(backend.clone(), tx, "http://test".to_string());
        (app, backend, rx)
    }

    #[tokio::test]
    async fn test_query_round_trip_through_events() {
        let (mut app, backend, mut rx) = test_app();
        app.controller.query_input = "hi there".to_string();
        app.query_cursor = 8;

        app.submit_query();
        assert_eq!(app.controller.chat().len(), 1);
        assert!(!app.controller.send_enabled());
        assert_eq!(app.query_cursor, 0);

        let event = rx.recv().await.unwrap();
        app.apply_response(event);

        let messages = app.controller.chat().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert_eq!(messages[1].content, "echo: hi there");
        assert!(app.controller.send_enabled());
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_upload_restores_controls() {
        let (mut app, _backend, mut rx) = test_app();
        app.controller.file_input = "report.pdf".to_string();

        app.submit_upload();
        assert!(app.controller.is_uploading());
        app.submit_upload();

        let event = rx.recv().await.unwrap();
        app.apply_response(event);
        assert!(!app.controller.is_uploading());
        assert_eq!(
            app.controller.notice().map(|n| n.kind),
            Some(NoticeKind::Error)
        );
        // The second submit never produced a request
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_clear_refreshes_status() {
        let (mut app, backend, mut rx) = test_app();

        app.request_clear();
        app.resolve_clear(false);
        assert!(!app.controller.confirm_clear_pending());
        assert_eq!(backend.calls(), 0);

        app.request_clear();
        app.resolve_clear(true);
        let event = rx.recv().await.unwrap();
        app.apply_response(event);

        // A successful clear schedules a status poll
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AppEvent::Status { .. }));
        app.apply_response(event);
        assert_eq!(backend.calls(), 2);
        assert_eq!(app.controller.status().document_count, 1);
    }

    #[test]
    fn test_chat_line_count_wraps() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(EchoBackend::default()), tx, String::new());
        app.chat_width = 10;
        assert_eq!(app.chat_line_count(), 0);

        app.controller.query_input = "x".repeat(25);
        // begin_query records the message without needing a runtime
        app.controller.begin_query().unwrap();
        // role line + 3 wrapped lines + blank line + thinking indicator
        assert_eq!(app.chat_line_count(), 1 + 3 + 1 + 2);
    }

    #[test]
    fn test_chat_line_count_saturates_on_long_sessions() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(EchoBackend::default()), tx, String::new());
        app.chat_width = 80;

        for i in 0..11_000 {
            app.controller.query_input = format!("question {}", i);
            app.controller.begin_query().unwrap();
            app.controller
                .finish_query(Ok(QueryResponse {
                    success: true,
                    answer: Some("short".to_string()),
                    ..Default::default()
                }))
                .unwrap();
        }
        assert_eq!(app.chat_line_count(), u16::MAX);

        app.scroll_chat_to_bottom();
        assert_eq!(app.chat_scroll, u16::MAX - 20);
    }

    #[test]
    fn test_chat_line_count_huge_message_does_not_truncate() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(Arc::new(EchoBackend::default()), tx, String::new());
        app.chat_width = 1;

        app.controller.query_input = "x".repeat(70_000);
        app.controller.begin_query().unwrap();
        assert_eq!(app.chat_line_count(), u16::MAX);
    }
}
