//! User-visible notifications
//!
//! Mutations report their outcome as transient toasts. The dashboard shell
//! subscribes and renders them; nothing is persisted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
}

/// Transient confirmation or error message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Toast {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            title: title.into(),
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            title: title.into(),
            description: Some(description.into()),
            created_at: Utc::now(),
        }
    }
}

/// Broadcast sink for toasts
#[derive(Clone)]
pub struct Notifier {
    broadcast: Arc<broadcast::Sender<Toast>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self {
            broadcast: Arc::new(tx),
        }
    }

    /// Subscribe to toasts
    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.broadcast.subscribe()
    }

    pub fn notify(&self, toast: Toast) {
        // Dropped when no view is listening
        let _ = self.broadcast.send(toast);
    }

    pub fn success(&self, title: impl Into<String>) {
        self.notify(Toast::success(title));
    }

    pub fn error(&self, title: impl Into<String>, description: impl Into<String>) {
        self.notify(Toast::error(title, description));
    }
}
