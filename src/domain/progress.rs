use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub action: String,
    pub status: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(action: &str, status: &str, message: impl Into<String>) -> Self {
        LogEntry {
            action: action.to_string(),
            status: status.to_string(),
            message: message.into(),
        }
    }
}

/// Discrete frames pushed over the live-progress channel. Consumers render
/// these as an append-only activity feed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Status {
        message: String,
    },
    Log {
        entry: LogEntry,
    },
    LogsBatch {
        entries: Vec<LogEntry>,
    },
    Screenshot {
        url: String,
        /// Base64-encoded png payload, so a consumer can render the frame
        /// without a round trip to the artifact url.
        data: String,
        current_url: String,
        logs: Vec<LogEntry>,
    },
    Error {
        message: String,
    },
}

impl ProgressEvent {
    /// Name written on the SSE `event:` line.
    pub fn event_name(&self) -> &'static str {
        match self {
            ProgressEvent::Status { .. } => "status",
            ProgressEvent::Log { .. } => "log",
            ProgressEvent::LogsBatch { .. } => "logs_batch",
            ProgressEvent::Screenshot { .. } => "screenshot",
            ProgressEvent::Error { .. } => "error",
        }
    }
}

/// Event plus its origin, as delivered to a campaign's subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressFrame {
    pub company_id: Option<Uuid>,
    #[serde(flatten)]
    pub event: ProgressEvent,
}
