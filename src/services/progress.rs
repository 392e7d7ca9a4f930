use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::progress::{LogEntry, ProgressEvent, ProgressFrame};

const CHANNEL_CAPACITY: usize = 256;

/// Per-campaign broadcast channels behind one handle. Subscribers come and
/// go (a monitoring tab closing ends that subscription only); emitting with
/// no subscriber is routine and not an error.
#[derive(Clone)]
pub struct ProgressHub {
    senders: Arc<Mutex<HashMap<Uuid, broadcast::Sender<ProgressFrame>>>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        ProgressHub {
            senders: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn subscribe(&self, campaign_id: Uuid) -> broadcast::Receiver<ProgressFrame> {
        self.sender_for(campaign_id).subscribe()
    }

    pub fn emit(&self, campaign_id: Uuid, company_id: Option<Uuid>, event: ProgressEvent) {
        let frame = ProgressFrame { company_id, event };
        // Err here only means nobody is watching right now.
        let _ = self.sender_for(campaign_id).send(frame);
    }

    fn sender_for(&self, campaign_id: Uuid) -> broadcast::Sender<ProgressFrame> {
        let mut senders = self.senders.lock().unwrap();
        senders
            .entry(campaign_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Emission handle scoped to one company run.
#[derive(Clone)]
pub struct RunReporter {
    hub: ProgressHub,
    campaign_id: Uuid,
    company_id: Uuid,
}

impl RunReporter {
    pub fn new(hub: ProgressHub, campaign_id: Uuid, company_id: Uuid) -> Self {
        RunReporter {
            hub,
            campaign_id,
            company_id,
        }
    }

    pub fn status(&self, message: impl Into<String>) {
        self.hub.emit(
            self.campaign_id,
            Some(self.company_id),
            ProgressEvent::Status {
                message: message.into(),
            },
        );
    }

    pub fn log(&self, action: &str, status: &str, message: impl Into<String>) {
        self.hub.emit(
            self.campaign_id,
            Some(self.company_id),
            ProgressEvent::Log {
                entry: LogEntry::new(action, status, message),
            },
        );
    }

    pub fn logs_batch(&self, entries: Vec<LogEntry>) {
        if entries.is_empty() {
            return;
        }
        self.hub.emit(
            self.campaign_id,
            Some(self.company_id),
            ProgressEvent::LogsBatch { entries },
        );
    }

    pub fn screenshot(
        &self,
        url: impl Into<String>,
        data: impl Into<String>,
        current_url: impl Into<String>,
        logs: Vec<LogEntry>,
    ) {
        self.hub.emit(
            self.campaign_id,
            Some(self.company_id),
            ProgressEvent::Screenshot {
                url: url.into(),
                data: data.into(),
                current_url: current_url.into(),
                logs,
            },
        );
    }

    pub fn error(&self, message: impl Into<String>) {
        self.hub.emit(
            self.campaign_id,
            Some(self.company_id),
            ProgressEvent::Error {
                message: message.into(),
            },
        );
    }
}
