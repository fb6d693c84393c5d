//! Chat-webhook notifier (Discord-compatible `{"content": ...}` payload).
//!
//! Events go through a bounded channel to a background worker so the event
//! loop never waits on HTTP. A full or closed queue drops the event with a
//! warning.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use super::{Event, Notifier};

/// Discord caps message content at 2000 characters.
const MAX_CONTENT_CHARS: usize = 2000;

/// Configuration for the webhook notifier.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    /// Queue depth before events are dropped.
    pub queue_capacity: usize,
    /// Forward candidate alerts (the noisiest event kind).
    pub notify_alerts: bool,
    pub timeout: Duration,
}

impl WebhookConfig {
    /// Config with defaults for everything but the URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            queue_capacity: 256,
            notify_alerts: true,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Webhook notifier that posts plain-text messages.
pub struct WebhookNotifier {
    sender: mpsc::Sender<Event>,
    notify_alerts: bool,
}

impl WebhookNotifier {
    /// Create a new webhook notifier and spawn the background task.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(config: WebhookConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let notify_alerts = config.notify_alerts;
        tokio::spawn(webhook_worker(config, receiver));
        Self {
            sender,
            notify_alerts,
        }
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: Event) {
        if matches!(event, Event::CandidateAlert(_)) && !self.notify_alerts {
            return;
        }
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Webhook queue full, dropping notification"),
            Err(TrySendError::Closed(_)) => warn!("Webhook notifier channel closed"),
        }
    }
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Background worker that posts webhook messages.
async fn webhook_worker(config: WebhookConfig, mut receiver: mpsc::Receiver<Event>) {
    let client = match Client::builder().timeout(config.timeout).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Failed to build webhook client, notifications disabled");
            return;
        }
    };

    info!("Webhook notifier started");

    while let Some(event) = receiver.recv().await {
        let text = event.message();
        let payload = WebhookPayload {
            content: truncate(&text),
        };
        match client.post(&config.url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => debug!("Webhook delivered"),
            Ok(resp) => warn!(status = %resp.status(), "Webhook rejected message"),
            Err(e) => warn!(error = %e, "Failed to send webhook message"),
        }
    }

    debug!("Webhook worker shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_messages_on_char_boundary() {
        let long = "é".repeat(MAX_CONTENT_CHARS + 10);
        assert_eq!(truncate(&long).chars().count(), MAX_CONTENT_CHARS);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn payload_shape() {
        let json = serde_json::to_string(&WebhookPayload { content: "hi" }).unwrap();
        assert_eq!(json, r#"{"content":"hi"}"#);
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let (sender, _receiver) = mpsc::channel(1);
        let notifier = WebhookNotifier {
            sender,
            notify_alerts: true,
        };
        for _ in 0..5 {
            notifier.notify(Event::RunFinished {
                reason: "deadline".into(),
            });
        }
        assert_eq!(notifier.sender.capacity(), 0);
    }
}
