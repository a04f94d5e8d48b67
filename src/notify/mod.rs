//! Notification delivery.
//!
//! This module handles:
//! - The fire-and-forget notifier seam used by the scan loop and session
//! - Discord webhook delivery on a background worker
//! - Message formatting shared by console and Discord
//!
//! Delivery failures are logged and counted, never propagated: a dead
//! webhook must not stop monitoring.

pub mod discord;
pub mod format;

use std::sync::{Arc, Mutex};

use strum::Display;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::Config;

pub use discord::{drain, DiscordNotifier};

/// Destination of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
    /// Alerts and trade tables.
    Primary,
    /// Scan summaries, errors and diagnostics.
    Log,
}

/// Sink for operator notifications.
pub trait Notifier: Send + Sync {
    /// Queue a message for delivery.
    ///
    /// Must return quickly; slow delivery belongs on a background task.
    fn notify(&self, channel: Channel, message: String);
}

/// Notifier used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, channel: Channel, message: String) {
        debug!(%channel, chars = message.len(), "Notifications disabled, dropping message");
    }
}

/// Notifier that keeps every message in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<(Channel, String)>>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded messages in delivery order.
    pub fn messages(&self) -> Vec<(Channel, String)> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Recorded messages for one channel.
    pub fn on(&self, channel: Channel) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, channel: Channel, message: String) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((channel, message));
        }
    }
}

/// Build the notifier for a configuration.
///
/// Returns the worker handle when a Discord worker was spawned so the
/// caller can wait for queued messages on shutdown. Must be called inside a
/// Tokio runtime.
pub fn notifier_from_config(
    config: &Config,
) -> Result<(Arc<dyn Notifier>, Option<JoinHandle<()>>), reqwest::Error> {
    if config.discord_webhook_url.is_none() && config.discord_log_webhook_url.is_none() {
        return Ok((Arc::new(NoopNotifier), None));
    }

    let (notifier, worker) = DiscordNotifier::spawn(config)?;
    Ok((Arc::new(notifier), Some(worker)))
}
