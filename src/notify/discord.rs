//! Discord webhook notifier.
//!
//! Messages are queued on an unbounded channel and posted in order by a
//! single background worker, so callers never wait on the network.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::format::{for_discord_log, truncate_for_discord};
use super::{Channel, Notifier};
use crate::config::Config;
use crate::metrics;

/// Webhook request body.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
    username: &'a str,
}

/// Webhook endpoints and identity for the worker.
#[derive(Debug, Clone)]
struct DiscordTargets {
    primary: Option<String>,
    log: Option<String>,
    username: String,
}

impl DiscordTargets {
    fn url(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Primary => self.primary.as_deref(),
            Channel::Log => self.log.as_deref(),
        }
    }
}

/// Notifier posting to Discord webhooks.
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    sender: mpsc::UnboundedSender<(Channel, String)>,
}

impl DiscordNotifier {
    /// Create the notifier and spawn its delivery worker.
    ///
    /// The worker exits once every clone of the notifier is dropped and the
    /// queue is drained.
    pub fn spawn(config: &Config) -> Result<(Self, JoinHandle<()>), reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.notify_timeout())
            .build()?;

        let targets = DiscordTargets {
            primary: config.discord_webhook_url.clone(),
            log: config.discord_log_webhook_url.clone(),
            username: config.discord_username.clone(),
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(discord_worker(http, targets, receiver));

        Ok((Self { sender }, worker))
    }
}

impl Notifier for DiscordNotifier {
    fn notify(&self, channel: Channel, message: String) {
        if self.sender.send((channel, message)).is_err() {
            warn!("Discord notifier channel closed");
        }
    }
}

/// Background worker that posts queued messages.
async fn discord_worker(
    http: reqwest::Client,
    targets: DiscordTargets,
    mut receiver: mpsc::UnboundedReceiver<(Channel, String)>,
) {
    info!(
        primary = targets.primary.is_some(),
        log = targets.log.is_some(),
        "Discord notifier started"
    );

    while let Some((channel, message)) = receiver.recv().await {
        let Some(url) = targets.url(channel) else {
            debug!(%channel, "No webhook for channel, dropping message");
            continue;
        };

        let content = match channel {
            Channel::Primary => truncate_for_discord(&message),
            Channel::Log => for_discord_log(&message),
        };

        match post_webhook(&http, url, &targets.username, &content).await {
            Ok(()) => {
                metrics::inc_notifications_sent(channel);
                debug!(%channel, "Discord message delivered");
            }
            Err(e) => {
                metrics::inc_notifications_failed(channel);
                warn!(%channel, error = %e, "Failed to send Discord message");
            }
        }
    }

    debug!("Discord notifier worker shutting down");
}

/// Post one message to a webhook.
async fn post_webhook(
    http: &reqwest::Client,
    url: &str,
    username: &str,
    content: &str,
) -> Result<(), String> {
    let response = http
        .post(url)
        .json(&WebhookPayload { content, username })
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(format!("HTTP {}: {}", status.as_u16(), body))
    }
}

/// Wait for queued messages to be delivered, up to `timeout`.
pub async fn drain(worker: JoinHandle<()>, timeout: Duration) {
    if tokio::time::timeout(timeout, worker).await.is_err() {
        warn!(?timeout, "Timed out waiting for Discord deliveries");
    }
}
