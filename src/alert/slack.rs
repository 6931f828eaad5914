//! Slack incoming-webhook notifier.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const SLACK_TIMEOUT: Duration = Duration::from_secs(5);

/// One notification, already labelled with its owning application.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub title: String,
    pub project: String,
    pub application: String,
    pub namespace: String,
    pub metric: String,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification timed out after {0:?}")]
    Timeout(Duration),
    #[error("post to slack: {0}")]
    Transport(String),
    #[error("slack webhook returned status {0}")]
    Status(u16),
}

/// A delivery that was attempted and failed. Never aborts a pass.
#[derive(Error, Debug)]
#[error("alert delivery failed (non-fatal): {0}")]
pub struct DeliveryError(#[from] pub NotifyError);

/// Notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct BlockText<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
struct Block<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<BlockText<'a>>,
}

#[derive(Serialize)]
struct Attachment<'a> {
    color: &'static str,
    title: &'a str,
    text: String,
    mrkdwn_in: [&'static str; 1],
}

#[derive(Serialize)]
struct SlackMessage<'a> {
    blocks: Vec<Block<'a>>,
    attachments: Vec<Attachment<'a>>,
}

fn message(alert: &Alert) -> SlackMessage<'_> {
    let text = format!(
        "*Project*: {}\n*Application*: {}\n*Namespace*: {}\n\n*Metric*: {}\n*Reason*: {}",
        alert.project, alert.application, alert.namespace, alert.metric, alert.reason
    );
    SlackMessage {
        blocks: vec![
            Block {
                kind: "section",
                text: Some(BlockText {
                    kind: "mrkdwn",
                    text: "*K8S Monitoring App Alert*",
                }),
            },
            Block {
                kind: "divider",
                text: None,
            },
        ],
        attachments: vec![Attachment {
            color: "danger",
            title: &alert.title,
            text,
            mrkdwn_in: ["text"],
        }],
    }
}

pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .timeout(SLACK_TIMEOUT)
            .json(&message(alert))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout(SLACK_TIMEOUT)
                } else {
                    NotifyError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}
