//! Publish notifications.
//!
//! [`NotifierClient`] is built once at startup from [`NotifyConfig`] and handed to
//! whatever needs to announce posts. Without a webhook URL it only logs.

use std::time::Duration;

use hmac::{Hmac, Mac};
use log::{info, warn};
use reqwest::Client;
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

use crate::config::NotifyConfig;
use crate::models::{Post, PostId, UserId};

pub const SIGNATURE_HEADER: &str = "X-Signature";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Body posted to the webhook. `text` makes it usable as a chat incoming-webhook payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PostEvent {
    pub event: String,
    pub post_id: PostId,
    pub title: String,
    pub category: String,
    pub author_id: UserId,
    pub timestamp: u64,
    pub text: String,
}

impl PostEvent {
    pub fn published(post: &Post) -> Self {
        Self {
            event: "post_published".into(),
            post_id: post.id,
            title: post.title.clone(),
            category: post.category.clone(),
            author_id: post.author_id,
            timestamp: post.published_at.unwrap_or(post.created_at),
            text: format!("New post in {}: {}", post.category, post.title),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http status {0}")]
    Http(u16),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidSecret(#[from] hmac::digest::InvalidLength),
}

#[derive(Clone, Debug)]
pub struct NotifierClient {
    http: Client,
    webhook_url: Option<String>,
    secret: Option<Vec<u8>>,
    retry_delays: Vec<Duration>,
}

impl NotifierClient {
    pub fn new(cfg: &NotifyConfig) -> Result<Self, NotifyError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            webhook_url: cfg.webhook_url.clone(),
            secret: cfg.webhook_secret.clone(),
            retry_delays: cfg.retry_delays.clone(),
        })
    }

    pub fn webhook_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Log the event and deliver it to the webhook, if one is configured.
    ///
    /// 5xx answers and transport errors are retried; 4xx answers fail at once.
    pub async fn publish(&self, event: &PostEvent) -> Result<(), NotifyError> {
        info!("notify event={} post_id={} category={}", event.event, event.post_id, event.category);
        let Some(url) = self.webhook_url.as_deref() else {
            return Ok(());
        };

        let body = serde_json::to_vec(event)?;
        let signature = match &self.secret {
            Some(secret) => Some(sign(secret, &body)?),
            None => None,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut req = self.http.post(url).header(reqwest::header::CONTENT_TYPE, "application/json").body(body.clone());
            if let Some(sig) = &signature {
                req = req.header(SIGNATURE_HEADER, sig);
            }
            let err = match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    info!(
                        "webhook event={} post_id={} attempt={} status={}",
                        event.event,
                        event.post_id,
                        attempt,
                        status.as_u16()
                    );
                    if status.is_success() {
                        return Ok(());
                    }
                    if !status.is_server_error() {
                        return Err(NotifyError::Http(status.as_u16()));
                    }
                    NotifyError::Http(status.as_u16())
                }
                Err(err) => {
                    warn!("webhook event={} post_id={} attempt={} error={}", event.event, event.post_id, attempt, err);
                    NotifyError::Request(err)
                }
            };
            let Some(delay) = self.retry_delays.get(attempt - 1) else {
                return Err(err);
            };
            tokio::time::sleep(*delay).await;
        }
    }
}

/// Hex HMAC-SHA256 of the request body.
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, NotifyError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret)?;
    mac.update(body);
    let digest = mac.finalize().into_bytes();
    Ok(faster_hex::hex_string(&digest))
}
