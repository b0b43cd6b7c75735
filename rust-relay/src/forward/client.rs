//! Async HTTP client for the Serviceware telephony hooks.
//!
//! One `Forwarder` is built at startup and shared by every request. Each
//! forward is a single POST; failures are logged and dropped. Detached
//! forwards are tracked so shutdown can wait for the ones still in flight.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use url::Url;

use super::types::{ForwardInstruction, ForwardRequest};
use crate::Config;

/// Errors raised while building the forwarder or posting an event.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid Serviceware base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
}

impl ForwardError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ForwardError::Transport { source, .. } if source.is_timeout())
    }
}

/// Serviceware forwarder with a pooled HTTP client.
#[derive(Clone)]
pub struct Forwarder {
    inner: Arc<ForwarderInner>,
}

struct ForwarderInner {
    client: Client,
    base_url: String,
    connect_endpoint: String,
    disconnect_endpoint: String,
    shared_secret: String,
    tracker: TaskTracker,
}

impl Forwarder {
    /// Create a forwarder from the Serviceware settings in `config`.
    pub fn new(config: &Config) -> Result<Self, ForwardError> {
        Url::parse(&config.serviceware_api_url).map_err(|source| ForwardError::InvalidBaseUrl {
            url: config.serviceware_api_url.clone(),
            source,
        })?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.forward_timeout_ms))
            .pool_max_idle_per_host(16)
            .build()
            .map_err(ForwardError::Client)?;

        Ok(Self {
            inner: Arc::new(ForwarderInner {
                client,
                base_url: config.serviceware_api_url.trim_end_matches('/').to_string(),
                connect_endpoint: config.connect_endpoint.clone(),
                disconnect_endpoint: config.disconnect_endpoint.clone(),
                shared_secret: config.serviceware_shared_secret.clone(),
                tracker: TaskTracker::new(),
            }),
        })
    }

    /// Full URL of the hook for `instruction`.
    pub fn endpoint(&self, instruction: ForwardInstruction) -> String {
        let path = match instruction {
            ForwardInstruction::Connect => &self.inner.connect_endpoint,
            ForwardInstruction::Disconnect => &self.inner.disconnect_endpoint,
        };
        format!("{}{}", self.inner.base_url, path)
    }

    /// Post `request` to the hook for `instruction` once.
    pub async fn post(
        &self,
        instruction: ForwardInstruction,
        request: &ForwardRequest,
    ) -> Result<(), ForwardError> {
        let url = self.endpoint(instruction);

        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(&self.inner.shared_secret)
            .json(request)
            .send()
            .await
            .map_err(|source| ForwardError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForwardError::Status {
                url,
                status: status.as_u16(),
            });
        }

        Ok(())
    }

    /// Forward in a detached task.
    ///
    /// The task outlives the calling handler; its outcome is only logged.
    pub fn spawn(&self, instruction: ForwardInstruction, request: ForwardRequest) -> JoinHandle<()> {
        let forwarder = self.clone();

        self.inner.tracker.spawn(async move {
            match forwarder.post(instruction, &request).await {
                Ok(()) => {
                    info!(
                        action = instruction.as_str(),
                        to_number = %request.to_number,
                        from_number = %request.from_number,
                        "serviceware_forward_succeeded"
                    );
                }
                Err(e) => {
                    error!(
                        action = instruction.as_str(),
                        to_number = %request.to_number,
                        from_number = %request.from_number,
                        timeout = e.is_timeout(),
                        error = %e,
                        "serviceware_forward_failed"
                    );
                }
            }
        })
    }

    /// Number of detached forwards still running.
    pub fn in_flight(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Wait up to `timeout` for detached forwards to finish.
    ///
    /// Returns `true` when nothing was left running. Forwards spawned after
    /// the drain started are still tracked and waited for.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.inner.tracker.close();

        let pending = self.in_flight();
        if pending == 0 {
            return true;
        }

        info!(pending, "serviceware_forwards_draining");
        match tokio::time::timeout(timeout, self.inner.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    pending = self.in_flight(),
                    timeout_ms = timeout.as_millis() as u64,
                    "serviceware_forwards_abandoned"
                );
                false
            }
        }
    }
}
