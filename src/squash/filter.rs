//! Attachment lifecycle driver.
//!
//! # Responsibilities
//! - Decide whether an inbound request should be squashed
//! - Create the debug attachment and poll it to a terminal state
//! - Bound the whole sequence with the configured attachment deadline
//!
//! # Design Decisions
//! - Every failure degrades to "resume the request normally"; nothing this
//!   module does is ever surfaced to the client as an error
//! - Creation is never retried, a duplicate POST could leave a second
//!   attachment resource behind; polling is retried until the deadline
//! - One call in flight at a time: each outbound call is awaited before the
//!   next is issued, and dropping the sequence future cancels whatever is
//!   outstanding

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use tokio::time::{self, Instant};

use crate::config::SquashConfig;
use crate::observability::metrics;
use crate::squash::client::AttachmentClient;
use crate::squash::descriptor::{self, DEFAULT_ATTACHMENT_TEMPLATE};
use crate::squash::wire;

/// Immutable per-listener squash settings, rendered once at config time.
#[derive(Debug, Clone)]
pub struct SquashSettings {
    /// Control-plane cluster name. Empty disables the filter.
    pub cluster: String,
    /// Fully rendered attachment descriptor, opaque from here on.
    pub attachment_json: String,
    /// Absolute bound on time spent squashing one request.
    pub attachment_timeout: Duration,
    /// Delay between consecutive polls.
    pub poll_every: Duration,
    /// Per-call timeout for create and poll requests.
    pub request_timeout: Duration,
}

impl SquashSettings {
    pub fn from_config(cfg: &SquashConfig) -> Self {
        let template = if cfg.attachment_template.is_empty() {
            DEFAULT_ATTACHMENT_TEMPLATE
        } else {
            &cfg.attachment_template
        };
        Self {
            cluster: cfg.cluster.clone(),
            attachment_json: descriptor::render_attachment(template),
            attachment_timeout: Duration::from_millis(cfg.attachment_timeout_ms),
            poll_every: Duration::from_millis(cfg.attachment_poll_every_ms),
            request_timeout: Duration::from_millis(cfg.request_timeout_ms),
        }
    }

    pub fn enabled(&self) -> bool {
        !self.cluster.is_empty()
    }
}

/// How a squash sequence ended. Informational only; the request resumes
/// identically in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquashOutcome {
    /// The debugger reported itself attached.
    Attached,
    /// The attachment reached its `error` state.
    AttachmentError,
    /// Creation failed (transport, refused, or unusable reply); never polled
    /// past that point.
    Abandoned,
    /// The attachment deadline elapsed first.
    DeadlineExceeded,
}

impl SquashOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SquashOutcome::Attached => "attached",
            SquashOutcome::AttachmentError => "error",
            SquashOutcome::Abandoned => "abandoned",
            SquashOutcome::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

/// Request-path filter that pauses squashed requests while a debugger
/// attaches. One instance per listener; each intercepted request runs its
/// own sequence.
pub struct SquashFilter {
    settings: SquashSettings,
    client: Arc<dyn AttachmentClient>,
}

impl SquashFilter {
    pub fn new(settings: SquashSettings, client: Arc<dyn AttachmentClient>) -> Self {
        Self { settings, client }
    }

    pub fn settings(&self) -> &SquashSettings {
        &self.settings
    }

    /// Trigger check. Fails open: an unconfigured cluster or an absent
    /// header passes the request through untouched.
    pub fn should_squash(&self, headers: &HeaderMap) -> bool {
        if !self.settings.enabled() {
            tracing::warn!("Squash cluster not configured, ignoring request");
            return false;
        }
        if !headers.contains_key(wire::SQUASH_HEADER) {
            tracing::debug!("No squash header, ignoring request");
            return false;
        }
        tracing::info!("Squash header present, pausing request while a debugger attaches");
        true
    }

    /// Run the attachment sequence to completion. Returns when the request
    /// may resume; never earlier than the first create call resolving, never
    /// later than the attachment deadline.
    pub async fn squash(&self) -> SquashOutcome {
        let deadline = Instant::now() + self.settings.attachment_timeout;

        let outcome = match time::timeout_at(deadline, self.run(deadline)).await {
            Ok(outcome) => outcome,
            // The deadline fired with a call still outstanding; dropping the
            // sequence future cancelled it.
            Err(_) => SquashOutcome::DeadlineExceeded,
        };

        tracing::info!(outcome = outcome.as_str(), "Squash sequence finished");
        outcome
    }

    async fn run(&self, deadline: Instant) -> SquashOutcome {
        let poll_path = match self.create_attachment().await {
            Some(path) => path,
            None => return SquashOutcome::Abandoned,
        };
        self.poll_until_terminal(&poll_path, deadline).await
    }

    /// Issue the create call and interpret its reply. Returns the poll path
    /// on success, `None` to abandon the sequence.
    async fn create_attachment(&self) -> Option<String> {
        let response = match self.client.create_attachment(&self.settings.attachment_json).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create debug attachment, not squashing");
                return None;
            }
        };

        if response.status != wire::CREATED_STATUS {
            tracing::info!(status = %response.status, "Control plane refused attachment creation, not squashing");
            return None;
        }

        match wire::created_name(&response.body) {
            Some(name) => {
                metrics::record_attachment_created();
                Some(wire::attachment_path(&name))
            }
            None => {
                tracing::info!("Create reply carried no attachment name, not squashing");
                None
            }
        }
    }

    async fn poll_until_terminal(&self, path: &str, deadline: Instant) -> SquashOutcome {
        loop {
            metrics::record_attachment_poll();
            match self.client.get_attachment(path).await {
                Ok(response) => match wire::attachment_state(&response.body).as_deref() {
                    Some(wire::STATE_ATTACHED) => {
                        tracing::debug!(path = %path, "Debugger attached");
                        return SquashOutcome::Attached;
                    }
                    Some(wire::STATE_ERROR) => {
                        tracing::info!(path = %path, "Attachment reached error state");
                        return SquashOutcome::AttachmentError;
                    }
                    // Unknown or unparsable state: not terminal yet. An
                    // unparsable body is indistinguishable from "still
                    // attaching", so the deadline decides.
                    state => {
                        tracing::trace!(path = %path, state = ?state, "Attachment not yet terminal");
                    }
                },
                Err(e) => {
                    // Poll failures are retryable; the deadline bounds them.
                    tracing::debug!(path = %path, error = %e, "Attachment poll failed, retrying");
                }
            }

            // Never schedule a poll that could only be cut short.
            if Instant::now() >= deadline {
                return SquashOutcome::DeadlineExceeded;
            }
            time::sleep(self.settings.poll_every).await;
        }
    }
}
