//! The transport seam and process-wide transport selection.
//!
//! # Design
//! A [`Transport`] performs exactly one round-trip per call. The library
//! ships [`UreqTransport`], a blocking `ureq` agent driven from
//! `spawn_blocking`, and any other client can be plugged in behind the trait.
//!
//! Requests pick their transport once, when they are created:
//! an explicit transport, else the global override set through
//! [`set_global_transport`], else a lazily created default shared by the
//! whole process. The override slot is last-write-wins; coordinating
//! concurrent writers is up to the caller.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse};

/// Sends a fully assembled request and returns the raw response.
///
/// Implementations should return promptly with [`Error::Cancelled`] once
/// `cancel` fires. The executor races every call against the same token, so
/// a transport that ignores it is still abandoned on cancellation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest, cancel: &CancellationToken) -> Result<HttpResponse>;
}

static GLOBAL_TRANSPORT: RwLock<Option<Arc<dyn Transport>>> = RwLock::new(None);
static DEFAULT_TRANSPORT: OnceCell<Arc<dyn Transport>> = OnceCell::new();

/// Use `transport` for every request created from now on without an explicit one.
pub fn set_global_transport(transport: Arc<dyn Transport>) {
    *GLOBAL_TRANSPORT.write().unwrap_or_else(PoisonError::into_inner) = Some(transport);
}

/// The transport installed by [`set_global_transport`], if any.
pub fn global_transport() -> Option<Arc<dyn Transport>> {
    GLOBAL_TRANSPORT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Remove the global override. Requests created afterwards use the default.
pub fn clear_global_transport() {
    *GLOBAL_TRANSPORT.write().unwrap_or_else(PoisonError::into_inner) = None;
}

/// The process-wide default transport, created on first use.
pub fn default_transport() -> Arc<dyn Transport> {
    DEFAULT_TRANSPORT
        .get_or_init(|| {
            debug!("creating default ureq transport");
            Arc::new(UreqTransport::new())
        })
        .clone()
}

/// Explicit transport, else global override, else the default.
pub fn resolve_transport(explicit: Option<Arc<dyn Transport>>) -> Arc<dyn Transport> {
    explicit
        .or_else(global_transport)
        .unwrap_or_else(default_transport)
}

/// Settings for [`UreqTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Follow 3xx responses. When off, the redirect response itself is returned.
    pub follow_redirects: bool,
    /// Exceeding this while following is a transport error.
    pub max_redirects: u32,
    /// Overall deadline for one round-trip, including reading the body.
    pub timeout: Option<Duration>,
    /// Largest response body accepted, in bytes. `None` reads bodies of any size.
    pub max_body_size: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            max_redirects: 10,
            timeout: None,
            max_body_size: None,
        }
    }
}

/// Builder for [`UreqTransport`].
#[derive(Debug, Clone, Default)]
pub struct UreqTransportBuilder {
    config: TransportConfig,
}

impl UreqTransportBuilder {
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    pub fn max_redirects(mut self, max: u32) -> Self {
        self.config.max_redirects = max;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn max_body_size(mut self, bytes: u64) -> Self {
        self.config.max_body_size = Some(bytes);
        self
    }

    pub fn build(self) -> UreqTransport {
        UreqTransport::with_config(self.config)
    }
}

/// Transport backed by a `ureq` agent.
///
/// Status codes are never turned into errors here; checking them is the
/// caller's decision.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    config: TransportConfig,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    pub fn builder() -> UreqTransportBuilder {
        UreqTransportBuilder::default()
    }

    pub fn with_config(config: TransportConfig) -> Self {
        let max_redirects = if config.follow_redirects {
            config.max_redirects
        } else {
            0
        };
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(max_redirects)
            .max_redirects_will_error(config.follow_redirects)
            .timeout_global(config.timeout)
            .build()
            .new_agent();
        Self { agent, config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn send(&self, request: HttpRequest, cancel: &CancellationToken) -> Result<HttpResponse> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let agent = self.agent.clone();
        let limit = self.config.max_body_size.unwrap_or(u64::MAX);
        let call = tokio::task::spawn_blocking(move || execute_blocking(&agent, request, limit));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("request cancelled while waiting on ureq");
                Err(Error::Cancelled)
            }
            joined = call => joined.map_err(Error::transport).and_then(|result| result),
        }
    }
}

fn execute_blocking(agent: &ureq::Agent, request: HttpRequest, limit: u64) -> Result<HttpResponse> {
    let mut builder = ureq::http::Request::builder()
        .method(request.method.as_str())
        .uri(request.url.as_str());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let sent = match request.body {
        Some(content) => {
            let req = builder
                .header("content-type", content.content_type.as_str())
                .body(content.data.to_vec())
                .map_err(Error::transport)?;
            agent.run(req)
        }
        None => {
            let req = builder.body(()).map_err(Error::transport)?;
            agent.run(req)
        }
    };
    let mut response = sent.map_err(Error::transport)?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = response
        .body_mut()
        .with_config()
        .limit(limit)
        .read_to_vec()
        .map_err(Error::transport)?;
    Ok(HttpResponse::new(status, headers, body))
}
