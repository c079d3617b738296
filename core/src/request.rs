//! Request state and the fluent configuration API.
//!
//! # Design
//! `Request` is a consuming builder: every configuration call takes `self`,
//! updates it in place and hands it back, so calls chain. Calls that can
//! reject their input return `Result<Request>` and fail before any I/O;
//! the rest return `Request` directly.
//!
//! Headers are an ordered list with case-insensitive, last-write-wins names.
//! The only accumulating header is `Accept`, whose values are joined with
//! `", "` in call order unless a replacing call is used.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::body::BodySource;
use crate::error::{Error, Result};
use crate::http::{find_header, HttpMethod, APPLICATION_JSON, APPLICATION_XML, TEXT_HTML, TEXT_PLAIN};
use crate::transport::{resolve_transport, Transport};
use crate::url::QueryValue;

const ACCEPT: &str = "Accept";
const AUTHORIZATION: &str = "Authorization";
const USER_AGENT: &str = "User-Agent";

/// Separator placed between accumulated `Accept` values.
pub const ACCEPT_SEPARATOR: &str = ", ";

/// A single HTTP request under construction.
///
/// Sending borrows the request, so the same state may be sent again; the
/// body is re-materialized each time.
pub struct Request {
    base_uri: String,
    method: HttpMethod,
    headers: Vec<(String, String)>,
    path_segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<BodySource>,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
}

impl Request {
    /// Start a GET request against `base_uri` using the global or default transport.
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self::build(base_uri.into(), None)
    }

    /// Start a GET request against `base_uri` using `transport`.
    pub fn with_transport(base_uri: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self::build(base_uri.into(), Some(transport))
    }

    fn build(base_uri: String, transport: Option<Arc<dyn Transport>>) -> Self {
        Self {
            base_uri,
            method: HttpMethod::default(),
            headers: Vec::new(),
            path_segments: Vec::new(),
            query: Vec::new(),
            body: None,
            transport: resolve_transport(transport),
            cancel: CancellationToken::new(),
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn http_method(&self) -> HttpMethod {
        self.method
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Current value of a header, looked up case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn path_segments(&self) -> &[String] {
        &self.path_segments
    }

    pub fn query_parameters(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body_source(&self) -> Option<&BodySource> {
        self.body.as_ref()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    // --- method ---

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn as_get(self) -> Self {
        self.method(HttpMethod::Get)
    }

    pub fn as_post(self) -> Self {
        self.method(HttpMethod::Post)
    }

    pub fn as_put(self) -> Self {
        self.method(HttpMethod::Put)
    }

    pub fn as_patch(self) -> Self {
        self.method(HttpMethod::Patch)
    }

    pub fn as_delete(self) -> Self {
        self.method(HttpMethod::Delete)
    }

    pub fn as_trace(self) -> Self {
        self.method(HttpMethod::Trace)
    }

    pub fn as_head(self) -> Self {
        self.method(HttpMethod::Head)
    }

    pub fn as_options(self) -> Self {
        self.method(HttpMethod::Options)
    }

    // --- headers ---

    /// Set a header, replacing any earlier value under the same name.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(Error::invalid_argument("name", "header name must not be blank"));
        }
        self.set_header(name, value.into());
        Ok(self)
    }

    fn set_header(&mut self, name: &str, value: String) {
        match self.headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
            Some(entry) => *entry = (name.to_string(), value),
            None => self.headers.push((name.to_string(), value)),
        }
    }

    /// `Authorization: Bearer <token>`. A leading `"Bearer "` on `token` is stripped.
    pub fn bearer_auth(mut self, token: &str) -> Self {
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        self.set_header(AUTHORIZATION, format!("Bearer {token}"));
        self
    }

    /// `Authorization: Basic <base64(username:password)>`.
    pub fn basic_auth(mut self, username: &str, password: &str) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        self.set_header(AUTHORIZATION, format!("Basic {encoded}"));
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.set_header(USER_AGENT, user_agent.into());
        self
    }

    /// Add `content_type` to the `Accept` header, after any earlier values.
    pub fn accept(mut self, content_type: &str) -> Self {
        let value = match self.header_value(ACCEPT) {
            Some(existing) => format!("{existing}{ACCEPT_SEPARATOR}{content_type}"),
            None => content_type.to_string(),
        };
        self.set_header(ACCEPT, value);
        self
    }

    /// Set `Accept` to `content_type`, discarding earlier values.
    pub fn replace_accept(mut self, content_type: &str) -> Self {
        self.set_header(ACCEPT, content_type.to_string());
        self
    }

    pub fn accept_json(self) -> Self {
        self.accept(APPLICATION_JSON)
    }

    pub fn accept_xml(self) -> Self {
        self.accept(APPLICATION_XML)
    }

    pub fn accept_plain_text(self) -> Self {
        self.accept(TEXT_PLAIN)
    }

    pub fn accept_html(self) -> Self {
        self.accept(TEXT_HTML)
    }

    // --- url ---

    /// Append a path segment. Numbers and UUIDs are rendered with `Display`.
    pub fn path_segment(mut self, segment: impl fmt::Display) -> Result<Self> {
        let segment = segment.to_string();
        if segment.trim().is_empty() {
            return Err(Error::invalid_argument("segment", "path segment must not be blank"));
        }
        self.path_segments.push(segment);
        Ok(self)
    }

    /// Append a query parameter. Blank and absent values are skipped silently;
    /// repeated names are kept as separate pairs.
    pub fn query_parameter(mut self, name: impl Into<String>, value: impl QueryValue) -> Self {
        if let Some(value) = value.into_query_value() {
            self.query.push((name.into(), value));
        }
        self
    }

    // --- body ---

    /// Send `body` as JSON. A value that serializes to `null` is rejected.
    pub fn json_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| Error::Serialization(e.to_string()))?;
        if value.is_null() {
            return Err(Error::invalid_argument("body", "JSON body must not be null"));
        }
        self.body = Some(BodySource::Json(value));
        Ok(self)
    }

    /// Send `text` as `text/plain; charset=utf-8`.
    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.body = Some(BodySource::Text {
            text: text.into(),
            content_type: TEXT_PLAIN.to_string(),
        });
        self
    }

    /// Send `text` as UTF-8 with the given media type.
    pub fn text_body_with_content_type(mut self, text: impl Into<String>, content_type: &str) -> Result<Self> {
        if content_type.trim().is_empty() {
            return Err(Error::invalid_argument("content_type", "content type must not be blank"));
        }
        self.body = Some(BodySource::Text {
            text: text.into(),
            content_type: content_type.to_string(),
        });
        Ok(self)
    }

    /// Send `pairs` as `application/x-www-form-urlencoded`.
    pub fn form_body<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.body = Some(BodySource::FormUrlEncoded(pairs));
        self
    }

    // --- execution ---

    /// Cancel sends and body reads of this request when `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("base_uri", &self.base_uri)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("path_segments", &self.path_segments)
            .field("query", &self.query)
            .field("body", &self.body)
            .finish()
    }
}
