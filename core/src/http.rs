//! HTTP transport types exchanged with a [`Transport`](crate::Transport).
//!
//! # Design
//! These types describe requests and responses as plain data. The builder
//! assembles an `HttpRequest`, the transport performs the round-trip and
//! hands back an `HttpResponse` whose body is a stream of byte chunks. Header
//! lists are ordered `(name, value)` pairs; lookups are case-insensitive.

use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream};

use crate::error::Result;

pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_XML: &str = "application/xml";
pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Trace,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A materialized request body together with its `Content-Type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub data: Bytes,
    pub content_type: String,
}

/// An HTTP request described as plain data.
///
/// Built by [`Request::build_http_request`](crate::Request::build_http_request)
/// right before a send. Headers are copied one by one from the builder; a
/// comma-joined `Accept` value stays a single header line.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Content>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Response body handed over by a transport.
///
/// Either fully buffered already or a stream that is read on demand.
pub struct Body {
    inner: Inner,
}

enum Inner {
    Full(Bytes),
    Streaming(ByteStream),
}

impl Body {
    pub fn empty() -> Self {
        Body::from(Bytes::new())
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Body {
            inner: Inner::Streaming(Box::pin(stream)),
        }
    }

    pub(crate) fn into_stream(self) -> ByteStream {
        match self.inner {
            Inner::Full(bytes) => Box::pin(stream::iter(std::iter::once(Ok(bytes)))),
            Inner::Streaming(stream) => stream,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Full(bytes) => f.debug_tuple("Body::Full").field(&bytes.len()).finish(),
            Inner::Streaming(_) => f.write_str("Body::Streaming"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body {
            inner: Inner::Full(bytes),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self {
        Body::from(Bytes::from(data))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::from(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::from(Bytes::from_static(text.as_bytes()))
    }
}

/// An HTTP response described as plain data.
///
/// Returned by a transport and wrapped into a [`Response`](crate::Response)
/// by the executor.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl HttpResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }
}

/// Case-insensitive header lookup over an ordered header list.
pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
