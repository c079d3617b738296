//! Reading responses.
//!
//! # Design
//! The first read copies the transport's body stream into one in-memory
//! buffer; every read after that is served from the buffer. Reads can
//! therefore be repeated (`read_json` twice returns the same value twice) and
//! a stream returned by [`Response::read_stream`] owns its bytes, so it stays
//! valid after the `Response` is dropped.
//!
//! Status codes are not checked by any `read_*` method. Call
//! [`Response::ensure_success`] first, or use the `fetch_*` helpers on
//! [`Request`](crate::Request), which do both.

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::http::{find_header, ByteStream, HttpResponse};
use crate::json::{self, JsonOptions};

enum BodyState {
    Pending(ByteStream),
    Buffered(Bytes),
    Broken,
}

/// A received response.
///
/// Dropping it releases the underlying body stream.
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: BodyState,
    cancel: CancellationToken,
}

impl Response {
    pub(crate) fn new(raw: HttpResponse, cancel: CancellationToken) -> Self {
        Self {
            status: raw.status,
            headers: raw.headers,
            body: BodyState::Pending(raw.body.into_stream()),
            cancel,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Fail with [`Error::Http`] unless the status is 2xx.
    pub fn ensure_success(&self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(Error::Http { status: self.status })
        }
    }

    /// The whole body. Buffered on first call.
    pub async fn bytes(&mut self) -> Result<Bytes> {
        let mut stream = match std::mem::replace(&mut self.body, BodyState::Broken) {
            BodyState::Buffered(bytes) => {
                self.body = BodyState::Buffered(bytes.clone());
                return Ok(bytes);
            }
            BodyState::Broken => {
                return Err(Error::transport("response body was not read completely"));
            }
            BodyState::Pending(stream) => stream,
        };

        let mut buffer = BytesMut::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    warn!("cancelled while reading response body");
                    return Err(Error::Cancelled);
                }
                next = stream.next() => next,
            };
            match next {
                Some(chunk) => buffer.extend_from_slice(&chunk?),
                None => break,
            }
        }

        let bytes = buffer.freeze();
        trace!(len = bytes.len(), "buffered response body");
        self.body = BodyState::Buffered(bytes.clone());
        Ok(bytes)
    }

    /// An independent, seekable copy of the body.
    pub async fn read_stream(&mut self) -> Result<Cursor<Bytes>> {
        Ok(Cursor::new(self.bytes().await?))
    }

    /// The body as text, decoded with the `Content-Type` charset (UTF-8 if absent).
    pub async fn read_text(&mut self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(decode_text(&bytes, self.content_type()))
    }

    /// Deserialize a JSON body, matching property names case-insensitively.
    pub async fn read_json<T: DeserializeOwned>(&mut self) -> Result<T> {
        self.read_json_with(&JsonOptions::default()).await
    }

    pub async fn read_json_with<T: DeserializeOwned>(&mut self, options: &JsonOptions) -> Result<T> {
        let bytes = self.bytes().await?;
        json::from_slice(&bytes, options)
    }

    /// Deserialize an XML body. An empty body yields `None`.
    pub async fn read_xml<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        let text = self.read_text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        quick_xml::de::from_str(&text)
            .map(Some)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

impl From<HttpResponse> for Response {
    fn from(raw: HttpResponse) -> Self {
        Response::new(raw, CancellationToken::new())
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish()
    }
}

fn charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

fn decode_text(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = match content_type.and_then(charset) {
        Some(label) => encoding_rs::Encoding::for_label(label.as_bytes()).unwrap_or_else(|| {
            warn!(charset = label, "unknown charset, decoding as UTF-8");
            encoding_rs::UTF_8
        }),
        None => encoding_rs::UTF_8,
    };
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
