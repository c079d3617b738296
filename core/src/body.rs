//! Deferred request bodies.
//!
//! A request holds at most one [`BodySource`]. Nothing is encoded when the
//! body is configured; [`BodySource::materialize`] runs on every send, right
//! before the transport request is assembled, and may run any number of
//! times with identical output.

use bytes::Bytes;
use tracing::trace;

use crate::error::{Error, Result};
use crate::http::{Content, APPLICATION_JSON, FORM_URLENCODED};

/// The declared source of a request body.
#[derive(Debug, Clone, PartialEq)]
pub enum BodySource {
    /// Serialized as `application/json`.
    Json(serde_json::Value),
    /// Sent verbatim as UTF-8 with the given media type.
    Text { text: String, content_type: String },
    /// Encoded as `application/x-www-form-urlencoded`, order and duplicates kept.
    FormUrlEncoded(Vec<(String, String)>),
}

impl BodySource {
    /// Produce the bytes and `Content-Type` for this body.
    pub fn materialize(&self) -> Result<Content> {
        let content = match self {
            BodySource::Json(value) => {
                let data = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
                Content {
                    data: Bytes::from(data),
                    content_type: APPLICATION_JSON.to_string(),
                }
            }
            BodySource::Text { text, content_type } => Content {
                data: Bytes::copy_from_slice(text.as_bytes()),
                content_type: format!("{content_type}; charset=utf-8"),
            },
            BodySource::FormUrlEncoded(pairs) => {
                let encoded = ::url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs.iter())
                    .finish();
                Content {
                    data: Bytes::from(encoded),
                    content_type: FORM_URLENCODED.to_string(),
                }
            }
        };
        trace!(
            content_type = content.content_type.as_str(),
            len = content.data.len(),
            "materialized request body"
        );
        Ok(content)
    }
}
