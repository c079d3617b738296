//! URL composition from a base URI, path segments and query parameters.
//!
//! Composition never touches the network and never mutates the request, so
//! it can be used to inspect the final URL before (or without) sending.
//!
//! Path segments are appended to the base path verbatim, joined with `/`
//! among themselves but *not* separated from the base path. A base of
//! `https://host/api` plus segment `users` yields `https://host/apiusers`;
//! callers that want `/api/users` must end the base with a slash.

use ::url::Url;
use tracing::trace;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Build the final URL for a request.
///
/// Existing query pairs on `base` are kept and the new pairs are appended
/// after them in order. Duplicate names stay separate entries. Values are
/// form-encoded, so a space becomes `+`.
pub fn compose_url(base: &str, segments: &[String], query: &[(String, String)]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| Error::invalid_argument("base_uri", e.to_string()))?;

    if !segments.is_empty() {
        let path = format!("{}{}", url.path(), segments.join("/"));
        url.set_path(&path);
    }

    if !query.is_empty() {
        let existing: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(existing.iter())
            .extend_pairs(query.iter());
    }

    trace!(url = url.as_str(), "composed request url");
    Ok(url)
}

/// A value accepted by [`Request::query_parameter`](crate::Request::query_parameter).
///
/// Returning `None` drops the parameter. Strings that are empty or only
/// whitespace are dropped, as is `Option::None`; numbers and UUIDs are
/// always kept.
pub trait QueryValue {
    fn into_query_value(self) -> Option<String>;
}

impl QueryValue for &str {
    fn into_query_value(self) -> Option<String> {
        if self.trim().is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl QueryValue for String {
    fn into_query_value(self) -> Option<String> {
        if self.trim().is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl QueryValue for &String {
    fn into_query_value(self) -> Option<String> {
        self.as_str().into_query_value()
    }
}

impl QueryValue for Uuid {
    fn into_query_value(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<T: QueryValue> QueryValue for Option<T> {
    fn into_query_value(self) -> Option<String> {
        self.and_then(QueryValue::into_query_value)
    }
}

macro_rules! integer_query_value {
    ($($ty:ty),*) => {
        $(
            impl QueryValue for $ty {
                fn into_query_value(self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

integer_query_value!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
