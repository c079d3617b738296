//! Fluent construction and execution of HTTP requests.
//!
//! # Overview
//! A [`Request`] collects a method, headers, path segments, query parameters
//! and an optional body through chained calls, then sends itself through a
//! [`Transport`]. The response can be read as bytes, text, a seekable stream,
//! JSON or XML, as often as needed.
//!
//! ```no_run
//! use fluent_http::UrlExt;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! # async fn run() -> fluent_http::Result<()> {
//! let user: User = "https://api.example.test/"
//!     .as_get_request()
//!     .path_segment("users")?
//!     .path_segment(1)?
//!     .accept_json()
//!     .fetch_json()
//!     .await?;
//! # let _ = (user.id, user.name);
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - Building is pure: [`Request::build_url`] and
//!   [`Request::build_http_request`] never touch the network.
//! - Bodies are declared, not encoded, until a send materializes them.
//! - `send` returns any status; `fetch_*` and `ensure_success` reject non-2xx.
//! - The transport is chosen when the request is created: explicit, else the
//!   global override, else a lazily built [`UreqTransport`].

pub mod body;
pub mod client;
pub mod error;
pub mod ext;
pub mod http;
pub mod json;
pub mod request;
pub mod response;
pub mod transport;
pub mod url;

pub use body::BodySource;
pub use error::{Error, Result};
pub use ext::UrlExt;
pub use http::{Body, Content, HttpMethod, HttpRequest, HttpResponse};
pub use json::JsonOptions;
pub use request::Request;
pub use response::Response;
pub use transport::{
    clear_global_transport, default_transport, global_transport, resolve_transport, set_global_transport,
    Transport, TransportConfig, UreqTransport, UreqTransportBuilder,
};
pub use crate::url::{compose_url, QueryValue};
pub use tokio_util::sync::CancellationToken;
