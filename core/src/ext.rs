//! Start a request straight from a URL string.
//!
//! ```no_run
//! use fluent_http::UrlExt;
//!
//! # async fn run() -> fluent_http::Result<()> {
//! let body = "https://api.example.test/"
//!     .as_get_request()
//!     .path_segment("users")?
//!     .fetch_text()
//!     .await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::http::HttpMethod;
use crate::request::Request;
use crate::transport::Transport;

/// Entry points on URL strings.
///
/// The plain variants resolve the transport from the global override or the
/// default; the `_using` variant takes one explicitly.
pub trait UrlExt {
    fn as_request(&self, method: HttpMethod) -> Request;

    fn as_request_using(&self, method: HttpMethod, transport: Arc<dyn Transport>) -> Request;

    fn as_get_request(&self) -> Request {
        self.as_request(HttpMethod::Get)
    }

    fn as_post_request(&self) -> Request {
        self.as_request(HttpMethod::Post)
    }

    fn as_put_request(&self) -> Request {
        self.as_request(HttpMethod::Put)
    }

    fn as_patch_request(&self) -> Request {
        self.as_request(HttpMethod::Patch)
    }

    fn as_delete_request(&self) -> Request {
        self.as_request(HttpMethod::Delete)
    }

    fn as_trace_request(&self) -> Request {
        self.as_request(HttpMethod::Trace)
    }

    fn as_head_request(&self) -> Request {
        self.as_request(HttpMethod::Head)
    }

    fn as_options_request(&self) -> Request {
        self.as_request(HttpMethod::Options)
    }
}

impl UrlExt for str {
    fn as_request(&self, method: HttpMethod) -> Request {
        Request::new(self).method(method)
    }

    fn as_request_using(&self, method: HttpMethod, transport: Arc<dyn Transport>) -> Request {
        Request::with_transport(self, transport).method(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::StubTransport;

    #[test]
    fn each_entry_point_sets_its_method() {
        let cases: [(fn(&str) -> Request, HttpMethod); 8] = [
            (|u| u.as_get_request(), HttpMethod::Get),
            (|u| u.as_post_request(), HttpMethod::Post),
            (|u| u.as_put_request(), HttpMethod::Put),
            (|u| u.as_patch_request(), HttpMethod::Patch),
            (|u| u.as_delete_request(), HttpMethod::Delete),
            (|u| u.as_trace_request(), HttpMethod::Trace),
            (|u| u.as_head_request(), HttpMethod::Head),
            (|u| u.as_options_request(), HttpMethod::Options),
        ];
        for (start, expected) in cases {
            let req = start("https://x.test/");
            assert_eq!(req.http_method(), expected);
            assert_eq!(req.base_uri(), "https://x.test/");
        }
    }

    #[test]
    fn explicit_transport_is_used() {
        let stub: Arc<dyn Transport> = StubTransport::new(200, "text/plain", "");
        let url = String::from("https://x.test/");
        let req = url.as_request_using(HttpMethod::Patch, stub.clone());
        assert_eq!(req.http_method(), HttpMethod::Patch);
        assert!(Arc::ptr_eq(req.transport(), &stub));
    }
}
