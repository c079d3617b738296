//! Request execution.
//!
//! # Design
//! Execution is split the same way the request lifecycle is: `build_*`
//! methods turn the configured [`Request`] into a URL or a plain
//! [`HttpRequest`] without any I/O, and `send` hands that request to the
//! transport. `send` never looks at the status code. The `fetch_*` helpers
//! layer `ensure_success` and one read on top, and drop the response before
//! returning on every path.

use std::io::Cursor;

use ::url::Url;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::http::HttpRequest;
use crate::json::JsonOptions;
use crate::request::Request;
use crate::response::Response;
use crate::url::compose_url;

impl Request {
    /// The URL this request would be sent to.
    pub fn build_url(&self) -> Result<Url> {
        compose_url(self.base_uri(), self.path_segments(), self.query_parameters())
    }

    pub fn build_url_string(&self) -> Result<String> {
        self.build_url().map(String::from)
    }

    /// Assemble the transport-level request, materializing the body.
    ///
    /// When a body is attached its media type is authoritative, so a
    /// `Content-Type` set through [`Request::header`] is left out.
    pub fn build_http_request(&self) -> Result<HttpRequest> {
        let url = self.build_url()?;
        let body = self.body_source().map(|source| source.materialize()).transpose()?;
        let headers = self
            .headers()
            .iter()
            .filter(|(name, _)| body.is_none() || !name.eq_ignore_ascii_case("content-type"))
            .cloned()
            .collect();

        Ok(HttpRequest {
            method: self.http_method(),
            url: url.into(),
            headers,
            body,
        })
    }

    /// Perform one round-trip and return the response without checking its status.
    pub async fn send(&self) -> Result<Response> {
        let cancel = self.cancellation_token().clone();
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let request = self.build_http_request()?;
        debug!(method = %request.method, url = %request.url, "sending request");

        let raw = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("request cancelled before a response arrived");
                return Err(Error::Cancelled);
            }
            result = self.transport().send(request, &cancel) => result?,
        };

        debug!(status = raw.status, "received response");
        Ok(Response::new(raw, cancel))
    }

    /// Send and fail with [`Error::Http`] on a non-2xx status.
    pub async fn ensure_success(&self) -> Result<()> {
        let response = self.send().await?;
        response.ensure_success()
    }

    pub async fn fetch_text(&self) -> Result<String> {
        let mut response = self.send().await?;
        response.ensure_success()?;
        response.read_text().await
    }

    pub async fn fetch_bytes(&self) -> Result<Bytes> {
        let mut response = self.send().await?;
        response.ensure_success()?;
        response.bytes().await
    }

    /// Send, check the status and return the body as an owned, seekable stream.
    pub async fn fetch_stream(&self) -> Result<Cursor<Bytes>> {
        let mut response = self.send().await?;
        response.ensure_success()?;
        response.read_stream().await
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self) -> Result<T> {
        self.fetch_json_with(&JsonOptions::default()).await
    }

    pub async fn fetch_json_with<T: DeserializeOwned>(&self, options: &JsonOptions) -> Result<T> {
        let mut response = self.send().await?;
        response.ensure_success()?;
        response.read_json_with(options).await
    }

    pub async fn fetch_xml<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let mut response = self.send().await?;
        response.ensure_success()?;
        response.read_xml().await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::sync::Arc;

    use serde::{Deserialize, Serialize};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::http::HttpMethod;
    use crate::transport::testing::{PendingTransport, StubTransport};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct User {
        id: u32,
        name: String,
    }

    fn request_with(stub: &Arc<StubTransport>) -> Request {
        Request::with_transport("https://api.example.test/", stub.clone())
    }

    #[test]
    fn build_url_combines_segments_and_query() {
        let stub = StubTransport::new(200, "text/plain", "");
        let req = request_with(&stub)
            .path_segment("search")
            .unwrap()
            .query_parameter("q", "how much does a pug snore");
        assert_eq!(
            req.build_url_string().unwrap(),
            "https://api.example.test/search?q=how+much+does+a+pug+snore"
        );
        assert!(stub.requests().is_empty());
    }

    #[test]
    fn http_request_copies_method_headers_and_body() {
        let stub = StubTransport::new(200, "text/plain", "");
        let req = request_with(&stub)
            .as_put()
            .accept_plain_text()
            .accept_json()
            .header("Content-Type", "text/csv")
            .unwrap()
            .text_body("This is a test");
        let http = req.build_http_request().unwrap();
        assert_eq!(http.method, HttpMethod::Put);
        assert_eq!(http.header("accept"), Some("text/plain, application/json"));
        assert_eq!(http.header("content-type"), None);
        assert_eq!(http.headers.len(), 1);
        let body = http.body.unwrap();
        assert_eq!(body.content_type, "text/plain; charset=utf-8");
        assert_eq!(&body.data[..], b"This is a test");
    }

    #[test]
    fn content_type_header_is_kept_without_body() {
        let stub = StubTransport::new(200, "text/plain", "");
        let req = request_with(&stub).header("Content-Type", "text/csv").unwrap();
        let http = req.build_http_request().unwrap();
        assert_eq!(http.header("Content-Type"), Some("text/csv"));
        assert!(http.body.is_none());
    }

    #[tokio::test]
    async fn send_returns_non_success_without_error() {
        let stub = StubTransport::new(500, "text/plain", "boom");
        let mut response = request_with(&stub).send().await.unwrap();
        assert_eq!(response.status(), 500);
        assert_eq!(response.read_text().await.unwrap(), "boom");
    }

    #[tokio::test]
    async fn fetch_json_reads_user() {
        let stub = StubTransport::new(200, "application/json", r#"{"id":1,"name":"Leanne Graham"}"#);
        let user: User = request_with(&stub)
            .path_segment("users")
            .unwrap()
            .path_segment(1)
            .unwrap()
            .fetch_json()
            .await
            .unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                name: "Leanne Graham".to_string()
            }
        );
        assert_eq!(stub.requests()[0].url, "https://api.example.test/users/1");
    }

    #[tokio::test]
    async fn fetch_helpers_fail_on_error_status_before_parsing() {
        let stub = StubTransport::new(404, "application/json", "not json at all");
        let req = request_with(&stub);

        assert_eq!(req.ensure_success().await.unwrap_err().status(), Some(404));
        assert_eq!(req.fetch_text().await.unwrap_err().status(), Some(404));
        assert_eq!(req.fetch_stream().await.unwrap_err().status(), Some(404));
        assert_eq!(req.fetch_json::<User>().await.unwrap_err().status(), Some(404));
        assert_eq!(req.fetch_xml::<User>().await.unwrap_err().status(), Some(404));
        assert_eq!(stub.requests().len(), 5);
    }

    #[tokio::test]
    async fn fetch_stream_outlives_the_response() {
        let stub = StubTransport::chunked(200, "text/plain", &["hello", " ", "world"]);
        let mut stream = request_with(&stub).fetch_stream().await.unwrap();
        let mut text = String::new();
        stream.read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn sending_twice_materializes_body_each_time() {
        let stub = StubTransport::new(200, "text/plain", "ok");
        let req = request_with(&stub)
            .as_post()
            .json_body(&User {
                id: 1,
                name: "foo".to_string(),
            })
            .unwrap();
        req.ensure_success().await.unwrap();
        req.ensure_success().await.unwrap();

        let requests = stub.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].body, requests[1].body);
        assert_eq!(requests[0].body.as_ref().unwrap().content_type, "application/json");
    }

    #[tokio::test]
    async fn form_body_reaches_transport_encoded() {
        let stub = StubTransport::new(200, "text/plain", "ok");
        request_with(&stub)
            .as_post()
            .form_body([("name", "Leanne Graham"), ("tag", "a"), ("tag", "b")])
            .ensure_success()
            .await
            .unwrap();
        let body = stub.requests()[0].body.clone().unwrap();
        assert_eq!(&body.data[..], b"name=Leanne+Graham&tag=a&tag=b");
    }

    #[tokio::test]
    async fn cancelled_token_stops_send_before_transport() {
        let stub = StubTransport::new(200, "text/plain", "ok");
        let token = CancellationToken::new();
        token.cancel();
        let err = request_with(&stub).with_cancellation(token).send().await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn cancellation_aborts_an_in_flight_send() {
        let token = CancellationToken::new();
        let req = Request::with_transport("https://api.example.test/", Arc::new(PendingTransport))
            .with_cancellation(token.clone());
        let canceller = tokio::spawn(async move { token.cancel() });
        let err = req.send().await.unwrap_err();
        canceller.await.unwrap();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn invalid_base_uri_fails_before_transport() {
        let stub = StubTransport::new(200, "text/plain", "ok");
        let err = Request::with_transport("::not a url::", stub.clone())
            .send()
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(stub.requests().is_empty());
    }
}
