//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Build a [`Response`] in your handler, or return anything that implements
//! [`IntoResponse`]: strings, JSON values, status codes, and
//! [`Fault`](crate::Fault)s, which become the default 500 error body.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use serde_json::{Value, json};
use tracing::warn;

use crate::error::Fault;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use http::StatusCode;
/// use weft::Response;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
pub struct Response {
    body: Vec<u8>,
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl Response {
    /// `200 OK` with `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` with `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Vec::new(), headers: Vec::new(), status: code }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Converts into the hyper response. Headers that are not valid HTTP are
    /// dropped with a warning.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut inner = http::Response::new(Full::new(Bytes::from(self.body)));
        *inner.status_mut() = self.status;
        for (name, value) in self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(name), Ok(value)) => {
                    inner.headers_mut().append(name, value);
                }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        inner
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`. Terminated by a
/// typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish(JSON, body)
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(TEXT, body.into().into_bytes())
    }

    pub fn no_body(self) -> Response {
        Response { body: Vec::new(), headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: &str, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

/// Strings go out as plain text, everything else as JSON.
impl IntoResponse for Value {
    fn into_response(self) -> Response {
        match self {
            Value::String(s) => Response::text(s),
            other => Response::json(other.to_string().into_bytes()),
        }
    }
}

/// The default fault boundary: nothing upstream handled it, so it is a 500.
impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        error_body(StatusCode::INTERNAL_SERVER_ERROR, &self.to_string())
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(ok) => ok.into_response(),
            Err(err) => err.into_response(),
        }
    }
}

/// JSON error body in the shape `{"status", "error", "message"}`.
pub(crate) fn error_body(status: StatusCode, message: &str) -> Response {
    let body = json!({
        "status": status.as_u16(),
        "error": status.canonical_reason().unwrap_or(""),
        "message": message,
    });
    Response::builder().status(status).json(body.to_string().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_puts_content_type_first() {
        let res = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/42")
            .text("made");
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.header("Content-Type"), Some(TEXT));
        assert_eq!(res.header("location"), Some("/users/42"));
        assert_eq!(res.body(), b"made");
    }

    #[test]
    fn values_pick_text_or_json() {
        let text = Value::from("hi").into_response();
        assert_eq!(text.header("content-type"), Some(TEXT));
        assert_eq!(text.body(), b"hi");

        let json = json!({"a": 1}).into_response();
        assert_eq!(json.header("content-type"), Some(JSON));
        assert_eq!(json.body(), br#"{"a":1}"#);
    }

    #[test]
    fn fault_is_a_500_with_json_body() {
        let res = Fault::IndexOutOfRange { index: 0, len: 0 }.into_response();
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["status"], 500);
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(body["message"], "index 0 out of bounds for length 0");
    }

    #[test]
    fn invalid_headers_are_dropped_on_conversion() {
        let inner = Response::builder()
            .header("bad header", "x")
            .header("x-ok", "yes")
            .no_body()
            .into_inner();
        assert_eq!(inner.headers().len(), 1);
        assert_eq!(inner.headers()["x-ok"], "yes");
    }
}
