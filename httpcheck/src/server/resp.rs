use bytes::Bytes;

use crate::Headers;

/// Response returned by a [`ServerHandler`](crate::ServerHandler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    pub status: u16,
    /// Regular headers only, pseudo-headers are ignored.
    pub headers: Headers,
    pub body: Bytes,
}

impl ServerResponse {
    pub fn new(status: u16) -> ServerResponse {
        ServerResponse {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    pub fn ok_200() -> ServerResponse {
        ServerResponse::new(200)
    }

    pub fn not_found_404() -> ServerResponse {
        ServerResponse::new(404)
    }

    pub fn internal_error_500(message: &str) -> ServerResponse {
        ServerResponse::new(500).with_body(message.to_owned())
    }

    pub fn found_200_plain_text(body: &str) -> ServerResponse {
        ServerResponse::ok_200()
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_body(body.to_owned())
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> ServerResponse {
        self.headers.add(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> ServerResponse {
        self.body = body.into();
        self
    }
}
