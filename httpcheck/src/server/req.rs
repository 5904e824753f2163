use bytes::Bytes;
use http::Version;

use crate::Headers;

/// Request as seen by a [`ServerHandler`](crate::ServerHandler).
///
/// The body is fully buffered before the handler is invoked.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    /// Pseudo-headers (`:method`, `:path`, optional `:scheme`, `:authority`)
    /// followed by regular headers.
    pub headers: Headers,
    pub version: Version,
    pub body: Bytes,
}

impl ServerRequest {
    pub fn method(&self) -> &str {
        self.headers.method()
    }

    /// Request target: path and query exactly as received.
    pub fn path(&self) -> &str {
        self.headers.path()
    }

    /// `1` for HTTP/1.x, `2` for HTTP/2.
    pub fn http_version_major(&self) -> u8 {
        match self.version {
            Version::HTTP_09 => 0,
            Version::HTTP_10 | Version::HTTP_11 => 1,
            Version::HTTP_2 => 2,
            Version::HTTP_3 => 3,
            _ => 0,
        }
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
