use std::fmt;

/// Server under test, selected once when the server is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerKind {
    /// HTTP/1.1 over TCP.
    PlainHttp,
    /// HTTP/1.1 over TLS.
    TlsHttp,
    /// HTTP/2 over TCP, prior knowledge.
    Http2,
    /// HTTP/2 over TLS, falls back to HTTP/1.1 for HTTP/1 clients.
    Http2Tls,
}

impl ServerKind {
    pub fn is_tls_backed(&self) -> bool {
        match self {
            ServerKind::TlsHttp | ServerKind::Http2Tls => true,
            ServerKind::PlainHttp | ServerKind::Http2 => false,
        }
    }

    pub fn is_http2_bound(&self) -> bool {
        match self {
            ServerKind::Http2 | ServerKind::Http2Tls => true,
            ServerKind::PlainHttp | ServerKind::TlsHttp => false,
        }
    }

    /// URI scheme implied by the transport security.
    pub fn scheme(&self) -> &'static str {
        if self.is_tls_backed() {
            "https"
        } else {
            "http"
        }
    }

    /// ALPN protocols offered by the TLS acceptor.
    pub(crate) fn alpn_protocols(&self) -> &'static [&'static [u8]] {
        match self {
            ServerKind::Http2Tls => &[b"h2", b"http/1.1"],
            ServerKind::TlsHttp => &[b"http/1.1"],
            ServerKind::PlainHttp | ServerKind::Http2 => &[],
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerKind::PlainHttp => "plain HTTP/1.1",
            ServerKind::TlsHttp => "HTTP/1.1 over TLS",
            ServerKind::Http2 => "plain HTTP/2",
            ServerKind::Http2Tls => "HTTP/2 over TLS",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn capabilities() {
        assert!(!ServerKind::PlainHttp.is_tls_backed());
        assert!(ServerKind::TlsHttp.is_tls_backed());
        assert!(!ServerKind::Http2.is_tls_backed());
        assert!(ServerKind::Http2Tls.is_tls_backed());

        assert!(!ServerKind::PlainHttp.is_http2_bound());
        assert!(!ServerKind::TlsHttp.is_http2_bound());
        assert!(ServerKind::Http2.is_http2_bound());
        assert!(ServerKind::Http2Tls.is_http2_bound());
    }

    #[test]
    fn scheme() {
        assert_eq!("http", ServerKind::Http2.scheme());
        assert_eq!("https", ServerKind::Http2Tls.scheme());
        assert_eq!("https", ServerKind::TlsHttp.scheme());
    }
}
