use std::fmt;

/// HTTP version spoken by the harness client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientProtocol {
    /// New HTTP/1.1 connection per request.
    Http1,
    /// One HTTP/2 session per harness.
    Http2,
}

impl fmt::Display for ClientProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientProtocol::Http1 => f.write_str("HTTP/1.1"),
            ClientProtocol::Http2 => f.write_str("HTTP/2"),
        }
    }
}

impl Default for ClientProtocol {
    fn default() -> ClientProtocol {
        ClientProtocol::Http2
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConf {
    pub protocol: ClientProtocol,
    /// Host name for TLS SNI, `:authority` and `host`.
    pub host: String,
    /// TCP_NODELAY, on by default.
    pub no_delay: Option<bool>,
}

impl Default for ClientConf {
    fn default() -> ClientConf {
        ClientConf {
            protocol: ClientProtocol::default(),
            host: "localhost".to_owned(),
            no_delay: None,
        }
    }
}

impl ClientConf {
    pub fn new() -> ClientConf {
        Default::default()
    }

    pub fn http1() -> ClientConf {
        ClientConf {
            protocol: ClientProtocol::Http1,
            ..Default::default()
        }
    }
}
