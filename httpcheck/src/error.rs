use std::io;
use std::net::SocketAddr;

use crate::assert_types::*;
use crate::client::conf::ClientProtocol;
use crate::hpack::DecoderError;
use crate::server::kind::ServerKind;
use crate::solicit::error_code::ErrorCode;
use crate::solicit::frame::ParseFrameError;

/// Errors returned by the harness and by the test server.
///
/// Failures of the underlying stack (socket, TLS, HTTP) are passed through
/// unchanged; the harness adds only configuration and lifecycle errors.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum Error {
    #[error("I/O error: {0}")]
    IoError(#[source] io::Error),
    #[error("tls-api layer error: {0}")]
    TlsError(#[source] anyhow::Error),
    #[error("HTTP error: {0}")]
    Hyper(#[source] hyper::Error),
    #[error("Invalid request: {0}")]
    Http(#[source] http::Error),
    #[error("Invalid URI: {0}")]
    InvalidUri(#[source] http::uri::InvalidUri),
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[source] http::header::InvalidHeaderName),
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[source] http::header::InvalidHeaderValue),
    #[error("Invalid method: {0}")]
    InvalidMethod(#[source] http::method::InvalidMethod),
    /// Connection error detected locally.
    #[error("HTTP/2 connection error: {0}")]
    CodeError(ErrorCode),
    #[error("RST_STREAM received: {0}")]
    RstStreamReceived(ErrorCode),
    #[error("GOAWAY received: {0}")]
    GoawayReceived(ErrorCode),
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Failed to parse frame: {0}")]
    ParseFrameError(#[source] ParseFrameError),
    #[error("Header block decoding failed: {0}")]
    CompressionError(#[source] DecoderError),
    #[error("Unexpected push promise")]
    UnexpectedPushPromise,
    #[error("EOF from stream")]
    EofFromStream,
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Request is made using HTTP/1")]
    RequestIsMadeUsingHttp1,
    /// Client protocol cannot talk to the server kind.
    #[error("{client} client cannot be used with {server} server")]
    UnsupportedTransport {
        client: ClientProtocol,
        server: ServerKind,
    },
    /// TLS server without an acceptor, or plain server with one.
    #[error("{server} server built with TLS configured: {tls}")]
    TlsMismatch { server: ServerKind, tls: bool },
    #[error("Harness is not started")]
    NotStarted,
    #[error("Server is already listening")]
    AlreadyListening,
    #[error("Server is not running")]
    ServerNotRunning,
    #[error("Address resolved to empty list")]
    AddrResolvedToEmptyList,
    #[error("Address resolved to more than one address")]
    AddrResolvedToMoreThanOneAddr(Vec<SocketAddr>),
    #[error("Connection task panicked: {0}")]
    ConnectionTaskPanicked(String),
    #[error("User error: {0}")]
    User(String),
}

fn _assert_error_sync_send() {
    assert_send::<Error>();
    assert_sync::<Error>();
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        Error::TlsError(err)
    }
}

impl From<hyper::Error> for Error {
    fn from(err: hyper::Error) -> Error {
        Error::Hyper(err)
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Error {
        Error::Http(err)
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Error {
        Error::InvalidUri(err)
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Error {
        Error::InvalidHeaderName(err)
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Error {
        Error::InvalidHeaderValue(err)
    }
}

impl From<http::method::InvalidMethod> for Error {
    fn from(err: http::method::InvalidMethod) -> Error {
        Error::InvalidMethod(err)
    }
}

impl From<ParseFrameError> for Error {
    fn from(err: ParseFrameError) -> Error {
        Error::ParseFrameError(err)
    }
}

impl From<DecoderError> for Error {
    fn from(err: DecoderError) -> Error {
        Error::CompressionError(err)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Error {
        if err.is_panic() {
            Error::ConnectionTaskPanicked(format!("{}", err))
        } else {
            Error::IoError(io::Error::new(io::ErrorKind::Other, err))
        }
    }
}

impl Into<io::Error> for Error {
    fn into(self) -> io::Error {
        match self {
            Error::IoError(e) => e,
            e => io::Error::new(io::ErrorKind::Other, e),
        }
    }
}
