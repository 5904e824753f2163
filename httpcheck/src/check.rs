use std::net::SocketAddr;
use std::sync::Arc;

use crate::assert_types::*;
use crate::client::body::RequestBody;
use crate::client::conf::ClientConf;
use crate::client::conf::ClientProtocol;
use crate::client::http1;
use crate::client::http2::Http2Session;
use crate::client::req::RequestParts;
use crate::error::Error;
use crate::server::ServerUnderTest;
use crate::server::TestServer;
use crate::Headers;

/// Lifecycle of a [`HttpCheck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    Uninitialized,
    Started,
    Ended,
}

/// Fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpCheckResponse {
    /// Response body decoded as UTF-8, invalid sequences replaced.
    pub data: String,
    /// Response headers, with the status code under `:status`.
    pub headers: Headers,
}

impl HttpCheckResponse {
    pub fn status(&self) -> u16 {
        self.headers.status()
    }
}

/// Drives a server under test with an HTTP/1.1 or HTTP/2 client.
///
/// ```text
/// Uninitialized --start--> Started --end--> Ended
///                            ^                |
///                            +-----start------+
/// ```
///
/// In HTTP/2 mode one session is opened by [`start`](HttpCheck::start)
/// and shared by all requests. In HTTP/1 mode every
/// [`send`](HttpCheck::send) opens its own connection.
pub struct HttpCheck<S: ServerUnderTest + ?Sized = TestServer> {
    server: Arc<S>,
    conf: ClientConf,
    session: Option<Http2Session>,
    state: HarnessState,
}

fn _assert_check_send(check: &mut HttpCheck) {
    assert_send::<HttpCheckResponse>();
    let _f = assert_send_future(check.send(Headers::new(), None));
}

impl<S: ServerUnderTest + ?Sized> HttpCheck<S> {
    /// HTTP/2 harness.
    pub fn new(server: Arc<S>) -> HttpCheck<S> {
        HttpCheck::with_conf(server, ClientConf::new())
    }

    /// HTTP/1.1 harness, over TLS: the server must be TLS-backed.
    pub fn new_http1(server: Arc<S>) -> HttpCheck<S> {
        HttpCheck::with_conf(server, ClientConf::http1())
    }

    pub fn with_conf(server: Arc<S>, conf: ClientConf) -> HttpCheck<S> {
        HttpCheck {
            server,
            conf,
            session: None,
            state: HarnessState::Uninitialized,
        }
    }

    pub fn server(&self) -> &Arc<S> {
        &self.server
    }

    pub fn protocol(&self) -> ClientProtocol {
        self.conf.protocol
    }

    pub fn state(&self) -> HarnessState {
        self.state
    }

    /// Server address while started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self.state {
            HarnessState::Started => self.server.local_addr(),
            HarnessState::Uninitialized | HarnessState::Ended => None,
        }
    }

    fn check_transport(&self) -> crate::Result<()> {
        let kind = self.server.kind();
        let supported = match self.conf.protocol {
            // HTTP/1 harness runs over TLS only
            ClientProtocol::Http1 => kind.is_tls_backed(),
            ClientProtocol::Http2 => kind.is_http2_bound(),
        };
        if supported {
            Ok(())
        } else {
            Err(Error::UnsupportedTransport {
                client: self.conf.protocol,
                server: kind,
            })
        }
    }

    /// Bind the server to an ephemeral port and, in HTTP/2 mode, open the
    /// client session.
    ///
    /// A server already listening is closed and bound again; a session
    /// left from a previous start is closed first.
    pub async fn start(&mut self) -> crate::Result<()> {
        self.check_transport()?;

        if let Some(session) = self.session.take() {
            session.close().await?;
        }
        if self.server.is_listening() {
            debug!("server is already listening, restarting it");
            self.server.close().await?;
        }
        self.state = HarnessState::Uninitialized;

        let addr = self.server.listen().await?;

        if self.conf.protocol == ClientProtocol::Http2 {
            match Http2Session::connect(addr, self.server.kind(), &self.conf).await {
                Ok(session) => self.session = Some(session),
                Err(e) => {
                    if let Err(close_err) = self.server.close().await {
                        warn!("failed to close server after connect error: {}", close_err);
                    }
                    return Err(e);
                }
            }
        }

        self.state = HarnessState::Started;
        info!("{} harness started on {}", self.conf.protocol, addr);
        Ok(())
    }

    /// Send one request and wait for the whole response.
    ///
    /// `:method` and `:path` default to `GET` and `/`; `:authority`
    /// replaces the default authority; other pseudo-headers are not sent.
    /// `None` sends no body, `Some("")` sends an empty one.
    pub async fn send(
        &mut self,
        headers: Headers,
        body: Option<&str>,
    ) -> crate::Result<HttpCheckResponse> {
        if self.state != HarnessState::Started {
            return Err(Error::NotStarted);
        }

        let parts = RequestParts::from_headers(headers);
        let body = RequestBody::new(body);
        debug!(
            "sending {} {}, {}",
            parts.method,
            parts.path,
            if body.has_body() { "with body" } else { "no body" }
        );

        match self.conf.protocol {
            ClientProtocol::Http2 => match &mut self.session {
                Some(session) => session.send(parts, body).await,
                None => Err(Error::NotStarted),
            },
            ClientProtocol::Http1 => {
                let addr = self.server.local_addr().ok_or(Error::ServerNotRunning)?;
                http1::send(addr, self.server.kind(), &self.conf, parts, body).await
            }
        }
    }

    /// Close the client session, then the server.
    pub async fn end(&mut self) -> crate::Result<()> {
        if self.state != HarnessState::Started {
            return Err(Error::NotStarted);
        }
        self.state = HarnessState::Ended;

        let session_result = match self.session.take() {
            Some(session) => session.close().await,
            None => Ok(()),
        };
        let server_result = self.server.close().await;

        session_result?;
        server_result?;
        info!("{} harness ended", self.conf.protocol);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::server::kind::ServerKind;
    use crate::ServerBuilder;

    fn check(kind: ServerKind, conf: ClientConf) -> HttpCheck {
        // TLS is not needed for the transport check
        let server = ServerBuilder::new(kind);
        let server = TestServer::from_builder_unchecked(server);
        HttpCheck::with_conf(Arc::new(server), conf)
    }

    #[test]
    fn http1_needs_tls_server() {
        assert!(check(ServerKind::TlsHttp, ClientConf::http1())
            .check_transport()
            .is_ok());
        assert!(check(ServerKind::Http2Tls, ClientConf::http1())
            .check_transport()
            .is_ok());
        for kind in [ServerKind::PlainHttp, ServerKind::Http2] {
            match check(kind, ClientConf::http1()).check_transport() {
                Err(Error::UnsupportedTransport { client, server }) => {
                    assert_eq!(ClientProtocol::Http1, client);
                    assert_eq!(kind, server);
                }
                r => panic!("unexpected result: {:?}", r),
            }
        }
    }

    #[test]
    fn http2_needs_http2_server() {
        assert!(check(ServerKind::Http2, ClientConf::new())
            .check_transport()
            .is_ok());
        assert!(check(ServerKind::Http2Tls, ClientConf::new())
            .check_transport()
            .is_ok());
        assert!(check(ServerKind::PlainHttp, ClientConf::new())
            .check_transport()
            .is_err());
        assert!(check(ServerKind::TlsHttp, ClientConf::new())
            .check_transport()
            .is_err());
    }

    #[tokio::test]
    async fn send_before_start() {
        let mut check = check(ServerKind::Http2, ClientConf::new());
        assert_eq!(HarnessState::Uninitialized, check.state());
        match check.send(Headers::new_get("/"), None).await {
            Err(Error::NotStarted) => {}
            r => panic!("unexpected result: {:?}", r),
        }
        match check.end().await {
            Err(Error::NotStarted) => {}
            r => panic!("unexpected result: {:?}", r),
        }
    }

    #[tokio::test]
    async fn start_fails_fast_on_mismatch() {
        let mut check = check(ServerKind::PlainHttp, ClientConf::new());
        assert!(matches!(
            check.start().await,
            Err(Error::UnsupportedTransport { .. })
        ));
        assert!(!check.server().is_listening());
        assert_eq!(HarnessState::Uninitialized, check.state());
    }
}
