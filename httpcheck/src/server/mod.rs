use std::fmt;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use futures::future::BoxFuture;
use futures::future::FutureExt;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::task::JoinSet;

use crate::error::Error;
use crate::futures_misc::*;
use crate::log_ndc_future::with_peer_ndc;
use crate::net::listen;
use crate::server::conf::ServerConf;
use crate::server::conn::serve_conn;
use crate::server::conn::ServerConnShared;
use crate::server::handler::ServerHandler;
use crate::server::handler_paths::ServerHandlerPaths;
use crate::server::kind::ServerKind;
use crate::server::req::ServerRequest;
use crate::server::resp::ServerResponse;
use crate::server::tls::ServerTlsOption;

pub mod conf;
pub(crate) mod conn;
pub mod handler;
pub mod handler_paths;
pub(crate) mod http2;
pub mod kind;
pub mod req;
pub mod resp;
pub mod tls;

/// Server capability the harness drives.
///
/// The harness never inspects the concrete server type: the transport is
/// decided by [`kind`](ServerUnderTest::kind) alone.
pub trait ServerUnderTest: Send + Sync + 'static {
    fn kind(&self) -> ServerKind;

    /// Start accepting connections, resolve with the bound address.
    fn listen(&self) -> BoxFuture<'_, crate::Result<SocketAddr>>;

    /// Bound address while listening.
    fn local_addr(&self) -> Option<SocketAddr>;

    fn is_listening(&self) -> bool {
        self.local_addr().is_some()
    }

    /// Stop accepting connections and wait for open connections to finish.
    fn close(&self) -> BoxFuture<'_, crate::Result<()>>;

    fn is_tls_backed(&self) -> bool {
        self.kind().is_tls_backed()
    }

    fn is_http2_bound(&self) -> bool {
        self.kind().is_http2_bound()
    }
}

/// Builder for [`TestServer`].
pub struct ServerBuilder {
    pub kind: ServerKind,
    pub conf: ServerConf,
    pub tls: ServerTlsOption,
    /// Listen address, port `0` (the default) binds an ephemeral port.
    pub addr: SocketAddr,
    /// Initial handlers.
    pub service: ServerHandlerPaths,
}

impl ServerBuilder {
    pub fn new(kind: ServerKind) -> ServerBuilder {
        ServerBuilder {
            kind,
            conf: ServerConf::new(),
            tls: ServerTlsOption::Plain,
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            service: ServerHandlerPaths::new(),
        }
    }

    pub fn new_plain_http() -> ServerBuilder {
        ServerBuilder::new(ServerKind::PlainHttp)
    }

    /// TLS must be configured with [`set_tls`](ServerBuilder::set_tls)
    /// or [`set_tls_pkcs12`](ServerBuilder::set_tls_pkcs12).
    pub fn new_tls_http() -> ServerBuilder {
        ServerBuilder::new(ServerKind::TlsHttp)
    }

    pub fn new_http2() -> ServerBuilder {
        ServerBuilder::new(ServerKind::Http2)
    }

    /// TLS must be configured with [`set_tls`](ServerBuilder::set_tls)
    /// or [`set_tls_pkcs12`](ServerBuilder::set_tls_pkcs12).
    pub fn new_http2_tls() -> ServerBuilder {
        ServerBuilder::new(ServerKind::Http2Tls)
    }

    pub fn set_port(&mut self, port: u16) {
        self.addr.set_port(port);
    }

    pub fn set_addr<S: ToSocketAddrs>(&mut self, addr: S) -> crate::Result<()> {
        self.addr = listen::resolve_one(addr)?;
        Ok(())
    }

    pub fn set_tls(&mut self, acceptor: tls_api_openssl::TlsAcceptor) {
        self.tls = ServerTlsOption::Tls(Arc::new(acceptor));
    }

    /// Configure TLS from a PKCS#12 identity, with ALPN protocols matching
    /// the server kind.
    pub fn set_tls_pkcs12(&mut self, pkcs12: &[u8], password: &str) -> crate::Result<()> {
        self.tls = ServerTlsOption::from_pkcs12(pkcs12, password, self.kind.alpn_protocols())?;
        Ok(())
    }

    pub fn build(self) -> crate::Result<TestServer> {
        if self.kind.is_tls_backed() != self.tls.is_tls() {
            return Err(Error::TlsMismatch {
                server: self.kind,
                tls: self.tls.is_tls(),
            });
        }

        Ok(TestServer::from_builder_unchecked(self))
    }
}

struct Listening {
    local_addr: SocketAddr,
    shutdown: ShutdownSignal,
    join: JoinHandle<()>,
}

/// Server under test built on hyper.
///
/// Shared between the test (which registers handlers) and the harness
/// (which starts and stops it), usually through an `Arc`.
pub struct TestServer {
    shared: ServerConnShared,
    addr: SocketAddr,
    state: Mutex<Option<Listening>>,
}

impl fmt::Debug for TestServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestServer")
            .field("kind", &self.shared.kind)
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

impl TestServer {
    pub(crate) fn from_builder_unchecked(builder: ServerBuilder) -> TestServer {
        TestServer {
            shared: ServerConnShared {
                kind: builder.kind,
                tls: builder.tls,
                conf: builder.conf,
                handlers: Arc::new(RwLock::new(Arc::new(builder.service))),
            },
            addr: builder.addr,
            state: Mutex::new(None),
        }
    }

    /// Register a handler for a path prefix.
    pub fn set_handler(&self, path: &str, handler: Arc<dyn ServerHandler>) {
        self.with_handlers(|h| h.set_handler(path, handler));
    }

    pub fn set_handler_fn<F>(&self, path: &str, handler: F)
    where
        F: Fn(ServerRequest) -> crate::Result<ServerResponse> + Send + Sync + 'static,
    {
        self.with_handlers(|h| h.set_handler_fn(path, handler));
    }

    pub fn remove_handler(&self, path: &str) -> Option<Arc<dyn ServerHandler>> {
        self.with_handlers(|h| h.remove_handler(path))
    }

    /// Remove all handlers; requests are answered with `404` afterwards.
    pub fn clear_handlers(&self) {
        self.with_handlers(|h| h.clear());
    }

    fn with_handlers<R>(&self, f: impl FnOnce(&mut ServerHandlerPaths) -> R) -> R {
        let mut handlers = match self.shared.handlers.write() {
            Ok(handlers) => handlers,
            // a panicking handler registration must not break later tests
            Err(poisoned) => poisoned.into_inner(),
        };
        // copy on write, requests in flight keep their snapshot
        f(Arc::make_mut(&mut handlers))
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, Option<Listening>> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn listen_impl(&self) -> crate::Result<SocketAddr> {
        if self.lock_state().is_some() {
            return Err(Error::AlreadyListening);
        }

        let listener = listen::listen(&self.addr, &self.shared.conf)?;
        let local_addr = listener.local_addr()?;

        let (shutdown, shutdown_future) = shutdown_signal();
        let join = tokio::spawn(accept_loop(listener, self.shared.clone(), shutdown_future));

        let mut state = self.lock_state();
        if state.is_some() {
            // lost a race with a concurrent listen
            drop(shutdown);
            return Err(Error::AlreadyListening);
        }
        *state = Some(Listening {
            local_addr,
            shutdown,
            join,
        });

        info!("{} server listening on {}", self.shared.kind, local_addr);
        Ok(local_addr)
    }

    async fn close_impl(&self) -> crate::Result<()> {
        let listening = self.lock_state().take().ok_or(Error::ServerNotRunning)?;

        listening.shutdown.shutdown();
        listening.join.await?;

        info!("server on {} closed", listening.local_addr);
        Ok(())
    }
}

impl ServerUnderTest for TestServer {
    fn kind(&self) -> ServerKind {
        self.shared.kind
    }

    fn listen(&self) -> BoxFuture<'_, crate::Result<SocketAddr>> {
        self.listen_impl().boxed()
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.lock_state().as_ref().map(|l| l.local_addr)
    }

    fn close(&self) -> BoxFuture<'_, crate::Result<()>> {
        self.close_impl().boxed()
    }
}

async fn accept_loop(
    listener: TcpListener,
    shared: ServerConnShared,
    mut shutdown_future: ShutdownFuture,
) {
    let mut conns = JoinSet::new();
    let (conn_shutdown, conn_shutdown_rx) = watch::channel(false);

    loop {
        tokio::select! {
            _ = &mut shutdown_future => {
                debug!("shutdown requested");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    debug!("accepted connection from {}", peer);
                    let conn = serve_conn(shared.clone(), socket, peer, conn_shutdown_rx.clone());
                    conns.spawn(with_peer_ndc(peer, conn));
                }
                Err(e) => {
                    warn!("accept failed: {}", e);
                }
            },
            Some(done) = conns.join_next(), if !conns.is_empty() => {
                if let Err(e) = done {
                    warn!("connection task failed: {}", e);
                }
            }
        }
    }

    // stop accepting, then ask open connections to finish
    drop(listener);
    conn_shutdown.send_replace(true);
    while let Some(done) = conns.join_next().await {
        if let Err(e) = done {
            warn!("connection task failed: {}", e);
        }
    }
}
