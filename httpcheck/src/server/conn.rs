use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::RwLock;

use bytes::Bytes;
use http_body_util::BodyExt;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper::Response;
use hyper_util::rt::TokioIo;
use tls_api::TlsAcceptor as tls_api_TlsAcceptor;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::error::Error;
use crate::net::rewind::Rewind;
use crate::net::socket::SocketStream;
use crate::server::conf::ServerConf;
use crate::server::handler::ServerHandler;
use crate::server::handler_paths::ServerHandlerPaths;
use crate::server::http2::looks_like_http_1;
use crate::server::http2::read_preface;
use crate::server::http2::serve_http2;
use crate::server::http2::Preface;
use crate::server::http2::HTTP_1_500_RESPONSE;
use crate::server::kind::ServerKind;
use crate::server::req::ServerRequest;
use crate::server::resp::ServerResponse;
use crate::server::tls::ServerTlsOption;
use crate::Headers;

/// Handler registry; replaced as a whole on every change, so requests
/// run against a snapshot without holding the lock.
pub(crate) type Handlers = RwLock<Arc<ServerHandlerPaths>>;

/// Everything a connection task needs, shared by all connections.
#[derive(Clone)]
pub(crate) struct ServerConnShared {
    pub kind: ServerKind,
    pub tls: ServerTlsOption,
    pub conf: ServerConf,
    pub handlers: Arc<Handlers>,
}

/// Resolves once the server is closing, or the sender is gone.
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Serve one accepted connection until the peer closes it or the server
/// shuts down.
pub(crate) async fn serve_conn(
    shared: ServerConnShared,
    socket: TcpStream,
    peer: SocketAddr,
    shutdown: watch::Receiver<bool>,
) {
    if let Some(no_delay) = shared.conf.no_delay {
        if let Err(e) = socket.set_nodelay(no_delay) {
            warn!("failed to set TCP_NODELAY: {}", e);
        }
    }

    let result = match shared.tls.clone() {
        ServerTlsOption::Plain => serve_io(&shared, socket, shutdown).await,
        ServerTlsOption::Tls(acceptor) => match acceptor.accept_with_socket(socket).await {
            Ok(tls_stream) => {
                debug!("TLS handshake done");
                serve_io(&shared, tls_stream, shutdown).await
            }
            Err(e) => {
                warn!("TLS handshake with {} failed: {}", peer, e);
                return;
            }
        },
    };

    match result {
        Ok(()) => debug!("connection closed"),
        Err(e) => debug!("connection closed with error: {}", e),
    }
}

async fn serve_io<I: SocketStream + Unpin>(
    shared: &ServerConnShared,
    mut io: I,
    shutdown: watch::Receiver<bool>,
) -> crate::Result<()> {
    match shared.kind {
        ServerKind::PlainHttp | ServerKind::TlsHttp => {
            serve_http1(&shared.handlers, io, shutdown).await
        }
        ServerKind::Http2 => match read_preface(&mut io).await? {
            Preface::Http2(rest) => serve_http2(&shared.handlers, io, rest, shutdown).await,
            Preface::Other(buf) => {
                if looks_like_http_1(&buf) {
                    io.write_all(HTTP_1_500_RESPONSE).await?;
                    return Err(Error::RequestIsMadeUsingHttp1);
                }
                Err(Error::InvalidFrame(format!(
                    "wrong preface: {:?}",
                    String::from_utf8_lossy(&buf)
                )))
            }
        },
        // ALPN is advisory, the first bytes decide
        ServerKind::Http2Tls => match read_preface(&mut io).await? {
            Preface::Http2(rest) => serve_http2(&shared.handlers, io, rest, shutdown).await,
            Preface::Other(buf) => {
                debug!("no HTTP/2 preface, serving HTTP/1");
                let io = Rewind::new(buf.freeze(), io);
                serve_http1(&shared.handlers, io, shutdown).await
            }
        },
    }
}

async fn serve_http1<I>(
    handlers: &Arc<Handlers>,
    io: I,
    mut shutdown: watch::Receiver<bool>,
) -> crate::Result<()>
where
    I: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin + 'static,
{
    let handlers = handlers.clone();
    let service = service_fn(move |req: Request<Incoming>| {
        let handlers = handlers.clone();
        async move { handle_http1_request(&handlers, req).await }
    });

    let conn = hyper::server::conn::http1::Builder::new().serve_connection(TokioIo::new(io), service);
    tokio::pin!(conn);

    tokio::select! {
        r = conn.as_mut() => r?,
        _ = shutdown_requested(&mut shutdown) => {
            debug!("server shutdown, closing HTTP/1 connection");
            conn.as_mut().graceful_shutdown();
            conn.await?;
        }
    }
    Ok(())
}

/// Run the handler registered for the request path; `404` if there is
/// none, `500` if it fails.
pub(crate) fn dispatch(handlers: &Handlers, req: ServerRequest) -> ServerResponse {
    let paths = match handlers.read() {
        Ok(paths) => paths.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };

    debug!(
        "{} {} HTTP/{}, {} body bytes",
        req.method(),
        req.path(),
        req.http_version_major(),
        req.body.len()
    );

    match paths.start_request(req) {
        Ok(resp) => resp,
        Err(e) => {
            warn!("request handler failed: {}", e);
            ServerResponse::internal_error_500(&format!("{}", e))
        }
    }
}

async fn handle_http1_request(
    handlers: &Handlers,
    req: Request<Incoming>,
) -> crate::Result<Response<Full<Bytes>>> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();

    let mut headers = Headers::new();
    headers.add(":method", parts.method.as_str());
    headers.add(
        ":path",
        parts
            .uri
            .path_and_query()
            .map(|p| p.as_str())
            .unwrap_or("/"),
    );
    if let Some(scheme) = parts.uri.scheme_str() {
        headers.add(":scheme", scheme);
    }
    if let Some(authority) = parts.uri.authority() {
        headers.add(":authority", authority.as_str());
    }
    for (name, value) in &parts.headers {
        headers.add(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }

    let req = ServerRequest {
        headers,
        version: parts.version,
        body,
    };
    let resp = dispatch(handlers, req);

    match to_hyper_response(&resp) {
        Ok(r) => Ok(r),
        Err(e) => {
            warn!("handler returned malformed response: {}", e);
            to_hyper_response(&ServerResponse::internal_error_500(&format!("{}", e)))
        }
    }
}

fn to_hyper_response(resp: &ServerResponse) -> crate::Result<Response<Full<Bytes>>> {
    let mut builder = Response::builder().status(resp.status);
    for header in resp.headers.regular_headers() {
        builder = builder.header(header.name(), header.value());
    }
    Ok(builder.body(Full::new(resp.body.clone()))?)
}

#[cfg(test)]
mod test {
    use super::*;

    use http::Version;

    fn request(path: &str) -> ServerRequest {
        ServerRequest {
            headers: Headers::new_get(path),
            version: Version::HTTP_11,
            body: Bytes::new(),
        }
    }

    #[test]
    fn response_headers_and_status() {
        let resp = ServerResponse::ok_200()
            .with_header("x-request-id", "abc")
            .with_body("{}");
        let resp = to_hyper_response(&resp).unwrap();
        assert_eq!(200, resp.status().as_u16());
        assert_eq!("abc", resp.headers()["x-request-id"]);
    }

    #[test]
    fn malformed_status_is_error() {
        assert!(to_hyper_response(&ServerResponse::new(1000)).is_err());
    }

    #[test]
    fn dispatch_routes_and_reports_errors() {
        let mut paths = ServerHandlerPaths::new();
        paths.set_handler_fn("/items", |req: ServerRequest| {
            Ok(ServerResponse::found_200_plain_text(req.path()))
        });
        paths.set_handler_fn("/broken", |_req| Err(Error::User("no stock".to_owned())));
        let handlers: Handlers = RwLock::new(Arc::new(paths));

        let resp = dispatch(&handlers, request("/items?q=dried fruit"));
        assert_eq!(200, resp.status);
        assert_eq!(&b"/items?q=dried fruit"[..], &resp.body[..]);

        let resp = dispatch(&handlers, request("/broken"));
        assert_eq!(500, resp.status);
        assert_eq!(&b"User error: no stock"[..], &resp.body[..]);

        assert_eq!(404, dispatch(&handlers, request("/customers")).status);
    }

    #[test]
    fn dispatch_uses_snapshot() {
        let handlers: Arc<Handlers> = Arc::new(RwLock::new(Arc::new(ServerHandlerPaths::new())));
        let registry = handlers.clone();
        let mut paths = ServerHandlerPaths::new();
        // a handler changing the registry while it runs must not deadlock
        paths.set_handler_fn("/", move |_req| {
            let mut guard = registry.write().unwrap();
            Arc::make_mut(&mut guard).clear();
            Ok(ServerResponse::ok_200())
        });
        *handlers.write().unwrap() = Arc::new(paths);

        assert_eq!(200, dispatch(&handlers, request("/")).status);
        assert_eq!(404, dispatch(&handlers, request("/")).status);
    }

    #[tokio::test]
    async fn shutdown_resolves_when_sender_dropped() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        shutdown_requested(&mut rx).await;
    }

    #[tokio::test]
    async fn shutdown_resolves_on_signal() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { shutdown_requested(&mut rx).await });
        tx.send_replace(true);
        waiter.await.unwrap();
    }
}
