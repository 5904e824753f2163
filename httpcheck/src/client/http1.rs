use std::net::SocketAddr;

use http::Uri;
use http::Version;
use hyper_util::rt::TokioIo;

use crate::check::HttpCheckResponse;
use crate::client::body::RequestBody;
use crate::client::conf::ClientConf;
use crate::client::req::RequestParts;
use crate::client::resp::read_response;
use crate::client::tls::insecure_connector;
use crate::net::connect::connect;
use crate::server::kind::ServerKind;

/// Send one request over a fresh HTTP/1.1 connection.
///
/// The connection is closed once the response is read, so no state is
/// shared between requests.
pub(crate) async fn send(
    addr: SocketAddr,
    kind: ServerKind,
    conf: &ClientConf,
    mut parts: RequestParts,
    body: RequestBody,
) -> crate::Result<HttpCheckResponse> {
    let host = match parts.authority.take() {
        Some(authority) => authority,
        None => format!("{}:{}", conf.host, addr.port()),
    };
    if parts.headers.get_opt("host").is_none() {
        parts.headers.add("host", host);
    }

    // origin-form target, rejected here if not a valid URI
    let uri: Uri = parts.path.parse()?;
    let req = parts.to_request(uri, Version::HTTP_11, body)?;

    let tls = if kind.is_tls_backed() {
        Some(insecure_connector(&[b"http/1.1"])?)
    } else {
        None
    };
    let socket = connect(addr, tls.as_ref(), conf).await?;

    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(socket)).await?;
    let conn = tokio::spawn(conn);

    debug!("{} {} over HTTP/1.1", parts.method, parts.path);
    let resp = sender.send_request(req).await?;
    let resp = read_response(resp).await?;

    drop(sender);
    if let Err(e) = conn.await? {
        debug!("HTTP/1.1 connection closed with error: {}", e);
    }

    Ok(resp)
}
