use std::net::SocketAddr;

use tls_api::TlsConnector as tls_api_TlsConnector;
use tokio::net::TcpStream;

use crate::client::conf::ClientConf;
use crate::net::socket::SocketStreamBox;

/// Open a TCP connection, optionally wrapped in TLS.
pub(crate) async fn connect(
    addr: SocketAddr,
    tls: Option<&tls_api_native_tls::TlsConnector>,
    conf: &ClientConf,
) -> crate::Result<SocketStreamBox> {
    let socket = TcpStream::connect(addr).await?;
    socket.set_nodelay(conf.no_delay.unwrap_or(true))?;
    info!("connected to {}", addr);

    match tls {
        None => Ok(Box::pin(socket)),
        Some(connector) => {
            let tls_stream = connector.connect_with_socket(&conf.host, socket).await?;
            debug!("TLS handshake with {} done", addr);
            Ok(Box::pin(tls_stream))
        }
    }
}
