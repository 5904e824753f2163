use std::io;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;

use tokio::net::TcpListener;

use crate::error::Error;
use crate::server::conf::ServerConf;

/// Resolve an address which must resolve to exactly one socket address.
pub(crate) fn resolve_one<S: ToSocketAddrs>(addr: S) -> crate::Result<SocketAddr> {
    let addrs: Vec<_> = addr.to_socket_addrs()?.collect();
    if addrs.is_empty() {
        return Err(Error::AddrResolvedToEmptyList);
    } else if addrs.len() > 1 {
        return Err(Error::AddrResolvedToMoreThanOneAddr(addrs));
    }
    Ok(addrs[0])
}

#[cfg(not(windows))]
fn configure_tcp(tcp: &net2::TcpBuilder, conf: &ServerConf) -> io::Result<()> {
    use net2::unix::UnixTcpBuilderExt;
    if let Some(reuse_port) = conf.reuse_port {
        tcp.reuse_port(reuse_port)?;
    }
    Ok(())
}

#[cfg(windows)]
fn configure_tcp(_tcp: &net2::TcpBuilder, _conf: &ServerConf) -> io::Result<()> {
    Ok(())
}

fn std_listener(addr: &SocketAddr, conf: &ServerConf) -> io::Result<std::net::TcpListener> {
    let listener = match *addr {
        SocketAddr::V4(_) => net2::TcpBuilder::new_v4()?,
        SocketAddr::V6(_) => net2::TcpBuilder::new_v6()?,
    };

    if let SocketAddr::V6(_) = *addr {
        let only_v6 = conf.only_v6.unwrap_or(false);
        listener.only_v6(only_v6)?;
    }

    configure_tcp(&listener, conf)?;
    listener.reuse_address(true)?;
    debug!("binding socket to {}", addr);
    listener.bind(addr)?;
    let backlog = conf.backlog.unwrap_or(1024);
    listener.listen(backlog)
}

/// Bind a listener, port `0` picks an ephemeral port.
///
/// Must be called within a tokio runtime.
pub(crate) fn listen(addr: &SocketAddr, conf: &ServerConf) -> io::Result<TcpListener> {
    let listener = std_listener(addr, conf)?;
    listener.set_nonblocking(true)?;
    TcpListener::from_std(listener)
}
