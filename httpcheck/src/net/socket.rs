use std::pin::Pin;

use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;

/// TCP stream or TLS stream over TCP; any async stream hyper can drive.
pub(crate) trait SocketStream: AsyncRead + AsyncWrite + Send + 'static {}

impl<T: AsyncRead + AsyncWrite + Send + 'static> SocketStream for T {}

pub(crate) type SocketStreamBox = Pin<Box<dyn SocketStream>>;
