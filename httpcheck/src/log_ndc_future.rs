use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

/// Log everything `f` logs with the peer address in the diagnostic context.
pub(crate) fn with_peer_ndc<F: Future>(peer: SocketAddr, f: F) -> PeerNdcFuture<F> {
    PeerNdcFuture {
        ndc: Arc::new(format!("conn {}", peer)),
        f: Box::pin(f),
    }
}

pub(crate) struct PeerNdcFuture<F: Future> {
    ndc: Arc<String>,
    f: Pin<Box<F>>,
}

impl<F: Future> Future for PeerNdcFuture<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<F::Output> {
        let _guard = log_ndc::push(self.ndc.clone());
        self.f.as_mut().poll(cx)
    }
}
