use crate::server::req::ServerRequest;
use crate::server::resp::ServerResponse;

/// Server request callback.
///
/// This is the hook tests use to observe what the server received and to
/// decide what it answers.
pub trait ServerHandler: Send + Sync + 'static {
    /// Handle a fully received request.
    ///
    /// An error is answered with `500`, the error text as the body.
    fn start_request(&self, req: ServerRequest) -> crate::Result<ServerResponse>;
}

impl<F> ServerHandler for F
where
    F: Fn(ServerRequest) -> crate::Result<ServerResponse> + Send + Sync + 'static,
{
    fn start_request(&self, req: ServerRequest) -> crate::Result<ServerResponse> {
        self(req)
    }
}
