pub(crate) mod body;
pub(crate) mod conf;
pub(crate) mod http1;
pub(crate) mod http2;
pub(crate) mod req;
pub(crate) mod resp;
pub(crate) mod tls;
