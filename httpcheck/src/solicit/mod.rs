//! HTTP/2 framing and connection state.

pub(crate) mod conn;
pub mod error_code;
pub(crate) mod frame;
