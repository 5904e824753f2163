#![deny(rustdoc::broken_intra_doc_links)]

//! Test harness for HTTP servers.
//!
//! [`HttpCheck`] starts a server under test on an ephemeral port, opens
//! a matching client connection (HTTP/2 plain or over TLS, HTTP/1.1
//! over TLS) and turns a request into a single awaitable call:
//!
//! ```no_run
//! # async fn run() -> httpcheck::Result<()> {
//! use std::sync::Arc;
//! use httpcheck::*;
//!
//! let server = Arc::new(ServerBuilder::new_http2().build()?);
//! server.set_handler_fn("/", |_req| Ok(ServerResponse::found_200_plain_text("hello")));
//!
//! let mut check = HttpCheck::new(server.clone());
//! check.start().await?;
//! let resp = check.send(Headers::new_get("/"), None).await?;
//! assert_eq!(200, resp.status());
//! assert_eq!("hello", resp.data);
//! check.end().await?;
//! # Ok(())
//! # }
//! ```
//!
//! HTTP/1 goes through `hyper`. HTTP/2 uses the framing and HPACK code in
//! this crate, which sends the `:path` pseudo-header exactly as given, so
//! servers can be checked against request targets `hyper` would reject.

#[macro_use]
extern crate log;

pub use crate::check::HarnessState;
pub use crate::check::HttpCheck;
pub use crate::check::HttpCheckResponse;
pub use crate::client::conf::ClientConf;
pub use crate::client::conf::ClientProtocol;
pub use crate::error::Error;
pub use crate::headers::Header;
pub use crate::headers::HeaderName;
pub use crate::headers::Headers;
pub use crate::headers::PseudoHeaderName;
pub use crate::result::Result;
pub use crate::server::conf::ServerConf;
pub use crate::server::handler::ServerHandler;
pub use crate::server::handler_paths::ServerHandlerPaths;
pub use crate::server::kind::ServerKind;
pub use crate::server::req::ServerRequest;
pub use crate::server::resp::ServerResponse;
pub use crate::server::tls::ServerTlsOption;
pub use crate::server::ServerBuilder;
pub use crate::server::ServerUnderTest;
pub use crate::server::TestServer;
pub use crate::solicit::error_code::ErrorCode;

mod assert_types;
mod check;
mod client;
mod error;
mod futures_misc;
mod headers;
mod hpack;
mod log_ndc_future;
mod net;
mod result;
mod server;
mod solicit;
