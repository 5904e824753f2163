#[macro_use]
extern crate log;

use std::sync::Once;

mod recorder;
mod servers;

pub use self::recorder::*;
pub use self::servers::*;

// Bind on IPv4, localhost may resolve to IPv6 first
pub const BIND_HOST: &str = "127.0.0.1";

pub fn init_logger() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        log_ndc_env_logger::init();
    });
}

/// Body of `len` bytes, a repeating alphabet so misordered chunks show.
pub fn large_body(len: usize) -> String {
    (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect()
}

/// Percent-encode path and query the way a browser would.
pub fn encode_uri(path_and_query: &str) -> String {
    let url = url::Url::parse(&format!("http://localhost{}", path_and_query))
        .expect("parse url");
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_owned(),
    }
}
