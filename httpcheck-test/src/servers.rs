use std::sync::Arc;

use httpcheck::ServerBuilder;
use httpcheck::ServerKind;
use httpcheck::TestServer;

use crate::BIND_HOST;

/// Builder for a server of given kind on an ephemeral port, TLS
/// configured with the generated test keys when the kind needs it.
pub fn server_builder(kind: ServerKind) -> ServerBuilder {
    let mut server = ServerBuilder::new(kind);
    server
        .set_addr((BIND_HOST, 0))
        .expect("set_addr");
    if kind.is_tls_backed() {
        let server_keys = &test_cert_gen::keys().server;
        server
            .set_tls_pkcs12(&server_keys.pkcs12, &server_keys.pkcs12_password)
            .expect("set_tls_pkcs12");
    }
    server
}

pub fn test_server(kind: ServerKind) -> Arc<TestServer> {
    let server = server_builder(kind).build().expect("server");
    debug!("built {} test server", kind);
    Arc::new(server)
}
