use std::fmt;
use std::sync::Arc;

use tls_api::TlsAcceptor as tls_api_TlsAcceptor;
use tls_api::TlsAcceptorBuilder as tls_api_TlsAcceptorBuilder;

/// TLS setup of the server under test.
#[derive(Clone)]
pub enum ServerTlsOption {
    Plain,
    Tls(Arc<tls_api_openssl::TlsAcceptor>),
}

impl fmt::Debug for ServerTlsOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerTlsOption::Plain => f.write_str("Plain"),
            ServerTlsOption::Tls(..) => f.write_str("Tls"),
        }
    }
}

impl ServerTlsOption {
    /// Build an acceptor from a PKCS#12 identity (certificate chain and key).
    pub fn from_pkcs12(
        pkcs12: &[u8],
        password: &str,
        alpn_protocols: &[&[u8]],
    ) -> crate::Result<ServerTlsOption> {
        let mut builder =
            <tls_api_openssl::TlsAcceptor as tls_api_TlsAcceptor>::builder_from_pkcs12(
                pkcs12, password,
            )?;
        if !alpn_protocols.is_empty() {
            builder.set_alpn_protocols(alpn_protocols)?;
        }
        Ok(ServerTlsOption::Tls(Arc::new(builder.build()?)))
    }

    pub fn is_tls(&self) -> bool {
        match self {
            ServerTlsOption::Plain => false,
            ServerTlsOption::Tls(..) => true,
        }
    }
}
