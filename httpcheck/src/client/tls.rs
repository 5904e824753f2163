use tls_api::TlsConnector as tls_api_TlsConnector;
use tls_api::TlsConnectorBuilder;

/// TLS connector which accepts any server certificate.
///
/// Servers under test use throwaway self-signed keys, so neither the
/// chain nor the host name is verified.
pub(crate) fn insecure_connector(
    alpn_protocols: &[&[u8]],
) -> crate::Result<tls_api_native_tls::TlsConnector> {
    let mut builder = tls_api_native_tls::TlsConnector::builder()?;
    builder.set_verify_hostname(false)?;
    builder.underlying_mut().danger_accept_invalid_certs(true);

    if tls_api_native_tls::TlsConnector::SUPPORTS_ALPN {
        builder.set_alpn_protocols(alpn_protocols)?;
    }

    Ok(builder.build()?)
}
