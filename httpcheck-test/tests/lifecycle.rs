//! Harness and server lifecycle: start, end, restart, misconfiguration.

use std::sync::Arc;
use std::time::Duration;

use httpcheck::*;
use httpcheck_test::*;

use tls_api::TlsAcceptor as tls_api_TlsAcceptor;
use tls_api::TlsAcceptorBuilder as tls_api_TlsAcceptorBuilder;

#[tokio::test]
async fn end_then_start_again() {
    init_logger();

    let server = test_server(ServerKind::Http2Tls);
    server.set_handler_fn("/", |_req| Ok(ServerResponse::found_200_plain_text("mango")));

    let mut check = HttpCheck::new(server.clone());
    assert_eq!(HarnessState::Uninitialized, check.state());

    check.start().await.unwrap();
    assert_eq!(HarnessState::Started, check.state());
    assert!(server.is_listening());
    let first_addr = check.local_addr().unwrap();

    let resp = check.send(Headers::new_get("/"), None).await.unwrap();
    assert_eq!("mango", resp.data);

    check.end().await.unwrap();
    assert_eq!(HarnessState::Ended, check.state());
    assert!(!server.is_listening());
    assert_eq!(None, check.local_addr());

    match check.send(Headers::new_get("/"), None).await {
        Err(Error::NotStarted) => {}
        r => panic!("unexpected result: {:?}", r),
    }

    check.start().await.unwrap();
    assert_eq!(HarnessState::Started, check.state());
    assert_ne!(0, check.local_addr().unwrap().port());
    assert_eq!(first_addr.ip(), check.local_addr().unwrap().ip());
    let resp = check.send(Headers::new_get("/"), None).await.unwrap();
    assert_eq!("mango", resp.data);
    check.end().await.unwrap();
}

#[tokio::test]
async fn start_twice_rebinds() {
    init_logger();

    let server = test_server(ServerKind::Http2);
    server.set_handler_fn("/", |_req| Ok(ServerResponse::ok_200()));

    let mut check = HttpCheck::new(server.clone());
    check.start().await.unwrap();
    check.start().await.unwrap();

    let resp = check.send(Headers::new_get("/"), None).await.unwrap();
    assert_eq!(200, resp.status());
    check.end().await.unwrap();
    assert!(!server.is_listening());
}

#[tokio::test]
async fn start_on_already_listening_server() {
    init_logger();

    let server = test_server(ServerKind::TlsHttp);
    server.listen().await.unwrap();

    let mut check = HttpCheck::new_http1(server.clone());
    check.start().await.unwrap();
    let resp = check.send(Headers::new_get("/"), None).await.unwrap();
    // no handlers registered
    assert_eq!(404, resp.status());
    check.end().await.unwrap();
}

#[tokio::test]
async fn http1_client_with_http2_server() {
    init_logger();

    let server = test_server(ServerKind::Http2);
    let mut check = HttpCheck::new_http1(server.clone());
    match check.start().await {
        Err(Error::UnsupportedTransport { client, server }) => {
            assert_eq!(ClientProtocol::Http1, client);
            assert_eq!(ServerKind::Http2, server);
        }
        r => panic!("unexpected result: {:?}", r),
    }
    assert!(!server.is_listening());
    assert_eq!(HarnessState::Uninitialized, check.state());
}

#[tokio::test]
async fn http2_client_with_http1_server() {
    init_logger();

    for &kind in &[ServerKind::PlainHttp, ServerKind::TlsHttp] {
        let server = test_server(kind);
        let mut check = HttpCheck::new(server.clone());
        match check.start().await {
            Err(Error::UnsupportedTransport { client, .. }) => {
                assert_eq!(ClientProtocol::Http2, client);
            }
            r => panic!("unexpected result: {:?}", r),
        }
        assert!(!server.is_listening());
    }
}

#[tokio::test]
async fn end_after_server_closed() {
    init_logger();

    let server = test_server(ServerKind::TlsHttp);
    let mut check = HttpCheck::new_http1(server.clone());
    check.start().await.unwrap();

    server.close().await.unwrap();
    match check.end().await {
        Err(Error::ServerNotRunning) => {}
        r => panic!("unexpected result: {:?}", r),
    }
    assert_eq!(HarnessState::Ended, check.state());
}

async fn server_close_with_open_session(kind: ServerKind) {
    init_logger();

    let server = test_server(kind);
    server.set_handler_fn("/", |_req| Ok(ServerResponse::ok_200()));

    let mut check = HttpCheck::new(server.clone());
    check.start().await.unwrap();
    let resp = check.send(Headers::new_get("/"), None).await.unwrap();
    assert_eq!(200, resp.status());

    // the idle session must not keep the server open
    tokio::time::timeout(Duration::from_secs(10), server.close())
        .await
        .expect("server close timed out")
        .unwrap();
    assert!(!server.is_listening());

    assert!(check.send(Headers::new_get("/"), None).await.is_err());
    assert!(check.end().await.is_err());
    assert_eq!(HarnessState::Ended, check.state());
}

#[tokio::test]
async fn server_close_with_open_session_plain() {
    server_close_with_open_session(ServerKind::Http2).await;
}

#[tokio::test]
async fn server_close_with_open_session_tls() {
    server_close_with_open_session(ServerKind::Http2Tls).await;
}

#[tokio::test]
async fn server_listen_and_close() {
    init_logger();

    let server = test_server(ServerKind::PlainHttp);
    assert_eq!(None, server.local_addr());

    let addr = server.listen().await.unwrap();
    assert_eq!(Some(addr), server.local_addr());
    assert_ne!(0, addr.port());

    match server.listen().await {
        Err(Error::AlreadyListening) => {}
        r => panic!("unexpected result: {:?}", r),
    }

    server.close().await.unwrap();
    match server.close().await {
        Err(Error::ServerNotRunning) => {}
        r => panic!("unexpected result: {:?}", r),
    }
}

#[test]
fn tls_server_without_tls() {
    init_logger();

    for &kind in &[ServerKind::TlsHttp, ServerKind::Http2Tls] {
        match ServerBuilder::new(kind).build() {
            Err(Error::TlsMismatch { server, tls }) => {
                assert_eq!(kind, server);
                assert!(!tls);
            }
            r => panic!("unexpected result: {:?}", r),
        }
    }
}

#[tokio::test]
async fn custom_tls_acceptor() {
    init_logger();

    let server_keys = &test_cert_gen::keys().server;
    let mut acceptor = <tls_api_openssl::TlsAcceptor as tls_api_TlsAcceptor>::builder_from_pkcs12(
        &server_keys.pkcs12,
        &server_keys.pkcs12_password,
    )
    .expect("acceptor builder");
    acceptor
        .set_alpn_protocols(&[b"h2"])
        .expect("set_alpn_protocols");

    let mut server = ServerBuilder::new_http2_tls();
    server.set_tls(acceptor.build().expect("tls acceptor"));
    let server = Arc::new(server.build().unwrap());
    server.set_handler_fn("/", |req| {
        Ok(ServerResponse::found_200_plain_text(&format!(
            "HTTP/{}",
            req.http_version_major()
        )))
    });

    let mut check = HttpCheck::new(server.clone());
    check.start().await.unwrap();
    let resp = check.send(Headers::new_get("/"), None).await.unwrap();
    assert_eq!("HTTP/2", resp.data);
    check.end().await.unwrap();
}

#[tokio::test]
async fn dyn_server_under_test() {
    init_logger();

    let server: Arc<dyn ServerUnderTest> = test_server(ServerKind::Http2);
    assert!(server.is_http2_bound());
    assert!(!server.is_tls_backed());

    let mut check: HttpCheck<dyn ServerUnderTest> = HttpCheck::new(server);
    check.start().await.unwrap();
    let resp = check.send(Headers::new(), None).await.unwrap();
    assert_eq!(404, resp.status());
    check.end().await.unwrap();
}
