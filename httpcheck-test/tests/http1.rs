//! HTTP/1.1 harness against TLS servers which speak HTTP/1.1.

use httpcheck::*;
use httpcheck_test::*;

async fn request_is_observed(kind: ServerKind) {
    init_logger();

    let server = test_server(kind);
    let recorder = RecordingHandler::with_response(
        ServerResponse::new(202).with_body(r#"{"customerId":543,"key":1,"productId":2558}"#),
    );
    server.set_handler("/", recorder.clone());

    let mut check = HttpCheck::new_http1(server.clone());
    check.start().await.unwrap();
    let port = check.local_addr().unwrap().port();

    let mut headers = Headers::new_post("/customer/543/favorites");
    headers.add("content-type", "application/json");
    headers.add("accept-encoding", "gzip deflate");
    let resp = check
        .send(headers, Some(r#"{"productId":2558}"#))
        .await
        .unwrap();
    assert_eq!(202, resp.status());
    assert_eq!(r#"{"customerId":543,"key":1,"productId":2558}"#, resp.data);

    let req = recorder.last_request();
    assert_eq!("POST", req.method());
    assert_eq!("/customer/543/favorites", req.path());
    assert_eq!(1, req.http_version_major());
    assert_eq!(Some("gzip deflate"), req.headers.get_opt("accept-encoding"));
    assert_eq!(
        Some(format!("localhost:{}", port).as_str()),
        req.headers.get_opt("host")
    );
    assert_eq!(r#"{"productId":2558}"#, req.body_str());

    check.end().await.unwrap();
}

#[tokio::test]
async fn request_is_observed_tls() {
    request_is_observed(ServerKind::TlsHttp).await;
}

#[tokio::test]
async fn request_is_observed_http2_tls_fallback() {
    request_is_observed(ServerKind::Http2Tls).await;
}

#[tokio::test]
async fn unencoded_path_is_rejected() {
    init_logger();

    let server = test_server(ServerKind::TlsHttp);
    let recorder = RecordingHandler::new();
    server.set_handler("/", recorder.clone());

    let mut check = HttpCheck::new_http1(server.clone());
    check.start().await.unwrap();

    match check
        .send(Headers::new_get("/items?q=dried fruit"), None)
        .await
    {
        Err(Error::InvalidUri(..)) => {}
        r => panic!("unexpected result: {:?}", r),
    }
    assert_eq!(0, recorder.count());

    let resp = check
        .send(Headers::new_get(encode_uri("/items?q=dried fruit")), None)
        .await
        .unwrap();
    assert_eq!(200, resp.status());
    assert_eq!("/items?q=dried%20fruit", recorder.last_request().path());

    check.end().await.unwrap();
}

#[tokio::test]
async fn connection_per_request() {
    init_logger();

    let server = test_server(ServerKind::TlsHttp);
    let recorder = RecordingHandler::new();
    server.set_handler("/", recorder.clone());

    let mut check = HttpCheck::new_http1(server.clone());
    check.start().await.unwrap();

    for path in &["/a", "/b", "/c"] {
        let resp = check.send(Headers::new_get(*path), None).await.unwrap();
        assert_eq!(200, resp.status());
    }
    assert_eq!(3, recorder.count());

    check.end().await.unwrap();
}

#[tokio::test]
async fn explicit_host_is_kept() {
    init_logger();

    let server = test_server(ServerKind::TlsHttp);
    let recorder = RecordingHandler::new();
    server.set_handler("/", recorder.clone());

    let mut check = HttpCheck::new_http1(server.clone());
    check.start().await.unwrap();

    let mut headers = Headers::new_get("/");
    headers.add("Host", "shop.example");
    check.send(headers, None).await.unwrap();
    assert_eq!(
        vec!["shop.example"],
        recorder
            .last_request()
            .headers
            .get_all("host")
            .collect::<Vec<_>>()
    );

    check.end().await.unwrap();
}

#[tokio::test]
async fn empty_body_and_no_body() {
    init_logger();

    let server = test_server(ServerKind::TlsHttp);
    let recorder = RecordingHandler::new();
    server.set_handler("/", recorder.clone());

    let mut check = HttpCheck::new_http1(server.clone());
    check.start().await.unwrap();

    check.send(Headers::new_post("/a"), None).await.unwrap();
    assert_eq!("", recorder.last_request().body_str());

    check.send(Headers::new_post("/b"), Some("")).await.unwrap();
    assert_eq!(Some(0), recorder.last_request().headers.content_length());
    assert_eq!("", recorder.last_request().body_str());

    check.end().await.unwrap();
}

#[tokio::test]
async fn plain_server_is_rejected() {
    init_logger();

    let server = test_server(ServerKind::PlainHttp);
    let mut check = HttpCheck::new_http1(server.clone());
    match check.start().await {
        Err(Error::UnsupportedTransport { client, server }) => {
            assert_eq!(ClientProtocol::Http1, client);
            assert_eq!(ServerKind::PlainHttp, server);
        }
        r => panic!("unexpected result: {:?}", r),
    }
    assert!(!server.is_listening());
    assert_eq!(HarnessState::Uninitialized, check.state());
}

async fn large_bodies(kind: ServerKind) {
    init_logger();

    let body = large_body(200 * 1024);
    let server = test_server(kind);
    let recorder = RecordingHandler::with_response(ServerResponse::ok_200().with_body(body.clone()));
    server.set_handler("/", recorder.clone());

    let mut check = HttpCheck::new_http1(server.clone());
    check.start().await.unwrap();

    let resp = check
        .send(Headers::new_post("/upload"), Some(&body))
        .await
        .unwrap();
    assert_eq!(200, resp.status());
    assert_eq!(body.len(), resp.data.len());
    assert!(body == resp.data);

    let req = recorder.last_request();
    assert_eq!(body.len(), req.body.len());
    assert!(body == req.body_str());

    check.end().await.unwrap();
}

#[tokio::test]
async fn large_bodies_tls() {
    large_bodies(ServerKind::TlsHttp).await;
}

#[tokio::test]
async fn large_bodies_http2_tls_fallback() {
    large_bodies(ServerKind::Http2Tls).await;
}
