//! HTTP/2 harness against plain and TLS HTTP/2 servers.

use httpcheck::*;
use httpcheck_test::*;

const FAVORITE: &str = r#"{"customerId":543,"key":1,"productId":2558}"#;

async fn request_is_observed(kind: ServerKind) {
    init_logger();

    let server = test_server(kind);
    let recorder = RecordingHandler::new();
    server.set_handler("/", recorder.clone());

    let mut check = HttpCheck::new(server.clone());
    check.start().await.unwrap();

    let mut headers = Headers::new_post("/customer/543/favorites");
    headers.add("content-type", "application/json");
    headers.add("x-request-id", "  Mixed Case;value ");
    let resp = check
        .send(headers, Some(r#"{"productId":2558}"#))
        .await
        .unwrap();
    assert_eq!(200, resp.status());

    let req = recorder.last_request();
    assert_eq!("POST", req.method());
    assert_eq!("/customer/543/favorites", req.path());
    assert_eq!(2, req.http_version_major());
    assert_eq!(Some("application/json"), req.headers.get_opt("content-type"));
    assert_eq!(Some("  Mixed Case;value "), req.headers.get_opt("x-request-id"));
    assert_eq!(r#"{"productId":2558}"#, req.body_str());

    check.end().await.unwrap();
}

#[tokio::test]
async fn request_is_observed_plain() {
    request_is_observed(ServerKind::Http2).await;
}

#[tokio::test]
async fn request_is_observed_tls() {
    request_is_observed(ServerKind::Http2Tls).await;
}

async fn status_and_data(kind: ServerKind) {
    init_logger();

    let server = test_server(kind);
    server.set_handler_fn("/customer", |req| {
        assert_eq!("POST", req.method());
        Ok(ServerResponse::new(201)
            .with_header("content-type", "application/json")
            .with_body(FAVORITE))
    });

    let mut check = HttpCheck::new(server.clone());
    check.start().await.unwrap();

    let resp = check
        .send(
            Headers::new_post("/customer/543/favorites"),
            Some(r#"{"productId":2558}"#),
        )
        .await
        .unwrap();
    assert_eq!(201, resp.status());
    assert_eq!("201", resp.headers.get(":status"));
    assert_eq!(Some("application/json"), resp.headers.get_opt("content-type"));
    assert_eq!(FAVORITE, resp.data);

    check.end().await.unwrap();
}

#[tokio::test]
async fn status_and_data_plain() {
    status_and_data(ServerKind::Http2).await;
}

#[tokio::test]
async fn status_and_data_tls() {
    status_and_data(ServerKind::Http2Tls).await;
}

#[tokio::test]
async fn empty_headers_are_get_root() {
    init_logger();

    let server = test_server(ServerKind::Http2Tls);
    let recorder = RecordingHandler::new();
    server.set_handler("/", recorder.clone());

    let mut check = HttpCheck::new(server.clone());
    check.start().await.unwrap();

    let resp = check.send(Headers::new(), None).await.unwrap();
    assert_eq!(200, resp.status());
    assert_eq!("", resp.data);

    let req = recorder.last_request();
    assert_eq!("GET", req.method());
    assert_eq!("/", req.path());

    check.end().await.unwrap();
}

#[tokio::test]
async fn requests_share_session() {
    init_logger();

    let server = test_server(ServerKind::Http2);
    let recorder = RecordingHandler::new();
    server.set_handler("/", recorder.clone());

    let mut check = HttpCheck::new(server.clone());
    check.start().await.unwrap();

    for i in 0..5 {
        let resp = check
            .send(Headers::new_get(format!("/items/{}", i)), None)
            .await
            .unwrap();
        assert_eq!(200, resp.status());
    }
    assert_eq!(5, recorder.count());
    assert_eq!("/items/4", recorder.last_request().path());

    check.end().await.unwrap();
}

#[tokio::test]
async fn empty_body_and_no_body() {
    init_logger();

    let server = test_server(ServerKind::Http2);
    let recorder = RecordingHandler::new();
    server.set_handler("/", recorder.clone());

    let mut check = HttpCheck::new(server.clone());
    check.start().await.unwrap();

    check.send(Headers::new_post("/a"), None).await.unwrap();
    assert_eq!("", recorder.last_request().body_str());

    check.send(Headers::new_post("/b"), Some("")).await.unwrap();
    assert_eq!("/b", recorder.last_request().path());
    assert_eq!("", recorder.last_request().body_str());

    check.end().await.unwrap();
}

#[tokio::test]
async fn encoded_path_and_query() {
    init_logger();

    let server = test_server(ServerKind::Http2Tls);
    let recorder = RecordingHandler::new();
    server.set_handler("/items", recorder.clone());

    let mut check = HttpCheck::new(server.clone());
    check.start().await.unwrap();

    let path = encode_uri("/items?q=dried fruit");
    let resp = check.send(Headers::new_get(path), None).await.unwrap();
    assert_eq!(200, resp.status());
    assert_eq!("/items?q=dried%20fruit", recorder.last_request().path());

    check.end().await.unwrap();
}

#[tokio::test]
async fn authority_override() {
    init_logger();

    let server = test_server(ServerKind::Http2);
    let recorder = RecordingHandler::new();
    server.set_handler("/", recorder.clone());

    let mut check = HttpCheck::new(server.clone());
    check.start().await.unwrap();

    let mut headers = Headers::new_get("/");
    headers.add(":authority", "shop.example:8443");
    check.send(headers, None).await.unwrap();
    assert_eq!(
        Some("shop.example:8443"),
        recorder.last_request().headers.get_opt(":authority")
    );

    check.end().await.unwrap();
}

#[tokio::test]
async fn unmatched_path_and_failing_handler() {
    init_logger();

    let server = test_server(ServerKind::Http2);
    server.set_handler_fn("/fail", |_req| {
        Err(Error::User("out of dried mango".to_owned()))
    });

    let mut check = HttpCheck::new(server.clone());
    check.start().await.unwrap();

    let resp = check.send(Headers::new_get("/missing"), None).await.unwrap();
    assert_eq!(404, resp.status());

    let resp = check.send(Headers::new_get("/fail"), None).await.unwrap();
    assert_eq!(500, resp.status());
    assert!(resp.data.contains("out of dried mango"), "{}", resp.data);

    check.end().await.unwrap();
}

async fn raw_path_is_sent_verbatim(kind: ServerKind) {
    init_logger();

    let server = test_server(kind);
    let recorder = RecordingHandler::new();
    server.set_handler("/items", recorder.clone());

    let mut check = HttpCheck::new(server.clone());
    check.start().await.unwrap();

    let resp = check
        .send(Headers::new_get("/items?q=dried fruit"), None)
        .await
        .unwrap();
    assert_eq!(200, resp.status());
    assert_eq!("/items?q=dried fruit", recorder.last_request().path());

    check.end().await.unwrap();
}

#[tokio::test]
async fn raw_path_is_sent_verbatim_plain() {
    raw_path_is_sent_verbatim(ServerKind::Http2).await;
}

#[tokio::test]
async fn raw_path_is_sent_verbatim_tls() {
    raw_path_is_sent_verbatim(ServerKind::Http2Tls).await;
}

async fn large_bodies(kind: ServerKind) {
    init_logger();

    // larger than the default 65535 octet flow control window
    let body = large_body(200 * 1024);
    let server = test_server(kind);
    let recorder = RecordingHandler::with_response(ServerResponse::ok_200().with_body(body.clone()));
    server.set_handler("/", recorder.clone());

    let mut check = HttpCheck::new(server.clone());
    check.start().await.unwrap();

    let resp = check
        .send(Headers::new_post("/upload"), Some(&body))
        .await
        .unwrap();
    assert_eq!(200, resp.status());
    assert_eq!(Some(body.len() as u64), resp.headers.content_length());
    assert_eq!(body.len(), resp.data.len());
    assert!(body == resp.data);

    let req = recorder.last_request();
    assert_eq!(body.len(), req.body.len());
    assert!(body == req.body_str());

    // the session is still usable after the windows were drained
    let resp = check.send(Headers::new_get("/"), None).await.unwrap();
    assert_eq!(200, resp.status());

    check.end().await.unwrap();
}

#[tokio::test]
async fn large_bodies_plain() {
    large_bodies(ServerKind::Http2).await;
}

#[tokio::test]
async fn large_bodies_tls() {
    large_bodies(ServerKind::Http2Tls).await;
}

#[tokio::test]
async fn http1_request_to_plain_http2_server() {
    use std::io::Read;
    use std::io::Write;

    init_logger();

    let server = test_server(ServerKind::Http2);
    let addr = server.listen().await.unwrap();

    let resp = tokio::task::spawn_blocking(move || {
        let mut socket = std::net::TcpStream::connect(addr).unwrap();
        socket
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .unwrap();
        let mut resp = String::new();
        socket.read_to_string(&mut resp).unwrap();
        resp
    })
    .await
    .unwrap();
    assert!(resp.starts_with("HTTP/1.1 500 "), "{}", resp);

    server.close().await.unwrap();
}
