use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::Response;

use crate::check::HttpCheckResponse;
use crate::Headers;

/// Buffer the whole response; status goes under `:status`.
pub(crate) async fn read_response(resp: Response<Incoming>) -> crate::Result<HttpCheckResponse> {
    let (parts, body) = resp.into_parts();

    let mut headers = Headers::new_status(parts.status.as_u16());
    for (name, value) in &parts.headers {
        headers.add(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }

    let body = body.collect().await?.to_bytes();
    debug!("response {}, {} bytes", parts.status, body.len());

    Ok(HttpCheckResponse {
        data: String::from_utf8_lossy(&body).into_owned(),
        headers,
    })
}
