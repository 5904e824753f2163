use http::header::HeaderName;
use http::header::HeaderValue;
use http::Method;
use http::Request;
use http::Uri;
use http::Version;

use crate::client::body::RequestBody;
use crate::Headers;

/// Request headers split into the request line and regular headers.
#[derive(Debug, Clone)]
pub(crate) struct RequestParts {
    pub method: String,
    /// Path and query, passed through as given.
    pub path: String,
    pub authority: Option<String>,
    /// Regular headers only.
    pub headers: Headers,
}

impl RequestParts {
    /// Take `:method`, `:path` and `:authority` out of the headers.
    ///
    /// Missing method and path default to `GET /`.
    pub fn from_headers(mut headers: Headers) -> RequestParts {
        let method = headers.remove(":method").unwrap_or_else(|| "GET".to_owned());
        let path = headers.remove(":path").unwrap_or_else(|| "/".to_owned());
        let authority = headers.remove(":authority");

        for header in headers.pseudo_headers() {
            debug!("pseudo-header {} is not sent", header.name());
        }

        RequestParts {
            method,
            path,
            authority,
            headers: headers.regular_headers().iter().cloned().collect(),
        }
    }

    pub fn to_request(
        &self,
        uri: Uri,
        version: Version,
        body: RequestBody,
    ) -> crate::Result<Request<RequestBody>> {
        let mut builder = Request::builder()
            .method(Method::from_bytes(self.method.as_bytes())?)
            .uri(uri)
            .version(version);
        for header in self.headers.regular_headers() {
            builder = builder.header(
                HeaderName::from_bytes(header.name().as_bytes())?,
                HeaderValue::from_str(header.value())?,
            );
        }
        Ok(builder.body(body)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pseudo_headers_are_taken_out() {
        let mut headers = Headers::new_post("/customer/543/favorites");
        headers.add(":scheme", "https");
        headers.add("accept", "application/json");

        let parts = RequestParts::from_headers(headers);
        assert_eq!("POST", parts.method);
        assert_eq!("/customer/543/favorites", parts.path);
        assert_eq!(None, parts.authority);
        assert_eq!(1, parts.headers.len());
        assert_eq!(Some("application/json"), parts.headers.get_opt("accept"));
    }

    #[test]
    fn defaults_to_get_root() {
        let parts = RequestParts::from_headers(Headers::new());
        assert_eq!("GET", parts.method);
        assert_eq!("/", parts.path);
    }

    #[test]
    fn header_values_pass_through() {
        let mut headers = Headers::new_get("/");
        headers.add("accept-encoding", "gzip deflate");
        let parts = RequestParts::from_headers(headers);
        let req = parts
            .to_request(Uri::from_static("/"), Version::HTTP_11, RequestBody::Empty)
            .unwrap();
        assert_eq!("gzip deflate", req.headers()["accept-encoding"]);
    }

    #[test]
    fn unencoded_path_is_rejected() {
        assert!("/items?q=dried fruit".parse::<Uri>().is_err());
        assert!("/items?q=dried%20fruit".parse::<Uri>().is_ok());
    }
}
