use std::fmt;
use std::iter::FromIterator;
use std::str::FromStr;

use crate::assert_types::*;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum PseudoHeaderName {
    // Request pseudo-headers
    Method,
    Scheme,
    Authority,
    Path,

    // Response pseudo-header
    Status,
}

impl PseudoHeaderName {
    pub fn name(&self) -> &'static str {
        match *self {
            PseudoHeaderName::Method => ":method",
            PseudoHeaderName::Scheme => ":scheme",
            PseudoHeaderName::Authority => ":authority",
            PseudoHeaderName::Path => ":path",
            PseudoHeaderName::Status => ":status",
        }
    }

    pub fn parse(value: &str) -> Option<PseudoHeaderName> {
        match value {
            ":method" => Some(PseudoHeaderName::Method),
            ":scheme" => Some(PseudoHeaderName::Scheme),
            ":authority" => Some(PseudoHeaderName::Authority),
            ":path" => Some(PseudoHeaderName::Path),
            ":status" => Some(PseudoHeaderName::Status),
            _ => None,
        }
    }
}

impl fmt::Display for PseudoHeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.name(), f)
    }
}

/// Header name, lower case.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct HeaderName(String);

impl HeaderName {
    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_pseudo(&self) -> bool {
        self.0.starts_with(':')
    }

    pub fn pseudo_header_name(&self) -> Option<PseudoHeaderName> {
        PseudoHeaderName::parse(&self.0)
    }
}

impl From<PseudoHeaderName> for HeaderName {
    fn from(p: PseudoHeaderName) -> HeaderName {
        HeaderName(p.name().to_owned())
    }
}

impl<'a> From<&'a str> for HeaderName {
    fn from(s: &'a str) -> HeaderName {
        HeaderName(s.to_ascii_lowercase())
    }
}

impl From<String> for HeaderName {
    fn from(mut s: String) -> HeaderName {
        s.make_ascii_lowercase();
        HeaderName(s)
    }
}

/// Request or response header, regular or pseudo-header.
#[derive(PartialEq, Eq, Hash, Clone)]
pub struct Header {
    name: HeaderName,
    pub value: String,
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("name", &self.name.name())
            .field("value", &self.value)
            .finish()
    }
}

fn _assert_header_sync_send() {
    assert_sync::<Header>();
    assert_send::<Header>();
}

impl Header {
    /// Creates a new `Header` with the given name and value.
    ///
    /// Header name is converted to lower case, value is kept as is.
    pub fn new<N: Into<HeaderName>, V: Into<String>>(name: N, value: V) -> Header {
        Header {
            name: name.into(),
            value: value.into(),
        }
    }

    fn method(value: impl Into<String>) -> Header {
        Header::new(PseudoHeaderName::Method, value)
    }

    fn path(value: impl Into<String>) -> Header {
        Header::new(PseudoHeaderName::Path, value)
    }

    fn status(code: u16) -> Header {
        Header::new(PseudoHeaderName::Status, code.to_string())
    }

    pub fn name(&self) -> &str {
        self.name.name()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// name: value
    pub fn format(&self) -> String {
        format!("{}: {}", self.name(), self.value)
    }

    pub fn is_pseudo_header(&self) -> bool {
        self.name.is_pseudo()
    }

    pub fn pseudo_header_name(&self) -> Option<PseudoHeaderName> {
        self.name.pseudo_header_name()
    }
}

impl<N: Into<HeaderName>, V: Into<String>> From<(N, V)> for Header {
    fn from(p: (N, V)) -> Header {
        Header::new(p.0, p.1)
    }
}

/// Request or response headers.
///
/// Pseudo-headers (`:method`, `:path`, `:status`...) are kept before
/// regular headers, otherwise insertion order is preserved.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct Headers {
    headers: Vec<Header>,
    pseudo_count: usize,
}

impl Headers {
    pub fn new() -> Headers {
        Default::default()
    }

    pub fn from_vec(mut headers: Vec<Header>) -> Headers {
        headers.sort_by_key(|h| !h.is_pseudo_header());
        let pseudo_count = headers.iter().take_while(|h| h.is_pseudo_header()).count();
        Headers {
            headers,
            pseudo_count,
        }
    }

    /// Pseudo headers returned first.
    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.headers.iter()
    }

    pub fn pseudo_headers(&self) -> &[Header] {
        &self.headers[..self.pseudo_count]
    }

    pub fn regular_headers(&self) -> &[Header] {
        &self.headers[self.pseudo_count..]
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Dump all headers as multiline string.
    pub fn dump(&self) -> String {
        let mut r = String::new();
        for h in &self.headers {
            r.push_str(&h.format());
            r.push('\n');
        }
        r
    }

    /// `:method GET` and `:path` headers.
    pub fn new_get(path: impl Into<String>) -> Headers {
        Headers::from_vec(vec![Header::method("GET"), Header::path(path)])
    }

    /// `:method POST` and `:path` headers.
    pub fn new_post(path: impl Into<String>) -> Headers {
        Headers::from_vec(vec![Header::method("POST"), Header::path(path)])
    }

    pub fn new_status(code: u16) -> Headers {
        Headers::from_vec(vec![Header::status(code)])
    }

    pub fn ok_200() -> Headers {
        Headers::new_status(200)
    }

    pub fn not_found_404() -> Headers {
        Headers::new_status(404)
    }

    pub fn internal_error_500() -> Headers {
        Headers::new_status(500)
    }

    fn section(&self, name: &str) -> &[Header] {
        if name.starts_with(':') {
            self.pseudo_headers()
        } else {
            self.regular_headers()
        }
    }

    /// First value of a header. Lookup is case-insensitive.
    pub fn get_opt<'a>(&'a self, name: &str) -> Option<&'a str> {
        self.section(name)
            .iter()
            .find(|h| h.name().eq_ignore_ascii_case(name))
            .map(|h| h.value())
    }

    /// All values of a header, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.section(name)
            .iter()
            .filter(move |h| h.name().eq_ignore_ascii_case(name))
            .map(|h| h.value())
    }

    pub fn get<'a>(&'a self, name: &str) -> &'a str {
        self.get_opt(name)
            .unwrap_or_else(|| panic!("header {} not found", name))
    }

    pub fn get_opt_parse<I: FromStr>(&self, name: &str) -> Option<I> {
        self.get_opt(name).and_then(|h| h.parse().ok())
    }

    /// Parsed `:status`, panics if absent.
    pub fn status(&self) -> u16 {
        self.get_opt_parse(":status").expect(":status")
    }

    pub fn path(&self) -> &str {
        self.get(":path")
    }

    pub fn method(&self) -> &str {
        self.get(":method")
    }

    pub fn content_length(&self) -> Option<u64> {
        self.get_opt_parse("content-length")
    }

    pub fn add(&mut self, name: impl Into<HeaderName>, value: impl Into<String>) {
        self.add_header(Header::new(name, value));
    }

    pub fn add_header(&mut self, header: Header) {
        if header.is_pseudo_header() {
            self.headers.insert(self.pseudo_count, header);
            self.pseudo_count += 1;
        } else {
            self.headers.push(header);
        }
    }

    /// Remove every header with the given name, return the first value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let mut first = None;
        let mut kept = Vec::with_capacity(self.headers.len());
        for h in self.headers.drain(..) {
            if h.name().eq_ignore_ascii_case(name) {
                if first.is_none() {
                    first = Some(h.value);
                }
            } else {
                kept.push(h);
            }
        }
        *self = Headers::from_vec(kept);
        first
    }

    pub fn extend(&mut self, headers: Headers) {
        self.headers.reserve(headers.headers.len());
        for h in headers.headers {
            self.add_header(h);
        }
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<T: IntoIterator<Item = Header>>(iter: T) -> Headers {
        Headers::from_vec(iter.into_iter().collect())
    }
}

impl<N: Into<HeaderName>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Headers {
        iter.into_iter().map(Header::from).collect()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pseudo_headers_first() {
        let mut headers = Headers::new();
        headers.add("accept", "application/json");
        headers.add(":path", "/items");
        headers.add("Accept-Encoding", "gzip deflate");
        headers.add(":method", "GET");

        let names: Vec<_> = headers.iter().map(|h| h.name()).collect();
        assert_eq!(vec![":path", ":method", "accept", "accept-encoding"], names);
        assert_eq!(2, headers.pseudo_headers().len());
        assert_eq!("GET", headers.method());
        assert_eq!("/items", headers.path());
    }

    #[test]
    fn values_are_not_modified() {
        let headers: Headers = vec![("X-Custom", "  Mixed Case;value  ")].into_iter().collect();
        assert_eq!(Some("  Mixed Case;value  "), headers.get_opt("x-custom"));
        assert_eq!(Some("  Mixed Case;value  "), headers.get_opt("X-CUSTOM"));
    }

    #[test]
    fn remove_takes_all_values() {
        let mut headers = Headers::new_get("/a");
        headers.add("cookie", "a=1");
        headers.add("cookie", "b=2");
        assert_eq!(vec!["a=1", "b=2"], headers.get_all("cookie").collect::<Vec<_>>());

        assert_eq!(Some("a=1".to_owned()), headers.remove("cookie"));
        assert_eq!(None, headers.get_opt("cookie"));

        assert_eq!(Some("/a".to_owned()), headers.remove(":path"));
        assert_eq!(1, headers.pseudo_headers().len());
        assert_eq!(None, headers.remove(":path"));
    }

    #[test]
    fn status() {
        let headers = Headers::ok_200();
        assert_eq!(200, headers.status());
        assert_eq!(None, Headers::new().get_opt_parse::<u16>(":status"));
    }

    #[test]
    fn debug() {
        assert_eq!(
            "Header { name: \":method\", value: \"GET\" }",
            format!("{:?}", Header::new(":method", "GET"))
        );
    }
}
