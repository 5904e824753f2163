use std::convert::Infallible;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use bytes::Bytes;
use http_body::Body;
use http_body::Frame;
use http_body::SizeHint;

/// Request body which keeps "no body" and "empty body" apart.
///
/// `Empty` ends the stream together with the headers. `Data` leaves the
/// stream open after the headers and ends it with the data, even when the
/// data is zero-length.
#[derive(Debug)]
pub(crate) enum RequestBody {
    Empty,
    /// `None` once the data is taken.
    Data(Option<Bytes>),
}

impl RequestBody {
    pub fn new(body: Option<&str>) -> RequestBody {
        match body {
            None => RequestBody::Empty,
            Some(body) => RequestBody::Data(Some(Bytes::copy_from_slice(body.as_bytes()))),
        }
    }

    pub fn has_body(&self) -> bool {
        match self {
            RequestBody::Empty => false,
            RequestBody::Data(..) => true,
        }
    }

    /// Data to send after the headers; `None` ends the stream with them.
    pub fn into_data(self) -> Option<Bytes> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Data(data) => Some(data.unwrap_or_default()),
        }
    }
}

impl Body for RequestBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        match self.get_mut() {
            RequestBody::Empty => Poll::Ready(None),
            RequestBody::Data(data) => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            RequestBody::Empty => true,
            RequestBody::Data(data) => data.is_none(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            RequestBody::Data(Some(data)) => SizeHint::with_exact(data.len() as u64),
            RequestBody::Empty | RequestBody::Data(None) => SizeHint::with_exact(0),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use http_body_util::BodyExt;

    #[test]
    fn no_body_ends_with_headers() {
        let body = RequestBody::new(None);
        assert!(!body.has_body());
        assert!(body.is_end_stream());
    }

    #[test]
    fn into_data_keeps_empty_body() {
        assert_eq!(None, RequestBody::new(None).into_data());
        assert_eq!(Some(Bytes::new()), RequestBody::new(Some("")).into_data());
        assert_eq!(
            Some(Bytes::from_static(b"[2558]")),
            RequestBody::new(Some("[2558]")).into_data()
        );
    }

    #[test]
    fn empty_string_is_a_body() {
        let body = RequestBody::new(Some(""));
        assert!(body.has_body());
        assert!(!body.is_end_stream());
        assert_eq!(Some(0), body.size_hint().exact());
    }

    #[tokio::test]
    async fn data_is_sent_once() {
        let mut body = RequestBody::new(Some("{\"productId\":2558}"));
        assert_eq!(Some(18), body.size_hint().exact());

        let frame = body.frame().await.unwrap().unwrap();
        assert_eq!(&b"{\"productId\":2558}"[..], &frame.into_data().unwrap()[..]);
        assert!(body.is_end_stream());
        assert!(body.frame().await.is_none());
    }
}
