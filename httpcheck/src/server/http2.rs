use std::cmp;
use std::collections::HashMap;

use bytes::Bytes;
use bytes::BytesMut;
use http::Version;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::sync::watch;

use crate::error::Error;
use crate::server::conn::dispatch;
use crate::server::conn::shutdown_requested;
use crate::server::conn::Handlers;
use crate::server::req::ServerRequest;
use crate::server::resp::ServerResponse;
use crate::solicit::conn::ConnEvent;
use crate::solicit::conn::Http2Conn;
use crate::solicit::conn::PREFACE;
use crate::solicit::error_code::ErrorCode;
use crate::Headers;

/// First bytes of a connection.
pub(crate) enum Preface {
    /// HTTP/2 preface, with the bytes read past it.
    Http2(BytesMut),
    /// Something else, all bytes read so far.
    Other(BytesMut),
}

/// Read until the client preface is either complete or ruled out.
pub(crate) async fn read_preface<I: AsyncRead + Unpin>(io: &mut I) -> crate::Result<Preface> {
    let mut buf = BytesMut::with_capacity(1024);
    loop {
        let len = cmp::min(buf.len(), PREFACE.len());
        if buf[..len] != PREFACE[..len] {
            return Ok(Preface::Other(buf));
        }
        if len == PREFACE.len() {
            let rest = buf.split_off(PREFACE.len());
            return Ok(Preface::Http2(rest));
        }
        if io.read_buf(&mut buf).await? == 0 {
            return Err(Error::EofFromStream);
        }
    }
}

/// Buf content looks like a start of HTTP/1 request.
pub(crate) fn looks_like_http_1(buf: &[u8]) -> bool {
    buf.starts_with(b"GET ") || buf.starts_with(b"POST ") || buf.starts_with(b"HEAD ")
}

pub(crate) const HTTP_1_500_RESPONSE: &[u8] = b"\
HTTP/1.1 500 Internal Server Error\r\n\
Server: httpcheck\r\n\
\r\n\
Request is made using HTTP/1, server only supports HTTP/2\r\n\
";

/// Request being received.
#[derive(Default)]
struct InStream {
    headers: Headers,
    body: BytesMut,
}

impl InStream {
    fn into_request(self) -> Option<ServerRequest> {
        if self.headers.get_opt(":method").is_none() || self.headers.get_opt(":path").is_none() {
            return None;
        }
        Some(ServerRequest {
            headers: self.headers,
            version: Version::HTTP_2,
            body: self.body.freeze(),
        })
    }
}

/// Serve HTTP/2 after the preface, until the client goes away or
/// shutdown is requested.
pub(crate) async fn serve_http2<I>(
    handlers: &Handlers,
    io: I,
    read_buf: BytesMut,
    mut shutdown: watch::Receiver<bool>,
) -> crate::Result<()>
where
    I: AsyncRead + AsyncWrite + Unpin,
{
    let mut conn = Http2Conn::server_handshake(io, read_buf).await?;
    debug!("HTTP/2 handshake done");

    match serve_streams(handlers, &mut conn, &mut shutdown).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_code = match &e {
                Error::CodeError(code) => Some(*code),
                Error::ParseFrameError(e) => Some(e.error_code()),
                Error::CompressionError(..) => Some(ErrorCode::CompressionError),
                Error::InvalidFrame(..) | Error::UnexpectedPushPromise => {
                    Some(ErrorCode::ProtocolError)
                }
                _ => None,
            };
            if let Some(error_code) = error_code {
                debug!("sending GOAWAY {}", error_code);
                if let Err(close_err) = conn.close(error_code).await {
                    debug!("failed to send GOAWAY: {}", close_err);
                }
            }
            Err(e)
        }
    }
}

async fn serve_streams<I>(
    handlers: &Handlers,
    conn: &mut Http2Conn<I>,
    shutdown: &mut watch::Receiver<bool>,
) -> crate::Result<()>
where
    I: AsyncRead + AsyncWrite + Unpin,
{
    let mut streams: HashMap<u32, InStream> = HashMap::new();

    loop {
        let frame = tokio::select! {
            frame = conn.read_frame() => frame?,
            _ = shutdown_requested(shutdown) => {
                debug!(
                    "server shutdown, closing HTTP/2 connection, last stream {}",
                    conn.last_peer_stream_id()
                );
                return conn.close(ErrorCode::NoError).await;
            }
        };
        let frame = match frame {
            Some(frame) => frame,
            None => return Ok(()),
        };

        let (stream_id, end_stream) = match conn.process_frame(frame).await? {
            None => continue,
            Some(ConnEvent::Headers {
                stream_id,
                headers,
                end_stream,
            }) => {
                // request headers, then trailers if any
                let stream = streams.entry(stream_id).or_insert_with(InStream::default);
                for (name, value) in headers {
                    stream.headers.add(
                        String::from_utf8_lossy(&name).into_owned(),
                        String::from_utf8_lossy(&value).into_owned(),
                    );
                }
                (stream_id, end_stream)
            }
            Some(ConnEvent::Data {
                stream_id,
                data,
                end_stream,
            }) => {
                match streams.get_mut(&stream_id) {
                    Some(stream) => stream.body.extend_from_slice(&data),
                    None => {
                        debug!("DATA for unknown stream {}", stream_id);
                        conn.send_rst_stream(stream_id, ErrorCode::StreamClosed)
                            .await?;
                        continue;
                    }
                }
                (stream_id, end_stream)
            }
            Some(ConnEvent::RstStream {
                stream_id,
                error_code,
            }) => {
                debug!("stream {} reset by client: {}", stream_id, error_code);
                streams.remove(&stream_id);
                continue;
            }
            Some(ConnEvent::Goaway { .. }) => continue,
        };

        if !end_stream {
            continue;
        }

        let req = match streams.remove(&stream_id).and_then(InStream::into_request) {
            Some(req) => req,
            None => {
                warn!("stream {} has no :method or :path", stream_id);
                conn.send_rst_stream(stream_id, ErrorCode::ProtocolError)
                    .await?;
                continue;
            }
        };

        let resp = dispatch(handlers, req);
        send_response(conn, stream_id, resp).await?;
    }
}

async fn send_response<I>(
    conn: &mut Http2Conn<I>,
    stream_id: u32,
    resp: ServerResponse,
) -> crate::Result<()>
where
    I: AsyncRead + AsyncWrite + Unpin,
{
    let resp = match http::StatusCode::from_u16(resp.status) {
        Ok(..) => resp,
        Err(e) => {
            warn!("handler returned malformed response: {}", e);
            ServerResponse::internal_error_500(&format!("{}", e))
        }
    };

    let status = resp.status.to_string();
    let content_length = resp.body.len().to_string();

    let mut names = vec![":status".to_owned()];
    let mut values = vec![status.as_str()];
    for header in resp.headers.regular_headers() {
        names.push(header.name().to_ascii_lowercase());
        values.push(header.value());
    }
    if resp.headers.get_opt("content-length").is_none() {
        names.push("content-length".to_owned());
        values.push(content_length.as_str());
    }
    let headers: Vec<(&[u8], &[u8])> = names
        .iter()
        .zip(&values)
        .map(|(n, v)| (n.as_bytes(), v.as_bytes()))
        .collect();

    if resp.body.is_empty() {
        conn.send_headers(stream_id, &headers, true).await
    } else {
        conn.send_headers(stream_id, &headers, false).await?;
        conn.send_data(stream_id, Bytes::clone(&resp.body), true)
            .await
    }
}
