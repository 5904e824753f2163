use std::net::SocketAddr;

use bytes::Bytes;
use bytes::BytesMut;

use crate::check::HttpCheckResponse;
use crate::client::body::RequestBody;
use crate::client::conf::ClientConf;
use crate::client::req::RequestParts;
use crate::client::tls::insecure_connector;
use crate::error::Error;
use crate::net::connect::connect;
use crate::net::socket::SocketStreamBox;
use crate::server::kind::ServerKind;
use crate::solicit::conn::ConnEvent;
use crate::solicit::conn::Http2Conn;
use crate::solicit::error_code::ErrorCode;
use crate::Headers;

/// HTTP/2 client session, every request is a new stream on it.
///
/// Requests are sent one at a time: `send` returns once the response
/// stream is complete.
pub(crate) struct Http2Session {
    conn: Http2Conn<SocketStreamBox>,
    next_stream_id: u32,
    scheme: &'static str,
    authority: String,
}

fn to_headers(block: Vec<(Bytes, Bytes)>) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in block {
        headers.add(
            String::from_utf8_lossy(&name).into_owned(),
            String::from_utf8_lossy(&value).into_owned(),
        );
    }
    headers
}

impl Http2Session {
    /// Connect and complete the HTTP/2 handshake.
    ///
    /// Over TLS only `h2` is offered in ALPN.
    pub async fn connect(
        addr: SocketAddr,
        kind: ServerKind,
        conf: &ClientConf,
    ) -> crate::Result<Http2Session> {
        let tls = if kind.is_tls_backed() {
            Some(insecure_connector(&[b"h2"])?)
        } else {
            None
        };
        let socket = connect(addr, tls.as_ref(), conf).await?;
        let conn = Http2Conn::client_handshake(socket).await?;

        info!("HTTP/2 session with {} established", addr);

        Ok(Http2Session {
            conn,
            next_stream_id: 1,
            scheme: kind.scheme(),
            authority: format!("{}:{}", conf.host, addr.port()),
        })
    }

    /// Send a request on a new stream and read the whole response.
    ///
    /// `:path` goes on the wire as given, no URI parsing or escaping.
    pub async fn send(
        &mut self,
        parts: RequestParts,
        body: RequestBody,
    ) -> crate::Result<HttpCheckResponse> {
        let stream_id = self.next_stream_id;
        self.next_stream_id += 2;

        let authority = parts.authority.as_deref().unwrap_or(&self.authority);
        let names: Vec<String> = parts
            .headers
            .regular_headers()
            .iter()
            .map(|h| h.name().to_ascii_lowercase())
            .collect();

        let mut headers: Vec<(&[u8], &[u8])> = vec![
            (&b":method"[..], parts.method.as_bytes()),
            (&b":scheme"[..], self.scheme.as_bytes()),
            (&b":authority"[..], authority.as_bytes()),
            (&b":path"[..], parts.path.as_bytes()),
        ];
        for (name, header) in names.iter().zip(parts.headers.regular_headers()) {
            headers.push((name.as_bytes(), header.value().as_bytes()));
        }

        debug!(
            "{} {} over HTTP/2, stream {}",
            parts.method, parts.path, stream_id
        );

        match body.into_data() {
            None => self.conn.send_headers(stream_id, &headers, true).await?,
            Some(data) => {
                self.conn.send_headers(stream_id, &headers, false).await?;
                self.conn.send_data(stream_id, data, true).await?;
            }
        }

        self.read_response(stream_id).await
    }

    async fn read_response(&mut self, stream_id: u32) -> crate::Result<HttpCheckResponse> {
        let mut headers: Option<Headers> = None;
        let mut body = BytesMut::new();

        loop {
            let frame = self
                .conn
                .read_frame()
                .await?
                .ok_or(Error::EofFromStream)?;

            let end_stream = match self.conn.process_frame(frame).await? {
                None => continue,
                Some(ConnEvent::Headers {
                    stream_id: id,
                    headers: block,
                    end_stream,
                }) if id == stream_id => {
                    match &mut headers {
                        // trailers
                        Some(headers) => headers.extend(to_headers(block)),
                        None => {
                            let block = to_headers(block);
                            let status: u16 = block.get_opt_parse(":status").ok_or_else(|| {
                                Error::MalformedResponse("no valid :status".to_owned())
                            })?;
                            if (100..200).contains(&status) {
                                debug!("skipping informational response {}", status);
                                continue;
                            }
                            headers = Some(block);
                        }
                    }
                    end_stream
                }
                Some(ConnEvent::Data {
                    stream_id: id,
                    data,
                    end_stream,
                }) if id == stream_id => {
                    if headers.is_none() {
                        return Err(Error::MalformedResponse(
                            "DATA before HEADERS".to_owned(),
                        ));
                    }
                    body.extend_from_slice(&data);
                    end_stream
                }
                Some(ConnEvent::RstStream {
                    stream_id: id,
                    error_code,
                }) if id == stream_id => return Err(Error::RstStreamReceived(error_code)),
                Some(ConnEvent::Goaway {
                    last_stream_id,
                    error_code,
                }) if last_stream_id < stream_id => return Err(Error::GoawayReceived(error_code)),
                Some(event) => {
                    debug!("ignoring {:?}", event);
                    continue;
                }
            };

            if end_stream {
                break;
            }
        }

        let headers = headers
            .ok_or_else(|| Error::MalformedResponse("stream ended without HEADERS".to_owned()))?;
        debug!("response {}, {} bytes", headers.status(), body.len());

        Ok(HttpCheckResponse {
            data: String::from_utf8_lossy(&body).into_owned(),
            headers,
        })
    }

    /// Send `GOAWAY` and close the connection.
    pub async fn close(mut self) -> crate::Result<()> {
        if self.conn.has_pending_data() {
            debug!("closing HTTP/2 session with unsent request data");
        }
        self.conn.close(ErrorCode::NoError).await?;
        debug!("HTTP/2 session closed");
        Ok(())
    }
}
