use std::cmp;
use std::collections::BTreeMap;
use std::collections::VecDeque;

use bytes::Bytes;
use bytes::BytesMut;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

use crate::error::Error;
use crate::hpack;
use crate::solicit::error_code::ErrorCode;
use crate::solicit::frame::unpack_header;
use crate::solicit::frame::FrameBuilder;
use crate::solicit::frame::HttpFrame;
use crate::solicit::frame::HttpSetting;
use crate::solicit::frame::RawFrame;
use crate::solicit::frame::DEFAULT_MAX_FRAME_SIZE;
use crate::solicit::frame::DEFAULT_WINDOW_SIZE;
use crate::solicit::frame::FRAME_HEADER_LEN;
use crate::solicit::frame::MAX_WINDOW_SIZE;

/// Client connection preface.
pub const PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Stream level outcome of a processed frame.
#[derive(Debug)]
pub(crate) enum ConnEvent {
    /// Complete, decoded header block.
    Headers {
        stream_id: u32,
        headers: Vec<(Bytes, Bytes)>,
        end_stream: bool,
    },
    Data {
        stream_id: u32,
        data: Bytes,
        end_stream: bool,
    },
    RstStream {
        stream_id: u32,
        error_code: ErrorCode,
    },
    Goaway {
        last_stream_id: u32,
        error_code: ErrorCode,
    },
}

/// Send side of a stream.
struct OutStream {
    window: i64,
    pending: VecDeque<Bytes>,
    /// End the stream once `pending` is sent.
    end_stream: bool,
}

impl OutStream {
    fn new(window: u32) -> OutStream {
        OutStream {
            window: window as i64,
            pending: VecDeque::new(),
            end_stream: false,
        }
    }
}

/// Header block waiting for `CONTINUATION` frames.
struct Continuation {
    stream_id: u32,
    end_stream: bool,
    block: BytesMut,
}

/// One HTTP/2 connection, either side.
///
/// Connection level frames (`SETTINGS`, `PING`, `WINDOW_UPDATE`) are
/// answered internally; stream level frames come out as [`ConnEvent`]s.
/// Received data is acknowledged with `WINDOW_UPDATE` right away, sent
/// data is queued until the peer's windows allow it.
pub(crate) struct Http2Conn<I> {
    io: I,
    is_server: bool,
    read_buf: BytesMut,
    write_buf: Vec<u8>,
    continuation: Option<Continuation>,
    encoder: hpack::Encoder,
    decoder: hpack::Decoder,
    peer_initial_window_size: u32,
    peer_max_frame_size: u32,
    /// Highest stream id opened by the peer.
    last_peer_stream_id: u32,
    out_window: i64,
    out_streams: BTreeMap<u32, OutStream>,
}

impl<I: AsyncRead + AsyncWrite + Unpin> Http2Conn<I> {
    /// `read_buf` holds bytes already read from `io`.
    fn new(io: I, read_buf: BytesMut, is_server: bool) -> Http2Conn<I> {
        Http2Conn {
            io,
            is_server,
            read_buf,
            write_buf: Vec::new(),
            continuation: None,
            encoder: hpack::Encoder::new(),
            decoder: hpack::Decoder::new(),
            peer_initial_window_size: DEFAULT_WINDOW_SIZE,
            peer_max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            last_peer_stream_id: 0,
            out_window: DEFAULT_WINDOW_SIZE as i64,
            out_streams: BTreeMap::new(),
        }
    }

    /// Send the preface and our settings, wait for the server's settings.
    pub async fn client_handshake(io: I) -> crate::Result<Http2Conn<I>> {
        let mut conn = Http2Conn::new(io, BytesMut::new(), false);
        conn.write_buf.extend_from_slice(PREFACE);
        conn.write_buf
            .write_settings(&[HttpSetting::EnablePush(false)]);
        conn.flush().await?;
        conn.recv_settings().await?;
        Ok(conn)
    }

    /// Send our settings, wait for the client's settings.
    ///
    /// The preface must be consumed already, bytes read past it are passed
    /// in `read_buf`.
    pub async fn server_handshake(io: I, read_buf: BytesMut) -> crate::Result<Http2Conn<I>> {
        let mut conn = Http2Conn::new(io, read_buf, true);
        conn.write_buf.write_settings(&[]);
        conn.flush().await?;
        conn.recv_settings().await?;
        Ok(conn)
    }

    /// The first frame from either peer must be `SETTINGS`.
    async fn recv_settings(&mut self) -> crate::Result<()> {
        let frame = self.read_frame().await?.ok_or(Error::EofFromStream)?;
        match HttpFrame::from_raw(frame)? {
            HttpFrame::Settings {
                ack: false,
                settings,
            } => {
                self.apply_settings(&settings)?;
                self.write_buf.write_settings_ack();
                self.flush().await
            }
            frame => Err(Error::InvalidFrame(format!(
                "expecting SETTINGS, got {:?}",
                frame
            ))),
        }
    }

    /// Highest stream id opened by the peer, for `GOAWAY`.
    pub fn last_peer_stream_id(&self) -> u32 {
        self.last_peer_stream_id
    }

    /// Read one frame. `None` on EOF between frames.
    ///
    /// Only reads, so it can be raced against other futures and dropped
    /// without losing data.
    pub async fn read_frame(&mut self) -> crate::Result<Option<RawFrame>> {
        loop {
            if self.read_buf.len() >= FRAME_HEADER_LEN {
                let mut header = [0; FRAME_HEADER_LEN];
                header.copy_from_slice(&self.read_buf[..FRAME_HEADER_LEN]);
                let header = unpack_header(&header);

                // we never announce a larger SETTINGS_MAX_FRAME_SIZE
                if header.payload_len > DEFAULT_MAX_FRAME_SIZE {
                    warn!(
                        "peer sent frame of size {}, max is {}",
                        header.payload_len, DEFAULT_MAX_FRAME_SIZE
                    );
                    return Err(Error::CodeError(ErrorCode::FrameSizeError));
                }

                let total_len = FRAME_HEADER_LEN + header.payload_len as usize;
                if self.read_buf.len() >= total_len {
                    let mut frame = self.read_buf.split_to(total_len);
                    let payload = frame.split_off(FRAME_HEADER_LEN).freeze();
                    return Ok(Some(RawFrame { header, payload }));
                }
            }

            self.read_buf.reserve(8192);
            if self.io.read_buf(&mut self.read_buf).await? == 0 {
                return if self.read_buf.is_empty() {
                    Ok(None)
                } else {
                    Err(Error::EofFromStream)
                };
            }
        }
    }

    /// Handle a frame, answering connection level frames.
    pub async fn process_frame(&mut self, raw: RawFrame) -> crate::Result<Option<ConnEvent>> {
        let frame = HttpFrame::from_raw(raw)?;
        trace!("received {:?}", frame);

        if let Some(continuation) = &self.continuation {
            let continues = matches!(
                frame,
                HttpFrame::Continuation { stream_id, .. } if stream_id == continuation.stream_id
            );
            if !continues {
                return Err(Error::InvalidFrame(format!(
                    "expecting CONTINUATION for stream {}, got {:?}",
                    continuation.stream_id, frame
                )));
            }
        }

        let event = match frame {
            HttpFrame::Data {
                stream_id,
                data,
                end_stream,
                flow_controlled_len,
            } => {
                if flow_controlled_len > 0 {
                    self.write_buf.write_window_update(0, flow_controlled_len);
                    if !end_stream {
                        self.write_buf
                            .write_window_update(stream_id, flow_controlled_len);
                    }
                    self.flush().await?;
                }
                Some(ConnEvent::Data {
                    stream_id,
                    data,
                    end_stream,
                })
            }
            HttpFrame::Headers {
                stream_id,
                fragment,
                end_stream,
                end_headers,
            } => {
                self.open_peer_stream(stream_id)?;
                if end_headers {
                    Some(self.decode_headers(stream_id, &fragment, end_stream)?)
                } else {
                    self.continuation = Some(Continuation {
                        stream_id,
                        end_stream,
                        block: BytesMut::from(&fragment[..]),
                    });
                    None
                }
            }
            HttpFrame::Continuation {
                fragment,
                end_headers,
                ..
            } => {
                let mut continuation = self.continuation.take().ok_or_else(|| {
                    Error::InvalidFrame("CONTINUATION without HEADERS".to_owned())
                })?;
                continuation.block.extend_from_slice(&fragment);
                if end_headers {
                    Some(self.decode_headers(
                        continuation.stream_id,
                        &continuation.block,
                        continuation.end_stream,
                    )?)
                } else {
                    self.continuation = Some(continuation);
                    None
                }
            }
            HttpFrame::RstStream {
                stream_id,
                error_code,
            } => {
                self.out_streams.remove(&stream_id);
                Some(ConnEvent::RstStream {
                    stream_id,
                    error_code,
                })
            }
            HttpFrame::Settings { ack: true, .. } => None,
            HttpFrame::Settings {
                ack: false,
                settings,
            } => {
                self.apply_settings(&settings)?;
                self.write_buf.write_settings_ack();
                self.send_pending().await?;
                None
            }
            HttpFrame::Ping {
                ack: false,
                opaque_data,
            } => {
                self.write_buf.write_ping_ack(opaque_data);
                self.flush().await?;
                None
            }
            HttpFrame::Ping { ack: true, .. } => None,
            HttpFrame::Goaway {
                last_stream_id,
                error_code,
                debug_data,
            } => {
                debug!(
                    "GOAWAY received, last stream {}, {}, {:?}",
                    last_stream_id,
                    error_code,
                    String::from_utf8_lossy(&debug_data)
                );
                Some(ConnEvent::Goaway {
                    last_stream_id,
                    error_code,
                })
            }
            HttpFrame::WindowUpdate {
                stream_id,
                increment,
            } => {
                let window = if stream_id == 0 {
                    Some(&mut self.out_window)
                } else {
                    self.out_streams.get_mut(&stream_id).map(|s| &mut s.window)
                };
                if let Some(window) = window {
                    *window += increment as i64;
                    if *window > MAX_WINDOW_SIZE as i64 {
                        return Err(Error::CodeError(ErrorCode::FlowControlError));
                    }
                }
                self.send_pending().await?;
                None
            }
            // push is disabled in our settings, and clients never push
            HttpFrame::PushPromise { .. } => return Err(Error::UnexpectedPushPromise),
            HttpFrame::Priority { .. } | HttpFrame::Unknown { .. } => None,
        };

        Ok(event)
    }

    fn open_peer_stream(&mut self, stream_id: u32) -> crate::Result<()> {
        let peer_initiated = (stream_id % 2 == 1) == self.is_server;
        if !peer_initiated || stream_id <= self.last_peer_stream_id {
            // response headers or trailers on a known stream
            return Ok(());
        }
        if !self.is_server {
            return Err(Error::UnexpectedPushPromise);
        }
        self.last_peer_stream_id = stream_id;
        self.out_streams
            .insert(stream_id, OutStream::new(self.peer_initial_window_size));
        Ok(())
    }

    fn decode_headers(
        &mut self,
        stream_id: u32,
        block: &[u8],
        end_stream: bool,
    ) -> crate::Result<ConnEvent> {
        let headers = self.decoder.decode(block)?;
        Ok(ConnEvent::Headers {
            stream_id,
            headers,
            end_stream,
        })
    }

    fn apply_settings(&mut self, settings: &[HttpSetting]) -> crate::Result<()> {
        for setting in settings {
            match *setting {
                HttpSetting::InitialWindowSize(size) => {
                    let delta = size as i64 - self.peer_initial_window_size as i64;
                    for stream in self.out_streams.values_mut() {
                        stream.window += delta;
                        if stream.window > MAX_WINDOW_SIZE as i64 {
                            return Err(Error::CodeError(ErrorCode::FlowControlError));
                        }
                    }
                    self.peer_initial_window_size = size;
                }
                HttpSetting::MaxFrameSize(size) => self.peer_max_frame_size = size,
                // our encoder does not use the dynamic table
                HttpSetting::HeaderTableSize(..)
                | HttpSetting::EnablePush(..)
                | HttpSetting::MaxConcurrentStreams(..)
                | HttpSetting::MaxHeaderListSize(..) => {}
            }
        }
        Ok(())
    }

    /// Send a header block; the stream stays open for data unless
    /// `end_stream` is set.
    pub async fn send_headers(
        &mut self,
        stream_id: u32,
        headers: &[(&[u8], &[u8])],
        end_stream: bool,
    ) -> crate::Result<()> {
        let block = self.encoder.encode(headers.iter().copied());
        self.write_buf.write_headers(
            stream_id,
            &block,
            end_stream,
            self.peer_max_frame_size as usize,
        );

        if end_stream {
            self.out_streams.remove(&stream_id);
        } else {
            let window = self.peer_initial_window_size;
            self.out_streams
                .entry(stream_id)
                .or_insert_with(|| OutStream::new(window));
        }
        self.flush().await
    }

    /// Queue data, send as much as flow control allows now.
    ///
    /// The rest goes out as `WINDOW_UPDATE` frames are processed. With
    /// `end_stream` the stream is ended by the last frame, a zero-length
    /// one if `data` is empty.
    pub async fn send_data(
        &mut self,
        stream_id: u32,
        data: Bytes,
        end_stream: bool,
    ) -> crate::Result<()> {
        let window = self.peer_initial_window_size;
        let stream = self
            .out_streams
            .entry(stream_id)
            .or_insert_with(|| OutStream::new(window));
        if !data.is_empty() {
            stream.pending.push_back(data);
        }
        stream.end_stream |= end_stream;
        self.send_pending().await
    }

    /// Data is waiting for the peer to open its window.
    pub fn has_pending_data(&self) -> bool {
        self.out_streams
            .values()
            .any(|s| !s.pending.is_empty() || s.end_stream)
    }

    async fn send_pending(&mut self) -> crate::Result<()> {
        let max_frame_size = self.peer_max_frame_size as i64;
        let mut done = Vec::new();

        for (&stream_id, stream) in self.out_streams.iter_mut() {
            while let Some(chunk) = stream.pending.front_mut() {
                let allowed = cmp::min(cmp::min(self.out_window, stream.window), max_frame_size);
                if allowed <= 0 {
                    break;
                }
                let piece = chunk.split_to(cmp::min(allowed as usize, chunk.len()));
                if chunk.is_empty() {
                    stream.pending.pop_front();
                }
                stream.window -= piece.len() as i64;
                self.out_window -= piece.len() as i64;

                let end_stream = stream.end_stream && stream.pending.is_empty();
                self.write_buf.write_data(stream_id, &piece, end_stream);
                if end_stream {
                    done.push(stream_id);
                }
            }

            if stream.end_stream && stream.pending.is_empty() && done.last() != Some(&stream_id) {
                // end of stream carries no data, needs no window
                self.write_buf.write_data(stream_id, &[], true);
                done.push(stream_id);
            }
        }

        for stream_id in done {
            self.out_streams.remove(&stream_id);
        }
        self.flush().await
    }

    pub async fn send_rst_stream(
        &mut self,
        stream_id: u32,
        error_code: ErrorCode,
    ) -> crate::Result<()> {
        self.out_streams.remove(&stream_id);
        self.write_buf.write_rst_stream(stream_id, error_code);
        self.flush().await
    }

    /// Send `GOAWAY` and shut down the write side.
    pub async fn close(&mut self, error_code: ErrorCode) -> crate::Result<()> {
        self.write_buf
            .write_goaway(self.last_peer_stream_id, error_code);
        self.flush().await?;
        self.io.shutdown().await?;
        Ok(())
    }

    async fn flush(&mut self) -> crate::Result<()> {
        if !self.write_buf.is_empty() {
            self.io.write_all(&self.write_buf).await?;
            self.write_buf.clear();
            self.io.flush().await?;
        }
        Ok(())
    }
}
