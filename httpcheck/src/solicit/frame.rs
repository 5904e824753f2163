//! HTTP/2 frames (RFC 7540, section 6).

use bytes::Buf;
use bytes::Bytes;

use crate::solicit::error_code::ErrorCode;

pub const FRAME_HEADER_LEN: usize = 9;

/// Initial `SETTINGS_MAX_FRAME_SIZE`, also its smallest allowed value.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 0x4000;
/// Largest `SETTINGS_MAX_FRAME_SIZE` a peer may announce.
pub const MAX_MAX_FRAME_SIZE: u32 = 0xff_ffff;
/// Initial stream and connection flow control window.
pub const DEFAULT_WINDOW_SIZE: u32 = 65_535;
pub const MAX_WINDOW_SIZE: u32 = 0x7fff_ffff;

pub const DATA_FRAME_TYPE: u8 = 0x0;
pub const HEADERS_FRAME_TYPE: u8 = 0x1;
pub const PRIORITY_FRAME_TYPE: u8 = 0x2;
pub const RST_STREAM_FRAME_TYPE: u8 = 0x3;
pub const SETTINGS_FRAME_TYPE: u8 = 0x4;
pub const PUSH_PROMISE_FRAME_TYPE: u8 = 0x5;
pub const PING_FRAME_TYPE: u8 = 0x6;
pub const GOAWAY_FRAME_TYPE: u8 = 0x7;
pub const WINDOW_UPDATE_FRAME_TYPE: u8 = 0x8;
pub const CONTINUATION_FRAME_TYPE: u8 = 0x9;

pub mod flags {
    pub const END_STREAM: u8 = 0x1;
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct FrameHeader {
    pub payload_len: u32,
    pub frame_type: u8,
    pub flags: u8,
    pub stream_id: u32,
}

impl FrameHeader {
    pub fn new(payload_len: u32, frame_type: u8, flags: u8, stream_id: u32) -> FrameHeader {
        FrameHeader {
            payload_len,
            frame_type,
            flags,
            stream_id,
        }
    }

    fn is_set(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

/// The reserved bit of the stream id is ignored.
pub fn unpack_header(header: &[u8; FRAME_HEADER_LEN]) -> FrameHeader {
    let payload_len = u32::from_be_bytes([0, header[0], header[1], header[2]]);
    let stream_id = u32::from_be_bytes([header[5], header[6], header[7], header[8]]) & MAX_WINDOW_SIZE;
    FrameHeader::new(payload_len, header[3], header[4], stream_id)
}

pub fn pack_header(header: &FrameHeader) -> [u8; FRAME_HEADER_LEN] {
    let len = header.payload_len.to_be_bytes();
    let stream_id = header.stream_id.to_be_bytes();
    [
        len[1],
        len[2],
        len[3],
        header.frame_type,
        header.flags,
        stream_id[0],
        stream_id[1],
        stream_id[2],
        stream_id[3],
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFrameError {
    #[error("frame type {0} has incorrect length {1}")]
    IncorrectFrameLength(u8, u32),
    #[error("frame type {0} must have non-zero stream id")]
    StreamIdMustBeNonZero(u8),
    #[error("frame type {0} must have zero stream id, got {1}")]
    StreamIdMustBeZero(u8, u32),
    #[error("padding is longer than the payload")]
    IncorrectPadding,
    #[error("SETTINGS_ENABLE_PUSH must be 0 or 1, got {0}")]
    IncorrectSettingsPushValue(u32),
    #[error("SETTINGS_MAX_FRAME_SIZE out of range: {0}")]
    IncorrectSettingsMaxFrameSize(u32),
    #[error("SETTINGS_INITIAL_WINDOW_SIZE too large: {0}")]
    WindowSizeTooLarge(u32),
    #[error("WINDOW_UPDATE with zero increment")]
    WindowUpdateIncrementInvalid,
}

impl ParseFrameError {
    /// Code the connection is closed with.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ParseFrameError::IncorrectFrameLength(..) => ErrorCode::FrameSizeError,
            ParseFrameError::WindowSizeTooLarge(..) => ErrorCode::FlowControlError,
            _ => ErrorCode::ProtocolError,
        }
    }
}

pub type ParseFrameResult<T> = Result<T, ParseFrameError>;

/// Setting carried by a `SETTINGS` frame.
#[derive(Clone, PartialEq, Eq, Debug, Copy)]
pub enum HttpSetting {
    HeaderTableSize(u32),
    EnablePush(bool),
    MaxConcurrentStreams(u32),
    InitialWindowSize(u32),
    MaxFrameSize(u32),
    MaxHeaderListSize(u32),
}

impl HttpSetting {
    /// `None` for unknown setting ids, which must be ignored.
    pub fn from_id(id: u16, val: u32) -> ParseFrameResult<Option<HttpSetting>> {
        Ok(Some(match id {
            1 => HttpSetting::HeaderTableSize(val),
            2 => match val {
                0 => HttpSetting::EnablePush(false),
                1 => HttpSetting::EnablePush(true),
                _ => return Err(ParseFrameError::IncorrectSettingsPushValue(val)),
            },
            3 => HttpSetting::MaxConcurrentStreams(val),
            4 => {
                if val > MAX_WINDOW_SIZE {
                    return Err(ParseFrameError::WindowSizeTooLarge(val));
                }
                HttpSetting::InitialWindowSize(val)
            }
            5 => {
                if val < DEFAULT_MAX_FRAME_SIZE || val > MAX_MAX_FRAME_SIZE {
                    return Err(ParseFrameError::IncorrectSettingsMaxFrameSize(val));
                }
                HttpSetting::MaxFrameSize(val)
            }
            6 => HttpSetting::MaxHeaderListSize(val),
            _ => return Ok(None),
        }))
    }

    pub fn id(&self) -> u16 {
        match *self {
            HttpSetting::HeaderTableSize(_) => 1,
            HttpSetting::EnablePush(_) => 2,
            HttpSetting::MaxConcurrentStreams(_) => 3,
            HttpSetting::InitialWindowSize(_) => 4,
            HttpSetting::MaxFrameSize(_) => 5,
            HttpSetting::MaxHeaderListSize(_) => 6,
        }
    }

    pub fn value(&self) -> u32 {
        match *self {
            HttpSetting::HeaderTableSize(val)
            | HttpSetting::MaxConcurrentStreams(val)
            | HttpSetting::InitialWindowSize(val)
            | HttpSetting::MaxFrameSize(val)
            | HttpSetting::MaxHeaderListSize(val) => val,
            HttpSetting::EnablePush(push) => push as u32,
        }
    }
}

/// Frame as read from the wire, payload not interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

/// Parsed frame.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpFrame {
    Data {
        stream_id: u32,
        data: Bytes,
        end_stream: bool,
        /// Whole payload length, padding included, as counted by flow control.
        flow_controlled_len: u32,
    },
    Headers {
        stream_id: u32,
        fragment: Bytes,
        end_stream: bool,
        end_headers: bool,
    },
    Priority {
        stream_id: u32,
    },
    RstStream {
        stream_id: u32,
        error_code: ErrorCode,
    },
    Settings {
        ack: bool,
        settings: Vec<HttpSetting>,
    },
    PushPromise {
        stream_id: u32,
    },
    Ping {
        ack: bool,
        opaque_data: [u8; 8],
    },
    Goaway {
        last_stream_id: u32,
        error_code: ErrorCode,
        debug_data: Bytes,
    },
    WindowUpdate {
        stream_id: u32,
        increment: u32,
    },
    Continuation {
        stream_id: u32,
        fragment: Bytes,
        end_headers: bool,
    },
    /// Frames of unknown type are ignored.
    Unknown {
        frame_type: u8,
    },
}

fn strip_padding(header: &FrameHeader, mut payload: Bytes) -> ParseFrameResult<Bytes> {
    if !header.is_set(flags::PADDED) {
        return Ok(payload);
    }
    if payload.is_empty() {
        return Err(ParseFrameError::IncorrectPadding);
    }
    let pad_len = payload.get_u8() as usize;
    if pad_len > payload.len() {
        return Err(ParseFrameError::IncorrectPadding);
    }
    payload.truncate(payload.len() - pad_len);
    Ok(payload)
}

fn check_len(header: &FrameHeader, ok: bool) -> ParseFrameResult<()> {
    if ok {
        Ok(())
    } else {
        Err(ParseFrameError::IncorrectFrameLength(
            header.frame_type,
            header.payload_len,
        ))
    }
}

fn stream_frame(header: &FrameHeader) -> ParseFrameResult<u32> {
    if header.stream_id == 0 {
        return Err(ParseFrameError::StreamIdMustBeNonZero(header.frame_type));
    }
    Ok(header.stream_id)
}

fn connection_frame(header: &FrameHeader) -> ParseFrameResult<()> {
    if header.stream_id != 0 {
        return Err(ParseFrameError::StreamIdMustBeZero(
            header.frame_type,
            header.stream_id,
        ));
    }
    Ok(())
}

impl HttpFrame {
    pub fn from_raw(raw: RawFrame) -> ParseFrameResult<HttpFrame> {
        let RawFrame {
            header,
            mut payload,
        } = raw;

        Ok(match header.frame_type {
            DATA_FRAME_TYPE => HttpFrame::Data {
                stream_id: stream_frame(&header)?,
                flow_controlled_len: header.payload_len,
                end_stream: header.is_set(flags::END_STREAM),
                data: strip_padding(&header, payload)?,
            },
            HEADERS_FRAME_TYPE => {
                let stream_id = stream_frame(&header)?;
                let mut fragment = strip_padding(&header, payload)?;
                if header.is_set(flags::PRIORITY) {
                    check_len(&header, fragment.len() >= 5)?;
                    fragment.advance(5);
                }
                HttpFrame::Headers {
                    stream_id,
                    fragment,
                    end_stream: header.is_set(flags::END_STREAM),
                    end_headers: header.is_set(flags::END_HEADERS),
                }
            }
            PRIORITY_FRAME_TYPE => {
                check_len(&header, payload.len() == 5)?;
                HttpFrame::Priority {
                    stream_id: stream_frame(&header)?,
                }
            }
            RST_STREAM_FRAME_TYPE => {
                check_len(&header, payload.len() == 4)?;
                HttpFrame::RstStream {
                    stream_id: stream_frame(&header)?,
                    error_code: ErrorCode::from(payload.get_u32()),
                }
            }
            SETTINGS_FRAME_TYPE => {
                connection_frame(&header)?;
                let ack = header.is_set(flags::ACK);
                if ack {
                    check_len(&header, payload.is_empty())?;
                }
                check_len(&header, payload.len() % 6 == 0)?;
                let mut settings = Vec::with_capacity(payload.len() / 6);
                while payload.has_remaining() {
                    let id = payload.get_u16();
                    let val = payload.get_u32();
                    if let Some(setting) = HttpSetting::from_id(id, val)? {
                        settings.push(setting);
                    }
                }
                HttpFrame::Settings { ack, settings }
            }
            PUSH_PROMISE_FRAME_TYPE => HttpFrame::PushPromise {
                stream_id: stream_frame(&header)?,
            },
            PING_FRAME_TYPE => {
                connection_frame(&header)?;
                check_len(&header, payload.len() == 8)?;
                let mut opaque_data = [0; 8];
                payload.copy_to_slice(&mut opaque_data);
                HttpFrame::Ping {
                    ack: header.is_set(flags::ACK),
                    opaque_data,
                }
            }
            GOAWAY_FRAME_TYPE => {
                connection_frame(&header)?;
                check_len(&header, payload.len() >= 8)?;
                HttpFrame::Goaway {
                    last_stream_id: payload.get_u32() & MAX_WINDOW_SIZE,
                    error_code: ErrorCode::from(payload.get_u32()),
                    debug_data: payload,
                }
            }
            WINDOW_UPDATE_FRAME_TYPE => {
                check_len(&header, payload.len() == 4)?;
                let increment = payload.get_u32() & MAX_WINDOW_SIZE;
                if increment == 0 {
                    return Err(ParseFrameError::WindowUpdateIncrementInvalid);
                }
                HttpFrame::WindowUpdate {
                    stream_id: header.stream_id,
                    increment,
                }
            }
            CONTINUATION_FRAME_TYPE => HttpFrame::Continuation {
                stream_id: stream_frame(&header)?,
                fragment: payload,
                end_headers: header.is_set(flags::END_HEADERS),
            },
            frame_type => HttpFrame::Unknown { frame_type },
        })
    }
}

/// Serialization of the frames this crate sends.
pub trait FrameBuilder {
    fn write_frame(&mut self, header: FrameHeader, payload: &[u8]);

    fn write_settings(&mut self, settings: &[HttpSetting]) {
        let mut payload = Vec::with_capacity(settings.len() * 6);
        for setting in settings {
            payload.extend_from_slice(&setting.id().to_be_bytes());
            payload.extend_from_slice(&setting.value().to_be_bytes());
        }
        let header = FrameHeader::new(payload.len() as u32, SETTINGS_FRAME_TYPE, 0, 0);
        self.write_frame(header, &payload);
    }

    fn write_settings_ack(&mut self) {
        let header = FrameHeader::new(0, SETTINGS_FRAME_TYPE, flags::ACK, 0);
        self.write_frame(header, &[]);
    }

    fn write_ping_ack(&mut self, opaque_data: [u8; 8]) {
        let header = FrameHeader::new(8, PING_FRAME_TYPE, flags::ACK, 0);
        self.write_frame(header, &opaque_data);
    }

    fn write_window_update(&mut self, stream_id: u32, increment: u32) {
        let header = FrameHeader::new(4, WINDOW_UPDATE_FRAME_TYPE, 0, stream_id);
        self.write_frame(header, &increment.to_be_bytes());
    }

    fn write_rst_stream(&mut self, stream_id: u32, error_code: ErrorCode) {
        let header = FrameHeader::new(4, RST_STREAM_FRAME_TYPE, 0, stream_id);
        self.write_frame(header, &u32::from(error_code).to_be_bytes());
    }

    fn write_goaway(&mut self, last_stream_id: u32, error_code: ErrorCode) {
        let mut payload = [0; 8];
        payload[..4].copy_from_slice(&last_stream_id.to_be_bytes());
        payload[4..].copy_from_slice(&u32::from(error_code).to_be_bytes());
        let header = FrameHeader::new(8, GOAWAY_FRAME_TYPE, 0, 0);
        self.write_frame(header, &payload);
    }

    fn write_data(&mut self, stream_id: u32, data: &[u8], end_stream: bool) {
        let flags = if end_stream { flags::END_STREAM } else { 0 };
        let header = FrameHeader::new(data.len() as u32, DATA_FRAME_TYPE, flags, stream_id);
        self.write_frame(header, data);
    }

    /// `HEADERS` followed by as many `CONTINUATION` frames as the block
    /// needs to fit `max_frame_size`.
    fn write_headers(
        &mut self,
        stream_id: u32,
        block: &[u8],
        end_stream: bool,
        max_frame_size: usize,
    ) {
        let mut chunks = block.chunks(max_frame_size.max(1)).peekable();
        let mut frame_type = HEADERS_FRAME_TYPE;
        let mut flags = if end_stream { flags::END_STREAM } else { 0 };

        if chunks.peek().is_none() {
            let header = FrameHeader::new(0, frame_type, flags | flags::END_HEADERS, stream_id);
            self.write_frame(header, &[]);
            return;
        }

        while let Some(chunk) = chunks.next() {
            if chunks.peek().is_none() {
                flags |= flags::END_HEADERS;
            }
            let header = FrameHeader::new(chunk.len() as u32, frame_type, flags, stream_id);
            self.write_frame(header, chunk);
            frame_type = CONTINUATION_FRAME_TYPE;
            flags = 0;
        }
    }
}

impl FrameBuilder for Vec<u8> {
    fn write_frame(&mut self, header: FrameHeader, payload: &[u8]) {
        debug_assert_eq!(header.payload_len as usize, payload.len());
        self.extend_from_slice(&pack_header(&header));
        self.extend_from_slice(payload);
    }
}
