//! Decoder for the `application/vnd.amazon.eventstream` framing.
//!
//! ```text
//! | total len (4) | headers len (4) | prelude crc (4) |
//! | headers (headers len) | payload | message crc (4) |
//! ```
//!
//! All integers are big-endian. Both checksums are CRC32 (IEEE); the
//! message checksum covers everything before it, prelude included.

use bytes::{Buf, Bytes, BytesMut};

use super::{Chunks, ChunksError};

const PRELUDE_LEN: usize = 12;
const MIN_FRAME_LEN: usize = PRELUDE_LEN + 4;
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidFrame(&'static str),
    /// The stream ended in the middle of a frame.
    Truncated,
}

/// A decoded message. Only string-valued headers are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub headers: Vec<(String, String)>,
    pub payload: Bytes,
}

impl Frame {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

pub struct EventStream {
    buf: BytesMut,
    chunks: Chunks,
    exhausted: bool,
}

impl EventStream {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: BytesMut::new(),
            chunks,
            exhausted: false,
        }
    }

    pub async fn next_frame(&mut self) -> Result<Option<Frame>, Error> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf)? {
                return Ok(Some(frame));
            }
            if self.exhausted {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(Error::Truncated);
            }
            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.exhausted = true,
            }
        }
    }
}

/// Decodes one frame from the front of `buf` if it is complete.
fn decode_frame(buf: &mut BytesMut) -> Result<Option<Frame>, Error> {
    if buf.len() < PRELUDE_LEN {
        return Ok(None);
    }
    let total_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let headers_len =
        u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
    if total_len < MIN_FRAME_LEN || total_len > MAX_FRAME_LEN {
        return Err(Error::InvalidFrame("bad frame length"));
    }
    if headers_len > total_len - MIN_FRAME_LEN {
        return Err(Error::InvalidFrame("bad headers length"));
    }
    let prelude_crc = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
    if crc32fast::hash(&buf[..8]) != prelude_crc {
        return Err(Error::InvalidFrame("prelude checksum mismatch"));
    }
    if buf.len() < total_len {
        return Ok(None);
    }
    let message_end = total_len - 4;
    let message_crc = u32::from_be_bytes([
        buf[message_end],
        buf[message_end + 1],
        buf[message_end + 2],
        buf[message_end + 3],
    ]);
    if crc32fast::hash(&buf[..message_end]) != message_crc {
        return Err(Error::InvalidFrame("message checksum mismatch"));
    }

    let mut frame = buf.split_to(total_len).freeze();
    frame.advance(PRELUDE_LEN);
    let mut headers_buf = frame.split_to(headers_len);
    let payload = frame.split_to(total_len - MIN_FRAME_LEN - headers_len);

    let headers = decode_headers(&mut headers_buf)?;
    Ok(Some(Frame { headers, payload }))
}

fn decode_headers(buf: &mut Bytes) -> Result<Vec<(String, String)>, Error> {
    let mut headers = vec![];
    while buf.has_remaining() {
        let name_len = buf.get_u8() as usize;
        let name = take_str(buf, name_len)?;
        ensure(buf, 1)?;
        let value_type = buf.get_u8();
        let value = match value_type {
            // Booleans.
            0 | 1 => None,
            2 => skip(buf, 1)?,
            3 => skip(buf, 2)?,
            4 => skip(buf, 4)?,
            5 | 8 => skip(buf, 8)?,
            6 => {
                ensure(buf, 2)?;
                let len = buf.get_u16() as usize;
                skip(buf, len)?
            }
            7 => {
                ensure(buf, 2)?;
                let len = buf.get_u16() as usize;
                Some(take_str(buf, len)?)
            }
            9 => skip(buf, 16)?,
            _ => return Err(Error::InvalidFrame("unknown header type")),
        };
        if let Some(value) = value {
            headers.push((name, value));
        }
    }
    Ok(headers)
}

#[inline]
fn ensure(buf: &Bytes, len: usize) -> Result<(), Error> {
    if buf.remaining() < len {
        return Err(Error::InvalidFrame("header overflows frame"));
    }
    Ok(())
}

#[inline]
fn skip(buf: &mut Bytes, len: usize) -> Result<Option<String>, Error> {
    ensure(buf, len)?;
    buf.advance(len);
    Ok(None)
}

#[inline]
fn take_str(buf: &mut Bytes, len: usize) -> Result<String, Error> {
    ensure(buf, len)?;
    let bytes = buf.split_to(len);
    String::from_utf8(bytes.to_vec())
        .map_err(|_| Error::InvalidFrame("header is not utf-8"))
}
