use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// Splits a chunk stream into newline-delimited records.
///
/// Blank lines are skipped, and a trailing record without a line feed is
/// still returned once the stream ends.
pub struct Lines {
    buf: Vec<u8>,
    chunks: Chunks,
    exhausted: bool,
}

impl Lines {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
            exhausted: false,
        }
    }

    pub async fn next_line(&mut self) -> Result<Option<String>, Error> {
        loop {
            if let Some(eol_idx) = self.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buf.drain(..=eol_idx).collect();
                let line = decode(&line[..eol_idx])?;
                if line.trim().is_empty() {
                    continue;
                }
                return Ok(Some(line));
            }

            if self.exhausted {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let rest = std::mem::take(&mut self.buf);
                let line = decode(&rest)?;
                if line.trim().is_empty() {
                    return Ok(None);
                }
                return Ok(Some(line));
            }

            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.exhausted = true,
            }
        }
    }
}

#[inline]
fn decode(bytes: &[u8]) -> Result<String, Error> {
    let Ok(s) = str::from_utf8(bytes) else {
        return Err(Error::InvalidPayload);
    };
    Ok(s.trim_end_matches('\r').to_owned())
}
