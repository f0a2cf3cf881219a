//! Newline framing for the plain-text transport.

use std::io;

use bytes::{Buf, BytesMut};
use memchr::memchr;
use tokio::io::{AsyncRead, AsyncReadExt};

pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

/// Reads `\n`-terminated lines from a byte stream.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    buf: BytesMut,
    max_line_len: usize,
}

impl<R> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(1024),
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }

    pub fn max_line_len(mut self, max: usize) -> Self {
        self.max_line_len = max.max(1);
        self
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Read one line without its `\n` or `\r\n` terminator.
    ///
    /// Returns `Ok(None)` at end of stream. Text left unterminated when the
    /// peer closes is returned as a final line. Invalid UTF-8 is replaced,
    /// not rejected. A line longer than the limit is an `InvalidData` error.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(i) = memchr(b'\n', &self.buf) {
                if content_len(&self.buf[..i]) > self.max_line_len {
                    return Err(too_long());
                }
                let line = decode(&self.buf[..i]);
                self.buf.advance(i + 1);
                return Ok(Some(line));
            }

            // A trailing `\r` may be the first half of the terminator.
            if content_len(&self.buf) > self.max_line_len {
                return Err(too_long());
            }

            if self.inner.read_buf(&mut self.buf).await? == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let line = decode(&self.buf);
                self.buf.clear();
                return Ok(Some(line));
            }
        }
    }
}

/// Length of `raw` not counting a trailing `\r`.
fn content_len(raw: &[u8]) -> usize {
    raw.strip_suffix(b"\r").unwrap_or(raw).len()
}

fn decode(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

fn too_long() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "line too long")
}
