use std::fmt::{self, Display};

use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Chunks(ChunksError),
    InvalidPayload,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Chunks(err) => err.fmt(f),
            Error::InvalidPayload => write!(f, "invalid event stream payload"),
        }
    }
}

/// Reads the `data` of server-sent events from a chunk stream.
///
/// `\r\n`, `\r` and `\n` all end a line. Comment lines and fields other
/// than `data` are skipped; an event made only of those is skipped as a
/// whole. Multiple `data` lines in one event are joined with `\n`. An event
/// left unterminated when the stream ends is still parsed.
pub struct Sse {
    // Line endings are normalized to `\n` on the way in.
    buf: Vec<u8>,
    // The last byte read was a `\r`, a `\n` right after it is dropped.
    after_cr: bool,
    chunks: Chunks,
    exhausted: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            after_cr: false,
            chunks,
            exhausted: false,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain whatever complete events are buffered before reading
            // more, a single chunk often carries several of them.
            while let Some(block) = self.take_block() {
                if let Some(data) = parse_block(&block)? {
                    return Ok(Some(data));
                }
            }

            if self.exhausted {
                if self.buf.iter().all(|b| *b == b'\n') {
                    self.buf.clear();
                    return Ok(None);
                }
                let block = std::mem::take(&mut self.buf);
                return parse_block(&block);
            }
            match self.chunks.next_chunk().await.map_err(Error::Chunks)? {
                Some(bytes) => self.push_normalized(&bytes),
                None => self.exhausted = true,
            }
        }
    }

    fn push_normalized(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if self.after_cr {
                self.after_cr = false;
                if b == b'\n' {
                    continue;
                }
            }
            if b == b'\r' {
                self.after_cr = true;
                self.buf.push(b'\n');
            } else {
                self.buf.push(b);
            }
        }
    }

    /// Splits off the next block terminated by a blank line.
    fn take_block(&mut self) -> Option<Vec<u8>> {
        let eol_idx = self.buf.windows(2).position(|w| w == b"\n\n")?;
        let block = self.buf[..eol_idx].to_vec();
        self.buf.drain(..eol_idx + 2);
        Some(block)
    }
}

fn parse_block(block: &[u8]) -> Result<Option<String>, Error> {
    // Splitting on raw bytes first keeps multi-byte characters that span
    // chunk boundaries intact.
    let block = str::from_utf8(block).map_err(|_| Error::InvalidPayload)?;

    let mut data: Option<String> = None;
    for line in block.split('\n') {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let Some((field, value)) = line.split_once(':') else {
            return Err(Error::InvalidPayload);
        };
        if field != "data" {
            trace!("skipping sse field: {field}");
            continue;
        }
        let value = value.strip_prefix(' ').unwrap_or(value);
        match &mut data {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => data = Some(value.to_owned()),
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn sse_from(chunks: &[&'static [u8]]) -> Sse {
        let chunks = chunks.iter().map(|c| Bytes::from_static(*c)).collect();
        Sse::new(Chunks::from_vec_deque(chunks))
    }

    #[tokio::test]
    async fn test_normal_events() {
        let mut sse = sse_from(&[b"data: hello\n\n", b"data: bye\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_several_events_in_one_chunk() {
        let mut sse = sse_from(&[b"data: a\n\ndata: b\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "a");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "b");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quirk_streaming() {
        let mut sse = sse_from(&[b"data:", b" hello\n", b"\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_utf8() {
        // "é" is 0xC3 0xA9, split across two chunks.
        let mut sse = sse_from(&[b"data: caf\xC3", b"\xA9\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "café");
    }

    #[tokio::test]
    async fn test_comments_and_other_fields() {
        let mut sse = sse_from(&[
            b": keep-alive\n\n",
            b"event: message\nid: 7\ndata: one\ndata: two\n\n",
        ]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "one\ntwo");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_data() {
        let mut sse = sse_from(&[b"xxxxxx\n\n"]);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);

        let mut sse = sse_from(&[b"xxxxxx\n"]);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);
    }

    #[tokio::test]
    async fn test_unterminated_last_event() {
        let mut sse = sse_from(&[b"data: hello\n", b"data: bye\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello\nbye");
        assert_eq!(sse.next_event().await.unwrap(), None);

        let mut sse = sse_from(&[b"data: a\n\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "a");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_crlf_line_endings() {
        let mut sse = sse_from(&[
            b": ping\r\n\r\n",
            b"data: one\r\ndata: two\r",
            b"\n\r\ndata: cr\r\rdata: [DONE]\r\n\r\n",
        ]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "one\ntwo");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "cr");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "[DONE]");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }
}
