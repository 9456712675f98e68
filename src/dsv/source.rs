// Character sources for the row decoder.
//
// `CharSource` yields one `char` at a time. Checkpointing is an optional
// capability: the default `checkpoint`/`rewind` return `Unsupported`.
//
// Implementations:
//   - `StrSource`   : in-memory `&str`; checkpoint = byte offset
//   - `ReaderSource`: UTF-8 decoded from any `Read`; checkpoint replays the
//                   characters read since the mark, up to a read-ahead limit

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, ErrorKind, Read};

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// CharSource trait
// ---------------------------------------------------------------------------

/// A pull-based stream of characters.
pub trait CharSource {
    /// Opaque checkpoint handed back to [`rewind`](Self::rewind).
    type Token: Clone;

    /// Next character, or `None` at end of stream.
    fn next_char(&mut self) -> io::Result<Option<char>>;

    /// Record the current position. At most `read_ahead_limit` characters may
    /// be read before the checkpoint stops being guaranteed.
    fn checkpoint(&mut self, read_ahead_limit: usize) -> io::Result<Self::Token> {
        let _ = read_ahead_limit;
        Err(unsupported())
    }

    /// Return to a position recorded by [`checkpoint`](Self::checkpoint).
    fn rewind(&mut self, token: &Self::Token) -> io::Result<()> {
        let _ = token;
        Err(unsupported())
    }
}

fn unsupported() -> io::Error {
    io::Error::new(ErrorKind::Unsupported, "source does not support checkpoints")
}

impl<S: CharSource + ?Sized> CharSource for &mut S {
    type Token = S::Token;

    fn next_char(&mut self) -> io::Result<Option<char>> {
        (**self).next_char()
    }

    fn checkpoint(&mut self, read_ahead_limit: usize) -> io::Result<Self::Token> {
        (**self).checkpoint(read_ahead_limit)
    }

    fn rewind(&mut self, token: &Self::Token) -> io::Result<()> {
        (**self).rewind(token)
    }
}

// ---------------------------------------------------------------------------
// In-memory source
// ---------------------------------------------------------------------------

/// Characters of a borrowed string.
#[derive(Debug, Clone)]
pub struct StrSource<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> StrSource<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// Byte offset of the next character.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl CharSource for StrSource<'_> {
    type Token = usize;

    #[inline]
    fn next_char(&mut self) -> io::Result<Option<char>> {
        let c = self.text[self.pos..].chars().next();
        if let Some(c) = c {
            self.pos += c.len_utf8();
        }
        Ok(c)
    }

    fn checkpoint(&mut self, _read_ahead_limit: usize) -> io::Result<usize> {
        Ok(self.pos)
    }

    fn rewind(&mut self, token: &usize) -> io::Result<()> {
        if *token > self.text.len() || !self.text.is_char_boundary(*token) {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("checkpoint offset {token} is not a character boundary"),
            ));
        }
        self.pos = *token;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reader source
// ---------------------------------------------------------------------------

/// Checkpoint token for [`ReaderSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderMark {
    generation: u64,
}

#[derive(Debug)]
struct MarkState {
    generation: u64,
    limit: usize,
    /// Characters handed out since the mark; `None` once the limit overflowed.
    history: Option<Vec<char>>,
}

/// UTF-8 characters decoded from a byte reader.
///
/// Wraps the reader in a `BufReader`. Supports one live checkpoint at a time;
/// a new `checkpoint` replaces the previous one.
pub struct ReaderSource<R: Read> {
    inner: BufReader<R>,
    /// Characters queued for replay after a rewind.
    pending: VecDeque<char>,
    mark: Option<MarkState>,
    next_generation: u64,
    bytes_read: u64,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(BUF_SIZE, reader)
    }

    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity, reader),
            pending: VecDeque::new(),
            mark: None,
            next_generation: 0,
            bytes_read: 0,
        }
    }

    /// Bytes pulled from the underlying reader so far (replays not counted).
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Recover the underlying reader. Buffered but unread bytes are lost.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            let buf = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            let Some(&b) = buf.first() else {
                return Ok(None);
            };
            self.inner.consume(1);
            self.bytes_read += 1;
            return Ok(Some(b));
        }
    }

    fn decode_char(&mut self) -> io::Result<Option<char>> {
        let Some(lead) = self.read_byte()? else {
            return Ok(None);
        };
        let width = match lead {
            0x00..=0x7F => return Ok(Some(lead as char)),
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return Err(invalid_utf8(self.bytes_read - 1)),
        };

        let mut bytes = [lead, 0, 0, 0];
        for slot in bytes.iter_mut().take(width).skip(1) {
            *slot = self.read_byte()?.ok_or_else(|| {
                io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "stream ended inside a UTF-8 sequence",
                )
            })?;
        }
        let start = self.bytes_read - width as u64;
        std::str::from_utf8(&bytes[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .map(Some)
            .ok_or_else(|| invalid_utf8(start))
    }

    fn record(&mut self, c: char) {
        let Some(mark) = self.mark.as_mut() else {
            return;
        };
        if let Some(history) = mark.history.as_mut() {
            if history.len() < mark.limit {
                history.push(c);
            } else {
                log::debug!(
                    "checkpoint invalidated after {} characters of read-ahead",
                    mark.limit
                );
                mark.history = None;
            }
        }
    }
}

fn invalid_utf8(offset: u64) -> io::Error {
    io::Error::new(
        ErrorKind::InvalidData,
        format!("invalid UTF-8 sequence at byte offset {offset}"),
    )
}

impl<R: Read> CharSource for ReaderSource<R> {
    type Token = ReaderMark;

    fn next_char(&mut self) -> io::Result<Option<char>> {
        let c = match self.pending.pop_front() {
            Some(c) => Some(c),
            None => self.decode_char()?,
        };
        if let Some(c) = c {
            self.record(c);
        }
        Ok(c)
    }

    fn checkpoint(&mut self, read_ahead_limit: usize) -> io::Result<ReaderMark> {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.mark = Some(MarkState {
            generation,
            limit: read_ahead_limit,
            history: Some(Vec::new()),
        });
        Ok(ReaderMark { generation })
    }

    fn rewind(&mut self, token: &ReaderMark) -> io::Result<()> {
        let mark = match self.mark.as_mut() {
            Some(mark) if mark.generation == token.generation => mark,
            _ => {
                return Err(io::Error::new(
                    ErrorKind::InvalidInput,
                    "checkpoint was replaced by a newer one",
                ));
            }
        };
        let Some(history) = mark.history.as_mut() else {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "checkpoint invalidated: read-ahead limit of {} characters exceeded",
                    mark.limit
                ),
            ));
        };

        // Replayed characters are recorded again as they are re-read, so the
        // mark stays usable for another rewind.
        for c in history.drain(..).rev() {
            self.pending.push_front(c);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
