// Row decoder: single pass, one character of lookahead.
//
// Consumes a `CharSource` and yields rows on demand. Per character:
//
//   1. feed the delimiter matcher
//   2. CR / LF outside quotes ends the row (CRLF collapses to one terminator)
//   3. a delimiter match outside quotes ends the field; the partial match
//      already buffered is trimmed, and if the row (or stream) ends right after
//      it an empty trailing field is added
//   4. a quote toggles quoting; inside quotes `""` is kept as an escaped pair
//   5. anything else is buffered as-is
//
// Malformed quoting is never an error. Unbalanced or mid-field quotes just
// toggle state, and the raw cell is passed to the strategy's `unescape`,
// which leaves cells without outer quotes untouched.
//
// `mark`/`reset` save and restore the source checkpoint together with the
// lookahead character, rewinding the whole decoder.

use std::io;

use thiserror::Error;

use super::config::{ConfigError, QUOTE};
use super::matcher::DelimiterMatcher;
use super::source::{CharSource, StrSource};
use super::strategy::{RecordStrategy, StandardStrategy};

/// One decoded record.
pub type Row = Vec<String>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("reset called without a prior mark")]
    NoCheckpoint,
}

// ---------------------------------------------------------------------------
// Checkpoint
// ---------------------------------------------------------------------------

/// Source checkpoint plus the decoder state needed to resume from it.
#[derive(Debug, Clone)]
struct DecoderCheckpoint<T> {
    token: T,
    lookahead: Option<char>,
    rows_decoded: u64,
}

// ---------------------------------------------------------------------------
// RowDecoder
// ---------------------------------------------------------------------------

/// Lazily decodes rows from a character source.
///
/// Not restartable except through [`mark`](Self::mark) and
/// [`reset`](Self::reset). One decoder owns one source; it is not meant to be
/// shared between consumers.
///
/// # Example
/// ```
/// use dsvcodec::dsv::{RowDecoder, StrSource, StandardStrategy};
///
/// let mut rows = RowDecoder::new(StrSource::new("a,b\r\n\"c,d\",e"), StandardStrategy::default())
///     .unwrap();
/// assert_eq!(rows.next_row().unwrap(), Some(vec!["a".to_string(), "b".to_string()]));
/// assert_eq!(rows.next_row().unwrap(), Some(vec!["c,d".to_string(), "e".to_string()]));
/// assert_eq!(rows.next_row().unwrap(), None);
/// ```
pub struct RowDecoder<R: CharSource, S: RecordStrategy = StandardStrategy> {
    source: R,
    strategy: S,
    matcher: DelimiterMatcher,
    /// Next unread character; `None` when not yet read or the stream ended.
    lookahead: Option<char>,
    checkpoint: Option<DecoderCheckpoint<R::Token>>,
    rows_decoded: u64,
    /// Reusable buffer for the raw text of the field being read.
    field_buf: String,
}

impl<R: CharSource, S: RecordStrategy> RowDecoder<R, S> {
    /// Create a decoder over `source`.
    ///
    /// Fails if the strategy's delimiter is invalid.
    pub fn new(source: R, strategy: S) -> Result<Self, ConfigError> {
        let matcher = DelimiterMatcher::new(strategy.config().delimiter())?;
        Ok(Self {
            source,
            strategy,
            matcher,
            lookahead: None,
            checkpoint: None,
            rows_decoded: 0,
            field_buf: String::new(),
        })
    }

    /// Rows produced so far.
    pub fn rows_decoded(&self) -> u64 {
        self.rows_decoded
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Give back the source. Any lookahead character is lost.
    pub fn into_source(self) -> R {
        self.source
    }

    /// Whether another row is available.
    pub fn has_next(&mut self) -> Result<bool, DecodeError> {
        if self.lookahead.is_none() {
            self.lookahead = self.source.next_char()?;
        }
        Ok(self.lookahead.is_some())
    }

    /// Move one character forward, returning the new current character.
    #[inline]
    fn advance(&mut self) -> io::Result<Option<char>> {
        let current = self.lookahead.take();
        self.lookahead = self.source.next_char()?;
        Ok(current)
    }

    /// Decode the next row, or `None` once the source is exhausted.
    pub fn next_row(&mut self) -> Result<Option<Row>, DecodeError> {
        if !self.has_next()? {
            return Ok(None);
        }

        let mut fields = Row::new();
        let mut in_quote = false;
        let delimiter_tail = self.trailing_partial_len();
        self.field_buf.clear();
        self.matcher.reset();

        while let Some(c) = self.advance()? {
            self.matcher.feed(c);

            if !in_quote && c == '\r' {
                if self.lookahead == Some('\n') {
                    self.advance()?;
                }
                break;
            }

            if !in_quote && c == '\n' {
                break;
            }

            if self.matcher.is_match() {
                if in_quote {
                    self.field_buf.push(c);
                    continue;
                }

                // The first (len - 1) delimiter characters are already in
                // the buffer; drop them.
                let keep = self.field_buf.len() - delimiter_tail;
                self.field_buf.truncate(keep);
                fields.push(self.strategy.unescape(&self.field_buf).into_owned());
                self.field_buf.clear();
                self.matcher.reset();

                if matches!(self.lookahead, None | Some('\r' | '\n')) {
                    fields.push(String::new());
                }
                continue;
            }

            if c == QUOTE {
                if in_quote && self.lookahead == Some(QUOTE) {
                    self.field_buf.push(QUOTE);
                    self.field_buf.push(QUOTE);
                    self.advance()?;
                    continue;
                }
                self.field_buf.push(c);
                in_quote = !in_quote;
                continue;
            }

            self.field_buf.push(c);
        }

        if in_quote {
            log::debug!(
                "row {} ended inside an unterminated quoted field",
                self.rows_decoded
            );
        }

        if !self.field_buf.is_empty() {
            fields.push(self.strategy.unescape(&self.field_buf).into_owned());
        }

        log::trace!("row {}: {} fields", self.rows_decoded, fields.len());
        self.rows_decoded += 1;
        Ok(Some(fields))
    }

    /// Byte length of the delimiter minus its final character.
    fn trailing_partial_len(&self) -> usize {
        let delimiter = self.strategy.config().delimiter();
        let last = delimiter.chars().next_back().map_or(0, char::len_utf8);
        delimiter.len() - last
    }

    /// Save the current position. A later [`reset`](Self::reset) rewinds
    /// the decoder here. Replaces any earlier mark.
    ///
    /// `read_ahead_limit` bounds how many characters may be read before
    /// the mark stops being guaranteed (streaming sources only). Fails with
    /// an `Unsupported` I/O error if the source cannot checkpoint.
    pub fn mark(&mut self, read_ahead_limit: usize) -> Result<(), DecodeError> {
        let token = self.source.checkpoint(read_ahead_limit)?;
        log::debug!("checkpoint set after row {}", self.rows_decoded);
        self.checkpoint = Some(DecoderCheckpoint {
            token,
            lookahead: self.lookahead,
            rows_decoded: self.rows_decoded,
        });
        Ok(())
    }

    /// Rewind to the last [`mark`](Self::mark). The mark stays in place.
    pub fn reset(&mut self) -> Result<(), DecodeError> {
        let checkpoint = self.checkpoint.as_ref().ok_or(DecodeError::NoCheckpoint)?;
        self.source.rewind(&checkpoint.token)?;
        self.lookahead = checkpoint.lookahead;
        self.rows_decoded = checkpoint.rows_decoded;
        log::debug!("checkpoint restored at row {}", self.rows_decoded);
        Ok(())
    }
}

impl<R: CharSource, S: RecordStrategy> Iterator for RowDecoder<R, S> {
    type Item = Result<Row, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Decode rows lazily from `source`.
pub fn decode<R: CharSource, S: RecordStrategy>(
    source: R,
    strategy: S,
) -> Result<RowDecoder<R, S>, ConfigError> {
    RowDecoder::new(source, strategy)
}

/// Decode every row of an in-memory string.
pub fn decode_str<S: RecordStrategy>(text: &str, strategy: S) -> Result<Vec<Row>, DecodeError> {
    RowDecoder::new(StrSource::new(text), strategy)?.collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
