// Character sets for delimited files.
//
// Rows are always Rust strings; a `Charset` only changes the bytes on disk.
// Input is transcoded to UTF-8 by encoding_rs_io before it reaches
// `ReaderSource`. Output rows are transcoded with encoding_rs, and a character
// the target charset cannot represent is an error rather than a substitution.
//
// UTF-8 input is passed through untouched, so malformed bytes still surface
// as decode errors. Other charsets replace malformed sequences with U+FFFD.

use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

use encoding_rs::Encoding;
use encoding_rs_io::DecodeReaderBytesBuilder;

/// Character set of a delimited file, looked up by WHATWG label
/// (`utf-8`, `shift_jis`, `ms932`, `euc-jp`, `windows-1252`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

impl Charset {
    pub fn utf8() -> Self {
        Self(encoding_rs::UTF_8)
    }

    pub fn for_label(label: &str) -> Result<Self, UnknownCharset> {
        match Encoding::for_label(label.trim().as_bytes()) {
            Some(enc) if enc != encoding_rs::REPLACEMENT => Ok(Self(enc)),
            _ => Err(UnknownCharset(label.to_string())),
        }
    }

    /// Canonical name (`UTF-8`, `Shift_JIS`, ...).
    pub fn name(self) -> &'static str {
        self.0.name()
    }

    pub fn is_utf8(self) -> bool {
        self.0 == encoding_rs::UTF_8
    }

    /// Whether text can be written in this charset. UTF-16 is read-only.
    pub fn can_encode(self) -> bool {
        self.0.output_encoding() == self.0
    }

    /// Wrap `reader` so it yields UTF-8.
    pub(crate) fn decode_reader(self, reader: Box<dyn Read>) -> Box<dyn Read> {
        if self.is_utf8() {
            return reader;
        }
        Box::new(
            DecodeReaderBytesBuilder::new()
                .encoding(Some(self.0))
                .build(reader),
        )
    }

    pub(crate) fn write_unsupported(self) -> io::Error {
        io::Error::new(
            io::ErrorKind::Unsupported,
            format!("cannot write {} output", self.name()),
        )
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::utf8()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognised charset label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown or unsupported charset {0:?}")]
pub struct UnknownCharset(pub String);

impl FromStr for Charset {
    type Err = UnknownCharset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::for_label(s)
    }
}

// ---------------------------------------------------------------------------
// Output transcoding
// ---------------------------------------------------------------------------

/// `Write` adapter that takes UTF-8 and writes the target charset.
///
/// A UTF-8 sequence split across two writes is held back until it completes.
pub(crate) struct EncodingWriter<W> {
    inner: W,
    encoding: &'static Encoding,
    pending: Vec<u8>,
}

impl<W: Write> EncodingWriter<W> {
    pub(crate) fn new(inner: W, charset: Charset) -> Self {
        Self {
            inner,
            encoding: charset.0,
            pending: Vec::new(),
        }
    }

    pub(crate) fn into_inner(self) -> io::Result<W> {
        if !self.pending.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "incomplete UTF-8 sequence at end of output",
            ));
        }
        Ok(self.inner)
    }
}

impl<W: Write> Write for EncodingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        let complete = match std::str::from_utf8(&self.pending) {
            Ok(text) => text.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                self.pending.clear();
                return Err(io::Error::new(io::ErrorKind::InvalidData, e));
            }
        };
        if complete == 0 {
            return Ok(buf.len());
        }

        let text = std::str::from_utf8(&self.pending[..complete])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let encoding = self.encoding;
        let (bytes, _, unmappable) = encoding.encode(text);
        if unmappable {
            let ch = text
                .chars()
                .find(|c| encoding.encode(c.encode_utf8(&mut [0u8; 4])).2)
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            self.pending.clear();
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("character {ch:?} cannot be encoded as {}", encoding.name()),
            ));
        }
        self.inner.write_all(&bytes)?;
        drop(bytes);
        self.pending.drain(..complete);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
