// Row encoder.
//
// Joins fields with the delimiter, passes each one through the strategy's
// `escape`, and terminates the row with the configured line separator.
// Each call stands alone; the only shared state is the configuration.
//
// `RowWriter` owns a sink and counts what went through it.

use std::io::{self, Write};

use thiserror::Error;

use super::strategy::{RecordStrategy, StandardStrategy};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// AsField
// ---------------------------------------------------------------------------

/// A value usable as one output cell. `None` marks an absent field.
pub trait AsField {
    fn as_field(&self) -> Option<&str>;
}

impl AsField for str {
    #[inline]
    fn as_field(&self) -> Option<&str> {
        Some(self)
    }
}

impl AsField for String {
    #[inline]
    fn as_field(&self) -> Option<&str> {
        Some(self)
    }
}

impl<T: AsRef<str>> AsField for Option<T> {
    #[inline]
    fn as_field(&self) -> Option<&str> {
        self.as_ref().map(AsRef::as_ref)
    }
}

impl<T: AsField + ?Sized> AsField for &T {
    #[inline]
    fn as_field(&self) -> Option<&str> {
        (**self).as_field()
    }
}

// ---------------------------------------------------------------------------
// RowEncoder
// ---------------------------------------------------------------------------

/// Renders rows of fields as terminated lines.
///
/// # Example
/// ```
/// use dsvcodec::dsv::{CodecConfig, RowEncoder, StandardStrategy};
///
/// let config = CodecConfig::builder().line_separator("\n").build().unwrap();
/// let encoder = RowEncoder::new(StandardStrategy::new(config));
/// let mut line = String::new();
/// encoder.encode_row(["a", "b,c", "say \"hi\""], &mut line);
/// assert_eq!(line, "a,\"b,c\",\"say \"\"hi\"\"\"\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RowEncoder<S: RecordStrategy = StandardStrategy> {
    strategy: S,
}

impl<S: RecordStrategy> RowEncoder<S> {
    pub fn new(strategy: S) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Append one terminated row to `out`.
    pub fn encode_row<I>(&self, fields: I, out: &mut String)
    where
        I: IntoIterator,
        I::Item: AsField,
    {
        let config = self.strategy.config();
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                out.push_str(config.delimiter());
            }
            out.push_str(&self.strategy.escape(field.as_field()));
        }
        out.push_str(config.line_separator());
    }

    /// Write one terminated row to `sink`. Returns the number of bytes written.
    pub fn write_row<W, I>(&self, sink: &mut W, fields: I) -> Result<usize, EncodeError>
    where
        W: Write + ?Sized,
        I: IntoIterator,
        I::Item: AsField,
    {
        let mut line = String::new();
        self.encode_row(fields, &mut line);
        sink.write_all(line.as_bytes())?;
        Ok(line.len())
    }
}

/// Write one row to `sink` with `strategy`.
pub fn encode_row<W, I, S>(fields: I, sink: &mut W, strategy: &S) -> Result<usize, EncodeError>
where
    W: Write + ?Sized,
    I: IntoIterator,
    I::Item: AsField,
    S: RecordStrategy,
{
    RowEncoder::new(strategy).write_row(sink, fields)
}

// ---------------------------------------------------------------------------
// RowWriter
// ---------------------------------------------------------------------------

/// Streams rows to an owned sink.
///
/// The writer never closes the sink; [`finish`](Self::finish) flushes it and
/// hands it back.
pub struct RowWriter<W: Write, S: RecordStrategy = StandardStrategy> {
    sink: W,
    encoder: RowEncoder<S>,
    rows_written: u64,
    bytes_written: u64,
    /// Reusable line buffer (cleared between rows).
    line: String,
}

impl<W: Write, S: RecordStrategy> RowWriter<W, S> {
    pub fn new(sink: W, strategy: S) -> Self {
        Self {
            sink,
            encoder: RowEncoder::new(strategy),
            rows_written: 0,
            bytes_written: 0,
            line: String::new(),
        }
    }

    /// Encode and write one row.
    pub fn write_row<I>(&mut self, fields: I) -> Result<(), EncodeError>
    where
        I: IntoIterator,
        I::Item: AsField,
    {
        self.line.clear();
        self.encoder.encode_row(fields, &mut self.line);
        self.sink.write_all(self.line.as_bytes())?;
        self.rows_written += 1;
        self.bytes_written += self.line.len() as u64;
        Ok(())
    }

    /// Write several rows in order.
    pub fn write_rows<I, R>(&mut self, rows: I) -> Result<(), EncodeError>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator,
        R::Item: AsField,
    {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Flush the sink and return it.
    pub fn finish(mut self) -> Result<W, EncodeError> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsv::config::{CodecConfig, CodecConfigBuilder};

    fn strategy(build: impl FnOnce(CodecConfigBuilder) -> CodecConfigBuilder) -> StandardStrategy {
        let config = build(CodecConfig::builder().line_separator("\r\n"))
            .build()
            .unwrap();
        StandardStrategy::new(config)
    }

    fn line<I>(s: &StandardStrategy, fields: I) -> String
    where
        I: IntoIterator,
        I::Item: AsField,
    {
        let mut out = String::new();
        RowEncoder::new(s).encode_row(fields, &mut out);
        out
    }

    #[test]
    fn joins_with_delimiter() {
        let s = strategy(|b| b);
        assert_eq!(line(&s, ["abc", "def", "ghi"]), "abc,def,ghi\r\n");
    }

    #[test]
    fn empty_row_is_just_separator() {
        let s = strategy(|b| b);
        let none: [&str; 0] = [];
        assert_eq!(line(&s, none), "\r\n");
    }

    #[test]
    fn escapes_each_field() {
        let s = strategy(|b| b);
        assert_eq!(
            line(&s, ["abc", "de,f", "gh\"ijk", "l\r\nm"]),
            "abc,\"de,f\",\"gh\"\"ijk\",\"l\r\nm\"\r\n"
        );
    }

    #[test]
    fn null_fields_use_placeholder() {
        let s = strategy(|b| b.null_string("\\N"));
        assert_eq!(line(&s, [Some("a"), None, Some("")]), "a,\\N,\r\n");
        let q = strategy(|b| b.null_string("\\N").always_quote(true));
        assert_eq!(
            line(&q, [Some("a"), None, Some("")]),
            "\"a\",\"\\N\",\"\"\r\n"
        );
    }

    #[test]
    fn accepts_owned_and_borrowed_cells() {
        let s = strategy(|b| b);
        let owned = vec!["x".to_string(), "y".to_string()];
        assert_eq!(line(&s, &owned), "x,y\r\n");
        assert_eq!(line(&s, owned.iter().map(String::as_str)), "x,y\r\n");
        let maybe: Vec<Option<String>> = vec![Some("x".into()), None];
        assert_eq!(line(&s, &maybe), "x,\r\n");
    }

    #[test]
    fn multi_char_delimiter() {
        let s = strategy(|b| b.delimiter("##"));
        assert_eq!(line(&s, ["abc", "de##f", "g#h"]), "abc##\"de##f\"##g#h\r\n");
    }

    #[test]
    fn write_row_reports_bytes() {
        let s = strategy(|b| b);
        let mut sink = Vec::new();
        let n = encode_row(["a", "b"], &mut sink, &s).unwrap();
        assert_eq!(n, 5);
        assert_eq!(sink, b"a,b\r\n");
    }

    #[test]
    fn row_writer_counts() {
        let s = strategy(|b| b.delimiter("\t"));
        let mut w = RowWriter::new(Vec::new(), s);
        w.write_rows([vec!["a", "b"], vec!["c\td"]]).unwrap();
        assert_eq!(w.rows_written(), 2);
        assert_eq!(w.bytes_written(), 12);
        let out = w.finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a\tb\r\n\"c\td\"\r\n");
    }

    #[test]
    fn sink_error_propagates() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("disk full"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let mut w = RowWriter::new(Broken, StandardStrategy::default());
        assert!(matches!(w.write_row(["a"]), Err(EncodeError::Io(_))));
        assert_eq!(w.rows_written(), 0);
    }
}
