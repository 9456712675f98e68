// File-level helpers for reading and writing delimited files.
//
// `read_file()` and `write_file()` wrap the row decoder/encoder with buffered
// file I/O. Compression is picked from the file extension (`.gz` via flate2,
// `.xz` via lzma-rs, each behind its own feature). The `*_with` variants take
// a `Charset` for files that are not UTF-8. When `file-io` is enabled a
// SHA-256 of the UTF-8 text is computed while the data streams through.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::warn;
#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::charset::{Charset, EncodingWriter};
use crate::dsv::{
    AsField, ConfigError, DecodeError, EncodeError, ReaderSource, RecordStrategy, Row, RowDecoder,
    RowWriter,
};

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

/// Container format wrapped around the delimited text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Xz,
}

impl Compression {
    /// Guess the compression from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("gz") => Self::Gzip,
            Some("xz") => Self::Xz,
            _ => Self::None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Xz => "xz",
        }
    }

    /// Whether this build can read and write the format.
    pub fn is_available(self) -> bool {
        match self {
            Self::None => true,
            Self::Gzip => cfg!(feature = "gzip"),
            Self::Xz => cfg!(feature = "xz"),
        }
    }
}

fn unsupported(compression: Compression) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!(
            "{} support not compiled in (enable the `{}` feature)",
            compression.name(),
            compression.name()
        ),
    )
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `read_file()`.
#[derive(Debug, Clone)]
pub struct ReadStats {
    /// Rows decoded.
    pub rows: u64,
    /// Fields across all rows.
    pub fields: u64,
    /// Field count of the widest row.
    pub max_width: usize,
    /// UTF-8 text bytes read (after decompression and transcoding).
    pub bytes: u64,
    pub compression: Compression,
    pub charset: Charset,
    /// SHA-256 of the UTF-8 text (if `file-io` feature is enabled).
    pub sha256: Option<[u8; 32]>,
}

/// Statistics returned by `write_file()`.
#[derive(Debug, Clone)]
pub struct WriteStats {
    /// Rows written.
    pub rows: u64,
    /// UTF-8 text bytes written (before transcoding and compression).
    pub bytes: u64,
    pub compression: Compression,
    pub charset: Charset,
    /// SHA-256 of the UTF-8 text (if `file-io` feature is enabled).
    pub sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file I/O operations.
#[derive(Debug)]
pub enum IoError {
    /// I/O error (file open, read, write, decompression).
    Io(io::Error),
    /// Invalid codec configuration.
    Config(ConfigError),
    /// Row decoding error.
    Decode(DecodeError),
    /// Row encoding error.
    Encode(EncodeError),
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Config(e) => write!(f, "configuration error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
            Self::Encode(e) => write!(f, "encode error: {e}"),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Decode(e) => Some(e),
            Self::Encode(e) => Some(e),
        }
    }
}

impl From<io::Error> for IoError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ConfigError> for IoError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<DecodeError> for IoError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

impl From<EncodeError> for IoError {
    fn from(e: EncodeError) -> Self {
        Self::Encode(e)
    }
}

// ---------------------------------------------------------------------------
// read_file
// ---------------------------------------------------------------------------

/// Decode every row of the UTF-8 file at `path`.
///
/// The file is streamed through a `ReaderSource`; only the decoded rows are
/// held in memory (xz input is decompressed up front).
pub fn read_file<S: RecordStrategy>(
    path: &Path,
    strategy: S,
) -> Result<(Vec<Row>, ReadStats), IoError> {
    read_file_with(path, strategy, Charset::utf8())
}

/// Decode every row of the file at `path`, stored in `charset`.
pub fn read_file_with<S: RecordStrategy>(
    path: &Path,
    strategy: S,
    charset: Charset,
) -> Result<(Vec<Row>, ReadStats), IoError> {
    let mut rows = Vec::new();
    let stats = decode_file(path, strategy, charset, |row| rows.push(row))?;
    Ok((rows, stats))
}

/// Count the rows of the file at `path` without keeping them.
pub fn scan_file<S: RecordStrategy>(
    path: &Path,
    strategy: S,
    charset: Charset,
) -> Result<ReadStats, IoError> {
    decode_file(path, strategy, charset, drop)
}

fn decode_file<S, F>(
    path: &Path,
    strategy: S,
    charset: Charset,
    mut on_row: F,
) -> Result<ReadStats, IoError>
where
    S: RecordStrategy,
    F: FnMut(Row),
{
    let compression = Compression::from_path(path);
    let reader = Tally::new(charset.decode_reader(open_reader(path, compression)?));
    let source = ReaderSource::with_capacity(BUF_SIZE, reader);
    let mut decoder = RowDecoder::new(source, strategy)?;

    let mut fields = 0u64;
    let mut max_width = 0usize;
    while let Some(row) = decoder.next_row()? {
        fields += row.len() as u64;
        max_width = max_width.max(row.len());
        on_row(row);
    }

    let rows = decoder.rows_decoded();
    let (_, bytes, sha256) = decoder.into_source().into_inner().finish();
    Ok(ReadStats {
        rows,
        fields,
        max_width,
        bytes,
        compression,
        charset,
        sha256,
    })
}

/// Open the UTF-8 file at `path` for row-by-row decoding.
pub fn open_rows<S: RecordStrategy>(
    path: &Path,
    strategy: S,
) -> Result<RowDecoder<ReaderSource<Box<dyn Read>>, S>, IoError> {
    open_rows_with(path, strategy, Charset::utf8())
}

/// Open the file at `path`, stored in `charset`, for row-by-row decoding.
pub fn open_rows_with<S: RecordStrategy>(
    path: &Path,
    strategy: S,
    charset: Charset,
) -> Result<RowDecoder<ReaderSource<Box<dyn Read>>, S>, IoError> {
    let reader = charset.decode_reader(open_reader(path, Compression::from_path(path))?);
    let source = ReaderSource::with_capacity(BUF_SIZE, reader);
    Ok(RowDecoder::new(source, strategy)?)
}

/// Decode several files concurrently, one independent decoder per file.
///
/// Results come back in the order of `paths`.
#[cfg(feature = "parallel")]
pub fn read_files<P, S>(paths: &[P], strategy: &S) -> Vec<Result<(Vec<Row>, ReadStats), IoError>>
where
    P: AsRef<Path> + Sync,
    S: RecordStrategy + Sync,
{
    use rayon::prelude::*;

    paths
        .par_iter()
        .map(|p| read_file(p.as_ref(), strategy))
        .collect()
}

fn open_reader(path: &Path, compression: Compression) -> io::Result<Box<dyn Read>> {
    let file = File::open(path)?;
    match compression {
        Compression::None => Ok(Box::new(file)),
        #[cfg(feature = "gzip")]
        Compression::Gzip => {
            log::debug!("opening gzip stream {}", path.display());
            let inner = BufReader::with_capacity(BUF_SIZE, file);
            Ok(Box::new(flate2::read::MultiGzDecoder::new(inner)))
        }
        #[cfg(feature = "xz")]
        Compression::Xz => {
            log::debug!("opening xz stream {}", path.display());
            let mut input = BufReader::with_capacity(BUF_SIZE, file);
            let mut plain = Vec::new();
            lzma_rs::xz_decompress(&mut input, &mut plain).map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("xz decompression failed: {e}"))
            })?;
            Ok(Box::new(io::Cursor::new(plain)))
        }
        #[allow(unreachable_patterns)]
        other => Err(unsupported(other)),
    }
}

// ---------------------------------------------------------------------------
// write_file
// ---------------------------------------------------------------------------

/// Write `rows` to `path` as UTF-8, padding short rows with empty fields so
/// every row has the width of the widest one.
pub fn write_file<R, F, S>(rows: &[R], path: &Path, strategy: S) -> Result<WriteStats, IoError>
where
    R: AsRef<[F]>,
    F: AsField,
    S: RecordStrategy,
{
    write_file_with(rows, path, strategy, Charset::utf8())
}

/// Like `write_file()`, storing the text in `charset`.
///
/// A character `charset` cannot represent fails the write with
/// `io::ErrorKind::InvalidData`.
pub fn write_file_with<R, F, S>(
    rows: &[R],
    path: &Path,
    strategy: S,
    charset: Charset,
) -> Result<WriteStats, IoError>
where
    R: AsRef<[F]>,
    F: AsField,
    S: RecordStrategy,
{
    if !charset.can_encode() {
        return Err(charset.write_unsupported().into());
    }
    let width = rows.iter().map(|r| r.as_ref().len()).max().unwrap_or(0);
    let short = rows.iter().filter(|r| r.as_ref().len() < width).count();
    if short > 0 {
        warn!(
            "padding {short} of {} rows to {width} fields in {}",
            rows.len(),
            path.display()
        );
    }

    let compression = Compression::from_path(path);
    let sink = Tally::new(EncodingWriter::new(Sink::create(path, compression)?, charset));
    let mut writer = RowWriter::new(sink, strategy);
    for row in rows {
        let row = row.as_ref();
        let padding = std::iter::repeat_n(Some(""), width - row.len());
        writer.write_row(row.iter().map(AsField::as_field).chain(padding))?;
    }

    let rows_written = writer.rows_written();
    let (sink, bytes, sha256) = writer.finish()?.finish();
    sink.into_inner()?.finish()?;

    Ok(WriteStats {
        rows: rows_written,
        bytes,
        compression,
        charset,
        sha256,
    })
}

/// Output file, optionally behind a compressor.
enum Sink {
    Plain(BufWriter<File>),
    #[cfg(feature = "gzip")]
    Gzip(flate2::write::GzEncoder<BufWriter<File>>),
    /// lzma-rs compresses whole buffers, so xz output is staged in memory.
    #[cfg(feature = "xz")]
    Xz {
        staged: Vec<u8>,
        file: BufWriter<File>,
    },
}

impl Sink {
    fn create(path: &Path, compression: Compression) -> io::Result<Self> {
        if !compression.is_available() {
            return Err(unsupported(compression));
        }
        let file = BufWriter::with_capacity(BUF_SIZE, File::create(path)?);
        match compression {
            #[cfg(feature = "gzip")]
            Compression::Gzip => {
                log::debug!("writing gzip stream {}", path.display());
                Ok(Self::Gzip(flate2::write::GzEncoder::new(
                    file,
                    flate2::Compression::default(),
                )))
            }
            #[cfg(feature = "xz")]
            Compression::Xz => {
                log::debug!("writing xz stream {}", path.display());
                Ok(Self::Xz {
                    staged: Vec::new(),
                    file,
                })
            }
            _ => Ok(Self::Plain(file)),
        }
    }

    fn finish(self) -> io::Result<()> {
        match self {
            Self::Plain(mut file) => file.flush(),
            #[cfg(feature = "gzip")]
            Self::Gzip(encoder) => encoder.finish()?.flush(),
            #[cfg(feature = "xz")]
            Self::Xz { staged, mut file } => {
                lzma_rs::xz_compress(&mut io::Cursor::new(&staged[..]), &mut file)?;
                file.flush()
            }
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(file) => file.write(buf),
            #[cfg(feature = "gzip")]
            Self::Gzip(encoder) => encoder.write(buf),
            #[cfg(feature = "xz")]
            Self::Xz { staged, .. } => staged.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(file) => file.flush(),
            #[cfg(feature = "gzip")]
            Self::Gzip(encoder) => encoder.flush(),
            #[cfg(feature = "xz")]
            Self::Xz { .. } => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Byte tally (counts, and hashes with the file-io feature)
// ---------------------------------------------------------------------------

struct Tally<T> {
    inner: T,
    bytes: u64,
    #[cfg(feature = "file-io")]
    hasher: sha2::Sha256,
}

impl<T> Tally<T> {
    fn new(inner: T) -> Self {
        Self {
            inner,
            bytes: 0,
            #[cfg(feature = "file-io")]
            hasher: sha2::Sha256::new(),
        }
    }

    fn record(&mut self, data: &[u8]) {
        self.bytes += data.len() as u64;
        #[cfg(feature = "file-io")]
        self.hasher.update(data);
    }

    fn finish(self) -> (T, u64, Option<[u8; 32]>) {
        #[cfg(feature = "file-io")]
        let digest = Some(self.hasher.finalize().into());
        #[cfg(not(feature = "file-io"))]
        let digest: Option<[u8; 32]> = None;
        (self.inner, self.bytes, digest)
    }
}

impl<R: Read> Read for Tally<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.record(&buf[..n]);
        Ok(n)
    }
}

impl<W: Write> Write for Tally<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.record(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
