// Delimiter-separated-values codec.
//
// - `config`   : CodecConfig and its builder
// - `matcher`  : sliding-window delimiter matcher
// - `field`    : single-field escape/unescape
// - `strategy` : pluggable escaping rules plus built-in dialects
// - `source`   : character sources with optional checkpoints
// - `decoder`  : RowDecoder state machine with mark/reset
// - `encoder`  : RowEncoder and the streaming RowWriter

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod field;
pub mod matcher;
pub mod source;
pub mod strategy;

pub use config::{CodecConfig, CodecConfigBuilder, ConfigError, QUOTE};
pub use decoder::{DecodeError, Row, RowDecoder, decode, decode_str};
pub use encoder::{AsField, EncodeError, RowEncoder, RowWriter, encode_row};
pub use field::{FieldTraits, escape_field, unescape_field};
pub use matcher::DelimiterMatcher;
pub use source::{CharSource, ReaderMark, ReaderSource, StrSource};
pub use strategy::{Dialect, RecordStrategy, StandardStrategy, UnknownDialect};
