//! Dsvcodec: delimiter-separated values (CSV, TSV and friends) in Rust.
//!
//! The crate provides:
//! - A streaming row decoder and encoder with arbitrary multi-character
//!   delimiters and pluggable field escaping (`dsv`)
//! - File-oriented helpers with gzip/xz detection (`io`)
//! - Non-UTF-8 file charsets such as Shift_JIS (`charset`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use dsvcodec::dsv::{self, CodecConfig, RowEncoder, StandardStrategy};
//!
//! let config = CodecConfig::builder().line_separator("\n").build().unwrap();
//! let strategy = StandardStrategy::new(config);
//!
//! let mut text = String::new();
//! let encoder = RowEncoder::new(&strategy);
//! encoder.encode_row(["id", "comment"], &mut text);
//! encoder.encode_row(["1", "says \"hi\", twice"], &mut text);
//!
//! let rows = dsv::decode_str(&text, &strategy).unwrap();
//! assert_eq!(rows[1], vec!["1", "says \"hi\", twice"]);
//! ```

pub mod charset;
pub mod dsv;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;
