// Record strategies.
//
// A strategy bundles a configuration with the field escape/unescape rules.
// The row encoder and decoder call fields through this trait, so a custom
// escaping scheme plugs in without touching the state machine.
//
// Built-in choices form a closed set selected by a tagged value (`Dialect`):
//   - `csv`: comma-delimited, standard quoting
//   - `tsv`: tab-delimited, standard quoting

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use super::config::CodecConfig;
use super::field;

// ---------------------------------------------------------------------------
// RecordStrategy trait
// ---------------------------------------------------------------------------

/// Field-level encoding rules plus the configuration they apply to.
///
/// # Implementing a custom strategy
///
/// ```
/// use std::borrow::Cow;
/// use dsvcodec::dsv::{CodecConfig, RecordStrategy};
///
/// /// Writes every field verbatim and never unquotes.
/// struct Verbatim(CodecConfig);
///
/// impl RecordStrategy for Verbatim {
///     fn config(&self) -> &CodecConfig { &self.0 }
///     fn escape<'a>(&'a self, field: Option<&'a str>) -> Cow<'a, str> {
///         Cow::Borrowed(field.unwrap_or(self.0.null_string()))
///     }
///     fn unescape<'a>(&self, raw: &'a str) -> Cow<'a, str> {
///         Cow::Borrowed(raw)
///     }
/// }
/// ```
pub trait RecordStrategy {
    /// Delimiter, line separator and null handling in effect.
    fn config(&self) -> &CodecConfig;

    /// Render one field (`None` = absent) in its on-the-wire form.
    fn escape<'a>(&'a self, field: Option<&'a str>) -> Cow<'a, str>;

    /// Recover a field value from one already-separated raw cell.
    fn unescape<'a>(&self, raw: &'a str) -> Cow<'a, str>;
}

impl<S: RecordStrategy + ?Sized> RecordStrategy for &S {
    fn config(&self) -> &CodecConfig {
        (**self).config()
    }

    fn escape<'a>(&'a self, field: Option<&'a str>) -> Cow<'a, str> {
        (**self).escape(field)
    }

    fn unescape<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        (**self).unescape(raw)
    }
}

// ---------------------------------------------------------------------------
// Standard strategy
// ---------------------------------------------------------------------------

/// Quote-when-needed escaping with doubled inner quotes and forgiving decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandardStrategy {
    config: CodecConfig,
}

impl StandardStrategy {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }
}

impl From<CodecConfig> for StandardStrategy {
    fn from(config: CodecConfig) -> Self {
        Self::new(config)
    }
}

impl RecordStrategy for StandardStrategy {
    fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn escape<'a>(&'a self, field: Option<&'a str>) -> Cow<'a, str> {
        field::escape_field(&self.config, field)
    }

    fn unescape<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        field::unescape_field(raw)
    }
}

// ---------------------------------------------------------------------------
// Dialect
// ---------------------------------------------------------------------------

/// Named preset selecting a built-in strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dialect {
    #[default]
    Csv,
    Tsv,
}

impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Csv, Dialect::Tsv];

    pub fn name(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
        }
    }

    pub fn delimiter(self) -> &'static str {
        match self {
            Self::Csv => ",",
            Self::Tsv => "\t",
        }
    }

    /// Default configuration for this dialect.
    pub fn config(self) -> CodecConfig {
        // Preset delimiters are always valid.
        CodecConfig::builder()
            .delimiter(self.delimiter())
            .build()
            .unwrap_or_default()
    }

    pub fn strategy(self) -> StandardStrategy {
        StandardStrategy::new(self.config())
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognised dialect name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dialect {0:?} (expected one of: csv, tsv)")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" | "standard" => Ok(Self::Csv),
            "tsv" | "tab" => Ok(Self::Tsv),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
