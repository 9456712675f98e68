// Codec configuration.
//
// A `CodecConfig` is built once, validated once, and never mutated while a
// codec uses it. Derived values (the quoted null placeholder, the delimiter
// length in characters) are computed eagerly at build time.

use thiserror::Error;

/// The quote character. Fixed, not configurable.
pub const QUOTE: char = '"';

/// Characters that may never appear inside a delimiter.
pub const RESERVED_CHARS: [char; 3] = [QUOTE, '\r', '\n'];

/// Default field delimiter.
pub const DEFAULT_DELIMITER: &str = ",";

/// Default line separator for encoded output (platform newline).
#[cfg(windows)]
pub const DEFAULT_LINE_SEPARATOR: &str = "\r\n";
/// Default line separator for encoded output (platform newline).
#[cfg(not(windows))]
pub const DEFAULT_LINE_SEPARATOR: &str = "\n";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Invalid codec configuration. Raised at construction, never mid-stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("delimiter must not be empty")]
    EmptyDelimiter,
    #[error("delimiter {delimiter:?} contains reserved character {ch:?}")]
    ReservedCharacter { delimiter: String, ch: char },
}

/// Check that `delimiter` is non-empty and free of reserved characters.
pub fn validate_delimiter(delimiter: &str) -> Result<(), ConfigError> {
    if delimiter.is_empty() {
        return Err(ConfigError::EmptyDelimiter);
    }
    if let Some(ch) = delimiter.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(ConfigError::ReservedCharacter {
            delimiter: delimiter.to_string(),
            ch,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CodecConfig
// ---------------------------------------------------------------------------

/// Immutable configuration shared by the row encoder and decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    delimiter: String,
    delimiter_chars: usize,
    line_separator: String,
    null_string: String,
    quoted_null: String,
    always_quote: bool,
}

impl CodecConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> CodecConfigBuilder {
        CodecConfigBuilder::default()
    }

    /// Start a new builder pre-filled with this configuration's values.
    pub fn to_builder(&self) -> CodecConfigBuilder {
        CodecConfigBuilder {
            delimiter: self.delimiter.clone(),
            line_separator: self.line_separator.clone(),
            null_string: self.null_string.clone(),
            always_quote: self.always_quote,
        }
    }

    /// Field delimiter (non-empty, may be several characters).
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Delimiter length in characters (not bytes).
    pub fn delimiter_chars(&self) -> usize {
        self.delimiter_chars
    }

    /// Row terminator written after each encoded row.
    pub fn line_separator(&self) -> &str {
        &self.line_separator
    }

    /// Placeholder written for absent fields.
    pub fn null_string(&self) -> &str {
        &self.null_string
    }

    /// The null placeholder wrapped in quote characters.
    pub fn quoted_null(&self) -> &str {
        &self.quoted_null
    }

    /// Whether every field is quoted on output.
    pub fn always_quote(&self) -> bool {
        self.always_quote
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfigBuilder::default().assemble()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`CodecConfig`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct CodecConfigBuilder {
    delimiter: String,
    line_separator: String,
    null_string: String,
    always_quote: bool,
}

impl Default for CodecConfigBuilder {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            line_separator: DEFAULT_LINE_SEPARATOR.to_string(),
            null_string: String::new(),
            always_quote: false,
        }
    }
}

impl CodecConfigBuilder {
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn line_separator(mut self, line_separator: impl Into<String>) -> Self {
        self.line_separator = line_separator.into();
        self
    }

    pub fn null_string(mut self, null_string: impl Into<String>) -> Self {
        self.null_string = null_string.into();
        self
    }

    pub fn always_quote(mut self, always_quote: bool) -> Self {
        self.always_quote = always_quote;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<CodecConfig, ConfigError> {
        validate_delimiter(&self.delimiter)?;
        Ok(self.assemble())
    }

    fn assemble(self) -> CodecConfig {
        let quoted_null = format!("{QUOTE}{}{QUOTE}", self.null_string);
        CodecConfig {
            delimiter_chars: self.delimiter.chars().count(),
            delimiter: self.delimiter,
            line_separator: self.line_separator,
            null_string: self.null_string,
            quoted_null,
            always_quote: self.always_quote,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
