// Field codec: one value to its wire form and back.
//
// Encoding quotes a field when it holds the quote character, CR, LF or the
// delimiter (or when always-quote is set), doubling every inner quote.
// Decoding strips one pair of outer quotes and collapses doubled quotes.
// Decoding is forgiving: a cell whose first and last characters are not both
// quotes is returned untouched, so malformed input passes through literally.

use std::borrow::Cow;

use bitflags::bitflags;

use super::config::{CodecConfig, QUOTE};

const ESCAPED_QUOTE: &str = "\"\"";
const QUOTE_STR: &str = "\"";

bitflags! {
    /// Characters found in a field value that affect how it is written.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldTraits: u8 {
        const QUOTE = 0b0000_0001;
        const CR = 0b0000_0010;
        const LF = 0b0000_0100;
        const DELIMITER = 0b0000_1000;
    }
}

impl FieldTraits {
    /// Whether any of the found characters forces quoting.
    #[inline]
    pub fn needs_quoting(self) -> bool {
        !self.is_empty()
    }
}

/// Scan `value` for the characters that force quoting.
pub fn scan(value: &str, delimiter: &str) -> FieldTraits {
    let mut traits = FieldTraits::empty();
    for c in value.chars() {
        match c {
            QUOTE => traits |= FieldTraits::QUOTE,
            '\r' => traits |= FieldTraits::CR,
            '\n' => traits |= FieldTraits::LF,
            _ => {}
        }
    }
    if value.contains(delimiter) {
        traits |= FieldTraits::DELIMITER;
    }
    traits
}

/// Render one field for output.
///
/// `None` is the absent marker and renders as the configured null string.
pub fn escape_field<'a>(config: &'a CodecConfig, field: Option<&'a str>) -> Cow<'a, str> {
    let value = match field {
        None if config.always_quote() => return Cow::Borrowed(config.quoted_null()),
        None => return Cow::Borrowed(config.null_string()),
        Some(v) => v,
    };

    if value.is_empty() {
        return if config.always_quote() {
            Cow::Borrowed(ESCAPED_QUOTE)
        } else {
            Cow::Borrowed("")
        };
    }

    let traits = scan(value, config.delimiter());
    if !config.always_quote() && !traits.needs_quoting() {
        return Cow::Borrowed(value);
    }

    // A value containing a quote always lands here, so doubled quotes are
    // never emitted without the surrounding pair.
    let mut out = String::with_capacity(value.len() + 2);
    out.push(QUOTE);
    if traits.contains(FieldTraits::QUOTE) {
        out.push_str(&value.replace(QUOTE_STR, ESCAPED_QUOTE));
    } else {
        out.push_str(value);
    }
    out.push(QUOTE);
    Cow::Owned(out)
}

/// Recover a field value from its raw cell text.
pub fn unescape_field(raw: &str) -> Cow<'_, str> {
    let mut chars = raw.chars();
    let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
        // Zero or one character: cannot have been quoted.
        return Cow::Borrowed(raw);
    };
    if first != QUOTE || last != QUOTE {
        return Cow::Borrowed(raw);
    }

    let inner = &raw[1..raw.len() - 1];
    if inner.contains(ESCAPED_QUOTE) {
        Cow::Owned(inner.replace(ESCAPED_QUOTE, QUOTE_STR))
    } else {
        Cow::Borrowed(inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CodecConfig {
        CodecConfig::default()
    }

    fn quoting() -> CodecConfig {
        CodecConfig::builder().always_quote(true).build().unwrap()
    }

    #[test]
    fn plain_value_untouched() {
        let c = config();
        let out = escape_field(&c, Some("abc"));
        assert_eq!(out, "abc");
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn null_uses_placeholder() {
        let c = CodecConfig::builder().null_string("NULL").build().unwrap();
        assert_eq!(escape_field(&c, None), "NULL");
        let q = c.to_builder().always_quote(true).build().unwrap();
        assert_eq!(escape_field(&q, None), "\"NULL\"");
        assert_eq!(escape_field(&config(), None), "");
        assert_eq!(escape_field(&quoting(), None), "\"\"");
    }

    #[test]
    fn empty_value() {
        assert_eq!(escape_field(&config(), Some("")), "");
        assert_eq!(escape_field(&quoting(), Some("")), "\"\"");
    }

    #[test]
    fn special_characters_force_quoting() {
        let c = config();
        assert_eq!(escape_field(&c, Some("de,f")), "\"de,f\"");
        assert_eq!(escape_field(&c, Some("gh\"ijk")), "\"gh\"\"ijk\"");
        assert_eq!(escape_field(&c, Some("a\r\nb")), "\"a\r\nb\"");
        assert_eq!(escape_field(&c, Some("a\rb")), "\"a\rb\"");
        assert_eq!(escape_field(&c, Some("a\nb")), "\"a\nb\"");
    }

    #[test]
    fn always_quote_wraps_everything() {
        let c = quoting();
        assert_eq!(escape_field(&c, Some("abc")), "\"abc\"");
        assert_eq!(escape_field(&c, Some("a\"b")), "\"a\"\"b\"");
    }

    #[test]
    fn multi_char_delimiter_substring() {
        let c = CodecConfig::builder().delimiter("##").build().unwrap();
        assert_eq!(escape_field(&c, Some("a#b")), "a#b");
        assert_eq!(escape_field(&c, Some("a##b")), "\"a##b\"");
        assert_eq!(escape_field(&c, Some("a,b")), "a,b");
    }

    #[test]
    fn scan_reports_each_trait() {
        assert_eq!(scan("plain", ","), FieldTraits::empty());
        assert_eq!(scan("a\"b", ","), FieldTraits::QUOTE);
        assert_eq!(
            scan("a\r\n,b", ","),
            FieldTraits::CR | FieldTraits::LF | FieldTraits::DELIMITER
        );
        assert!(scan("x\ty", "\t").needs_quoting());
    }

    #[test]
    fn unescape_short_cells_unchanged() {
        assert_eq!(unescape_field(""), "");
        assert_eq!(unescape_field("\""), "\"");
        assert_eq!(unescape_field("a"), "a");
    }

    #[test]
    fn unescape_strips_quotes() {
        assert_eq!(unescape_field("\"\""), "");
        assert_eq!(unescape_field("\"abc\""), "abc");
        assert_eq!(unescape_field("\"gh\"\"ijk\""), "gh\"ijk");
        assert_eq!(unescape_field("\"\"\"\""), "\"");
    }

    #[test]
    fn unescape_malformed_passes_through() {
        assert_eq!(unescape_field("\"def\"ghi"), "\"def\"ghi");
        assert_eq!(unescape_field("ab\"\"c"), "ab\"\"c");
        assert_eq!(unescape_field("abc\""), "abc\"");
    }

    #[test]
    fn unescape_non_ascii() {
        assert_eq!(unescape_field("\"えお\rかき\""), "えお\rかき");
        assert_eq!(unescape_field("あ"), "あ");
    }

    #[test]
    fn round_trip_safe_values() {
        let c = config();
        for v in ["", "abc", "a b c", "あいう", "x;y", "tab\there"] {
            assert_eq!(unescape_field(&escape_field(&c, Some(v))), v);
        }
        let q = quoting();
        for v in ["", "abc", "a,b", "a\"b", "line\nbreak"] {
            assert_eq!(unescape_field(&escape_field(&q, Some(v))), v);
        }
    }
}
