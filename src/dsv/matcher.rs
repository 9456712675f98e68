// Sliding delimiter matcher.
//
// Keeps the last N characters seen (N = delimiter length in characters) and
// reports whether they spell the delimiter. Each `feed` shifts the window
// left by one and appends the new character, O(N) per character.
//
// Only a window holding N characters fed since the last reset can match.

use super::config::{self, ConfigError};

/// Rolling window over the most recent characters of a stream.
#[derive(Debug, Clone)]
pub struct DelimiterMatcher {
    delimiter: Box<[char]>,
    window: Box<[char]>,
    filled: usize,
}

impl DelimiterMatcher {
    /// Build a matcher for `delimiter`.
    ///
    /// Fails if the delimiter is empty or contains the quote character,
    /// CR or LF.
    pub fn new(delimiter: &str) -> Result<Self, ConfigError> {
        config::validate_delimiter(delimiter)?;
        let delimiter: Box<[char]> = delimiter.chars().collect();
        let window = vec!['\0'; delimiter.len()].into_boxed_slice();
        Ok(Self {
            delimiter,
            window,
            filled: 0,
        })
    }

    /// Window width in characters.
    #[inline]
    pub fn width(&self) -> usize {
        self.delimiter.len()
    }

    /// Shift the window by one character.
    #[inline]
    pub fn feed(&mut self, c: char) {
        let last = self.window.len() - 1;
        self.window.copy_within(1.., 0);
        self.window[last] = c;
        if self.filled < self.window.len() {
            self.filled += 1;
        }
    }

    /// True iff the window currently spells the delimiter.
    #[inline]
    pub fn is_match(&self) -> bool {
        self.filled == self.window.len() && self.window == self.delimiter
    }

    /// Forget every character seen so far.
    #[inline]
    pub fn reset(&mut self) {
        self.filled = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_str(m: &mut DelimiterMatcher, s: &str) {
        for c in s.chars() {
            m.feed(c);
        }
    }

    #[test]
    fn single_char_delimiter() {
        let mut m = DelimiterMatcher::new(",").unwrap();
        assert!(!m.is_match());
        m.feed('a');
        assert!(!m.is_match());
        m.feed(',');
        assert!(m.is_match());
        m.feed('b');
        assert!(!m.is_match());
    }

    #[test]
    fn multi_char_delimiter() {
        let mut m = DelimiterMatcher::new("abc").unwrap();
        assert_eq!(m.width(), 3);
        feed_str(&mut m, "xab");
        assert!(!m.is_match());
        m.feed('c');
        assert!(m.is_match());
        m.feed('a');
        assert!(!m.is_match());
        feed_str(&mut m, "bc");
        assert!(m.is_match());
    }

    #[test]
    fn reset_clears_partial_match() {
        let mut m = DelimiterMatcher::new("##").unwrap();
        m.feed('#');
        m.reset();
        m.feed('#');
        assert!(!m.is_match());
        m.feed('#');
        assert!(m.is_match());
    }

    #[test]
    fn nul_delimiter_needs_real_characters() {
        let mut m = DelimiterMatcher::new("\0\0").unwrap();
        assert!(!m.is_match());
        m.feed('\0');
        assert!(!m.is_match());
        m.feed('\0');
        assert!(m.is_match());
        m.reset();
        assert!(!m.is_match());
    }

    #[test]
    fn non_ascii_delimiter() {
        let mut m = DelimiterMatcher::new("→").unwrap();
        feed_str(&mut m, "a→");
        assert!(m.is_match());
    }

    #[test]
    fn invalid_delimiters_rejected() {
        assert_eq!(
            DelimiterMatcher::new("").unwrap_err(),
            ConfigError::EmptyDelimiter
        );
        assert!(matches!(
            DelimiterMatcher::new("\"").unwrap_err(),
            ConfigError::ReservedCharacter { ch: '"', .. }
        ));
        assert!(DelimiterMatcher::new("a\nb").is_err());
        assert!(DelimiterMatcher::new("\r").is_err());
    }
}
