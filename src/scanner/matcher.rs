//! Prefix/suffix matching against a key window.
//!
//! The prefix check is a byte-for-byte compare of the window start against
//! the marker plus the caller's prefix. The optional suffix check is bounded
//! by the first newline after the marker text: the key line must end with the
//! suffix before that newline.

use crate::core::config::ScanConfig;
use crate::scanner::header::KEY_MARKER;

/// Classification of a single key window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDecision {
    Match,
    PrefixMismatch,
    SuffixMismatch,
    /// A suffix was requested but the key line has no terminating newline
    /// inside the window.
    Unterminated,
}

/// Borrowed view of the patterns a run matches against.
#[derive(Debug, Clone, Copy)]
pub struct KeyPattern<'a> {
    prefix_pattern: &'a [u8],
    suffix: Option<&'a [u8]>,
}

impl<'a> KeyPattern<'a> {
    pub fn from_config(config: &'a ScanConfig) -> Self {
        Self {
            prefix_pattern: &config.key_prefix_pattern,
            suffix: config.key_suffix.as_deref(),
        }
    }

    /// Decide whether `window` (starting at the marker byte) matches.
    pub fn decide(&self, window: &[u8]) -> KeyDecision {
        if !window.starts_with(self.prefix_pattern) {
            return KeyDecision::PrefixMismatch;
        }

        let Some(suffix) = self.suffix else {
            return KeyDecision::Match;
        };

        let Some(end) = key_line_end(window) else {
            return KeyDecision::Unterminated;
        };

        match end.checked_sub(suffix.len()) {
            Some(start) if &window[start..end] == suffix => KeyDecision::Match,
            _ => KeyDecision::SuffixMismatch,
        }
    }
}

/// Key text between the marker and its terminating newline, if both are
/// present in `window`.
pub fn extract_key(window: &[u8]) -> Option<&[u8]> {
    let rest = window.strip_prefix(KEY_MARKER)?;
    let end = memchr::memchr(b'\n', rest)?;
    Some(&rest[..end])
}

/// Index of the newline that terminates the key line. The search starts after
/// the marker text so the marker's own leading newline is not mistaken for it.
fn key_line_end(window: &[u8]) -> Option<usize> {
    let body_start = KEY_MARKER.len().min(window.len());
    memchr::memchr(b'\n', &window[body_start..]).map(|i| body_start + i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(prefix: &str, suffix: Option<&str>) -> ScanConfig {
        ScanConfig::new("/var/cache/nginx", prefix, suffix, false)
    }

    fn decide(prefix: &str, suffix: Option<&str>, window: &[u8]) -> KeyDecision {
        let cfg = config(prefix, suffix);
        KeyPattern::from_config(&cfg).decide(window)
    }

    #[test]
    fn prefix_alone_decides_without_suffix() {
        assert_eq!(
            decide("users:", None, b"\nKEY: users:42\nbody"),
            KeyDecision::Match
        );
        assert_eq!(
            decide("users:", None, b"\nKEY: groups:42\nbody"),
            KeyDecision::PrefixMismatch
        );
    }

    #[test]
    fn prefix_is_not_delimiter_aware() {
        assert_eq!(
            decide("user", None, b"\nKEY: users:42\n"),
            KeyDecision::Match
        );
    }

    #[test]
    fn window_shorter_than_pattern_is_mismatch() {
        assert_eq!(
            decide("users:42", None, b"\nKEY: use"),
            KeyDecision::PrefixMismatch
        );
    }

    #[test]
    fn suffix_is_newline_bounded() {
        let window = b"\nKEY: prefixXsuffix\nsuffixY";
        assert_eq!(decide("prefix", Some("suffix"), window), KeyDecision::Match);
        assert_eq!(
            decide("prefix", Some("suffixY"), window),
            KeyDecision::SuffixMismatch
        );
    }

    #[test]
    fn key_equal_to_prefix_plus_suffix_matches() {
        assert_eq!(
            decide("users:", Some("42"), b"\nKEY: users:42\n"),
            KeyDecision::Match
        );
    }

    #[test]
    fn missing_newline_is_unterminated() {
        assert_eq!(
            decide("users:", Some("42"), b"\nKEY: users:4242424242"),
            KeyDecision::Unterminated
        );
    }

    #[test]
    fn missing_newline_without_suffix_still_matches() {
        assert_eq!(
            decide("users:", None, b"\nKEY: users:4242424242"),
            KeyDecision::Match
        );
    }

    #[test]
    fn suffix_longer_than_line_is_mismatch() {
        assert_eq!(
            decide("", Some("a-very-long-suffix-indeed"), b"\nKEY: ab\n"),
            KeyDecision::SuffixMismatch
        );
    }

    #[test]
    fn extract_key_returns_text_between_marker_and_newline() {
        assert_eq!(
            extract_key(b"\nKEY: httpexample.com/a\nHTTP/1.1"),
            Some(&b"httpexample.com/a"[..])
        );
        assert_eq!(extract_key(b"\nKEY: no-terminator"), None);
        assert_eq!(extract_key(b"garbage"), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Any middle that keeps the key line newline-free matches.
        #[test]
        fn prefix_anything_suffix_matches(
            prefix in "[a-z:/._]{0,24}",
            middle in "[^\n]{0,64}",
            suffix in "[a-z0-9._]{1,12}",
        ) {
            let mut window = format!("\nKEY: {prefix}{middle}{suffix}\n").into_bytes();
            window.extend_from_slice(b"HTTP/1.1 200 OK\r\n");
            prop_assert_eq!(decide(&prefix, Some(suffix.as_str()), &window), KeyDecision::Match);
            prop_assert_eq!(decide(&prefix, None, &window), KeyDecision::Match);
        }

        /// Text after the key line never satisfies the suffix check.
        #[test]
        fn text_after_newline_never_matches_suffix(
            key in "[a-z]{1,16}",
            tail in "[A-Z]{1,8}",
        ) {
            let window = format!("\nKEY: {key}\n{tail}").into_bytes();
            prop_assert_eq!(decide("", Some(tail.as_str()), &window), KeyDecision::SuffixMismatch);
        }
    }
}
