//! Line model and canonicalization.
//!
//! A [`Line`] caches both its original and whitespace-trimmed forms, plus the
//! code-point vectors the Levenshtein kernel operates on, so that every
//! comparison only looks fields up instead of re-scanning or re-trimming text.

use bitflags::bitflags;

bitflags! {
    /// Precomputed per-line flags, checked by the equivalence predicate and
    /// the acceptance predicate without re-evaluating a regex or a length
    /// check on every comparison.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LineFlags: u8 {
        /// Trimmed length is zero.
        const BLANK = 1 << 0;
        /// The run's `IgnoreLineRegex` matched this line.
        const MATCHES_IGNORE = 1 << 1;
        /// The run's `AlwaysDifferentLineRegex` matched this line.
        const MATCHES_ALWAYS_DIFFERENT = 1 << 2;
        /// The line contains a code point above U+FFFF; route comparisons
        /// against it through the slow Levenshtein path.
        const NEEDS_SLOW_LEVENSHTEIN = 1 << 3;
    }
}

/// One logical line of an input file, with both comparison forms cached.
#[derive(Debug, Clone)]
pub struct Line {
    pub original: String,
    pub trimmed: String,
    original_chars: Vec<char>,
    trimmed_chars: Vec<char>,
    pub flags: LineFlags,
}

impl Line {
    /// Builds a line record, evaluating the ignore/always-different regexes
    /// (if any) against whichever text the options select for comparison.
    pub fn new(
        original: String,
        ignore_re: Option<&regex::Regex>,
        always_different_re: Option<&regex::Regex>,
        ignore_whitespace: bool,
    ) -> Self {
        let trimmed = original
            .trim_matches(|c: char| c.is_ascii_whitespace())
            .to_string();
        let original_chars: Vec<char> = original.chars().collect();
        let trimmed_chars: Vec<char> = trimmed.chars().collect();

        let mut flags = LineFlags::empty();
        if trimmed.is_empty() {
            flags |= LineFlags::BLANK;
        }
        let check_text = if ignore_whitespace { &trimmed } else { &original };
        if ignore_re.is_some_and(|re| re.is_match(check_text)) {
            flags |= LineFlags::MATCHES_IGNORE;
        }
        if always_different_re.is_some_and(|re| re.is_match(check_text)) {
            flags |= LineFlags::MATCHES_ALWAYS_DIFFERENT;
        }
        if original_chars.iter().any(|c| (*c as u32) > 0xFFFF) {
            flags |= LineFlags::NEEDS_SLOW_LEVENSHTEIN;
        }

        Line {
            original,
            trimmed,
            original_chars,
            trimmed_chars,
            flags,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.flags.contains(LineFlags::BLANK)
    }

    pub fn matches_ignore(&self) -> bool {
        self.flags.contains(LineFlags::MATCHES_IGNORE)
    }

    pub fn matches_always_different(&self) -> bool {
        self.flags.contains(LineFlags::MATCHES_ALWAYS_DIFFERENT)
    }

    pub fn needs_slow_levenshtein(&self) -> bool {
        self.flags.contains(LineFlags::NEEDS_SLOW_LEVENSHTEIN)
    }

    /// The code points used for comparison: trimmed if `ignore_whitespace`.
    pub fn chars(&self, ignore_whitespace: bool) -> &[char] {
        if ignore_whitespace {
            &self.trimmed_chars
        } else {
            &self.original_chars
        }
    }

    /// Length in code points of the comparison form.
    pub fn len(&self, ignore_whitespace: bool) -> usize {
        self.chars(ignore_whitespace).len()
    }

    /// The raw text used for an exact byte-equality check.
    pub fn text(&self, ignore_whitespace: bool) -> &str {
        if ignore_whitespace {
            &self.trimmed
        } else {
            &self.original
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_line_flag() {
        let l = Line::new("   ".to_string(), None, None, false);
        assert!(l.is_blank());
    }

    #[test]
    fn non_bmp_flagged_for_slow_path() {
        let l = Line::new("a\u{1F600}b".to_string(), None, None, false);
        assert!(l.needs_slow_levenshtein());
    }

    #[test]
    fn ignore_regex_checked_against_trimmed_when_requested() {
        let re = regex::Regex::new(r"^foo$").unwrap();
        let l = Line::new("  foo  ".to_string(), Some(&re), None, true);
        assert!(l.matches_ignore());
        let l2 = Line::new("  foo  ".to_string(), Some(&re), None, false);
        assert!(!l2.matches_ignore());
    }

    #[test]
    fn trim_is_ascii_only() {
        let l = Line::new("\u{00A0}foo\u{00A0}".to_string(), None, None, false);
        assert_eq!(l.text(true), "\u{00A0}foo\u{00A0}");
        assert!(!l.is_blank());

        let l2 = Line::new("\u{00A0}\u{3000}".to_string(), None, None, false);
        assert!(!l2.is_blank());
    }
}
