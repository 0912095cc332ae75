//! Run options.
//!
//! A value type built once per run and passed by reference into every
//! comparison. Regexes are compiled eagerly so a bad pattern fails the run
//! before any file is touched, rather than surfacing mid-scan.

use crate::error::{Error, Result};
use regex::{Regex, RegexBuilder};

const REGEX_SIZE_LIMIT: usize = 1_000_000;
const DEFAULT_MAX_EDIT_DISTANCE: i64 = 5;

/// Comparison knobs shared by every line comparison and expansion in a run.
#[derive(Debug, Clone)]
pub struct Options {
    pub ignore_whitespace: bool,
    pub ignore_blank_lines: bool,
    pub min_line_length: usize,
    pub min_similar_lines: usize,
    pub max_edit_distance: usize,
    ignore_line_pattern: Option<String>,
    always_different_pattern: Option<String>,
}

impl Options {
    /// `max_edit_distance <= 0` normalizes to the default of 5.
    pub fn new(max_edit_distance: i64) -> Self {
        Options {
            ignore_whitespace: false,
            ignore_blank_lines: false,
            min_line_length: 0,
            min_similar_lines: 0,
            max_edit_distance: if max_edit_distance <= 0 {
                DEFAULT_MAX_EDIT_DISTANCE as usize
            } else {
                max_edit_distance as usize
            },
            ignore_line_pattern: None,
            always_different_pattern: None,
        }
    }

    pub fn with_ignore_whitespace(mut self, v: bool) -> Self {
        self.ignore_whitespace = v;
        self
    }

    pub fn with_ignore_blank_lines(mut self, v: bool) -> Self {
        self.ignore_blank_lines = v;
        self
    }

    pub fn with_min_line_length(mut self, v: usize) -> Self {
        self.min_line_length = v;
        self
    }

    pub fn with_min_similar_lines(mut self, v: usize) -> Self {
        self.min_similar_lines = v;
        self
    }

    pub fn with_ignore_line_regex(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_line_pattern = Some(pattern.into());
        self
    }

    pub fn with_always_different_regex(mut self, pattern: impl Into<String>) -> Self {
        self.always_different_pattern = Some(pattern.into());
        self
    }

    /// Compiles the configured regex patterns, bounding compile-time size
    /// and DFA growth so a pathological pattern fails fast instead of
    /// hanging or exhausting memory.
    pub fn compile(&self) -> Result<CompiledOptions> {
        let ignore_line_re = self
            .ignore_line_pattern
            .as_deref()
            .map(compile_bounded)
            .transpose()?;
        let always_different_re = self
            .always_different_pattern
            .as_deref()
            .map(compile_bounded)
            .transpose()?;

        Ok(CompiledOptions {
            opts: self.clone(),
            ignore_line_re,
            always_different_re,
        })
    }
}

fn compile_bounded(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .dfa_size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(Error::Regex)
}

/// An [`Options`] with its regexes compiled; this is what the rest of the
/// engine actually carries around, so a compile failure can only happen
/// once, up front.
#[derive(Debug, Clone)]
pub struct CompiledOptions {
    opts: Options,
    pub ignore_line_re: Option<Regex>,
    pub always_different_re: Option<Regex>,
}

impl std::ops::Deref for CompiledOptions {
    type Target = Options;
    fn deref(&self) -> &Options {
        &self.opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_max_edit_distance_normalizes_to_default() {
        assert_eq!(Options::new(0).max_edit_distance, 5);
        assert_eq!(Options::new(-3).max_edit_distance, 5);
        assert_eq!(Options::new(2).max_edit_distance, 2);
    }

    #[test]
    fn bad_regex_surfaces_as_error_not_panic() {
        let opts = Options::new(5).with_ignore_line_regex("(unclosed");
        assert!(matches!(opts.compile(), Err(Error::Regex(_))));
    }
}
