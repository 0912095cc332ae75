//! Crate-level error type.
//!
//! Load errors (file I/O, bad regex) are the only fallible outcomes a caller
//! needs to handle; everything past loading either succeeds or is cancelled.

use std::path::PathBuf;

/// Errors returned by [`crate::Engine::similarities`] and [`crate::Options`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {name}: {source}")]
    Io {
        name: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid line filter regex: {0}")]
    Regex(#[from] regex::Error),

    /// Internal invariant violation: the fast Levenshtein path was handed a
    /// code point above U+FFFF. The public API always routes such input to
    /// the slow path first, so this can only be reached by misusing a
    /// `pub(crate)` entry point directly.
    #[error("fast Levenshtein path received a non-BMP code point")]
    NotBmp,
}

pub type Result<T> = std::result::Result<T, Error>;
