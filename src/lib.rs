//! simuncover - line-oriented copy-paste and near-duplicate detection
//!
//! Given a set of input files, finds maximal multi-line regions that are
//! either exactly equal or within a bounded edit distance of each other,
//! across file pairs and within a single file. See [`engine::similarities`]
//! for the entry point.

pub mod driver;
pub mod engine;
pub mod equivalence;
pub mod error;
pub mod expand;
pub mod levenshtein;
pub mod line;
pub mod occurrence;
pub mod options;
pub mod reader;
pub mod search;

pub use engine::{similarities, InputFile, Progress, RunHandles};
pub use equivalence::Level;
pub use error::{Error, Result};
pub use occurrence::{FileId, Occurrence, Similarity};
pub use options::Options;
