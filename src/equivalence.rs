//! Single-line equivalence predicate and the slow DP fallback used
//! for lines outside the Basic Multilingual Plane.

use crate::levenshtein;
use crate::line::Line;
use crate::options::CompiledOptions;

/// Code-point length above which a slow-path comparison gets a one-line
/// warning: the DP fallback is O(n*m) and a line this long makes a single
/// comparison expensive.
const SLOW_PATH_WARN_LEN: usize = 2000;

/// The outcome of comparing two lines, or of expanding a group of
/// occurrences: the minimum pairwise classification observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Different,
    Similar,
    Equal,
}

/// Classifies two lines under the given options.
pub fn compare(a: &Line, b: &Line, opts: &CompiledOptions) -> Level {
    if a.matches_always_different() || b.matches_always_different() {
        return Level::Different;
    }

    let ws = opts.ignore_whitespace;
    if a.text(ws) == b.text(ws) {
        return Level::Equal;
    }

    let dist = if a.needs_slow_levenshtein() || b.needs_slow_levenshtein() {
        let (at, bt) = (a.text(ws), b.text(ws));
        if at.len() > SLOW_PATH_WARN_LEN || bt.len() > SLOW_PATH_WARN_LEN {
            log::warn!("comparing an oversized line on the slow Levenshtein path");
        }
        slow_distance(at, bt)
    } else {
        levenshtein::distance(a.chars(ws), b.chars(ws))
    };

    if dist <= opts.max_edit_distance {
        Level::Similar
    } else {
        Level::Different
    }
}

/// Textbook O(n*m) Levenshtein distance over full Unicode scalar values,
/// used whenever either line contains a code point above U+FFFF (the
/// bit-parallel kernel's alphabet table is bounded to the BMP).
pub fn slow_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_and_fast_paths_agree_on_bmp_input() {
        let a = "hello world";
        let b = "hellO w0rld";
        let slow = slow_distance(a, b);
        let fast = levenshtein::distance(
            &a.chars().collect::<Vec<_>>(),
            &b.chars().collect::<Vec<_>>(),
        );
        assert_eq!(slow, fast);
    }

    #[test]
    fn slow_path_handles_non_bmp_code_points() {
        let a = "a\u{1F600}b";
        let b = "a\u{1F601}b";
        assert_eq!(slow_distance(a, b), 1);
    }
}
