//! Buffered line reading.
//!
//! Performs no normalization of its own: trimming and whitespace handling
//! are the equivalence predicate's job, not the reader's.

use std::io::{BufRead, BufReader, Read};

use crate::error::{Error, Result};

/// Reads every line from `reader`, stripping the trailing `\n` but leaving
/// any `\r` intact (a CRLF file therefore yields lines each ending in `\r`,
/// matching a bare `\n`-delimited read of CRLF text -- normalizing that is
/// a caller concern).
pub fn read_lines<R: Read>(name: &str, reader: R) -> Result<Vec<String>> {
    let mut buffered = BufReader::new(reader);
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let bytes_read = buffered
            .read_until(b'\n', &mut buf)
            .map_err(|source| Error::Io {
                name: name.into(),
                source,
            })?;
        if bytes_read == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        lines.push(String::from_utf8_lossy(&buf).into_owned());
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_lines() {
        let lines = read_lines("empty", std::io::Cursor::new(b"" as &[u8])).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn missing_trailing_newline_still_yields_last_line() {
        let lines = read_lines("f", std::io::Cursor::new(b"a\nb" as &[u8])).unwrap();
        assert_eq!(lines, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn crlf_retains_carriage_return() {
        let lines = read_lines("f", std::io::Cursor::new(b"a\r\nb\r\n" as &[u8])).unwrap();
        assert_eq!(lines, vec!["a\r".to_string(), "b\r".to_string()]);
    }
}
