//! Line model and content hashing shared by the diff codec and patch model.
//!
//! A document is an ordered list of lines. The empty string is the empty
//! document; any other text splits on `\n`, so a trailing newline produces a
//! trailing empty line. `join_lines(split_lines(t)) == t` for every `t`.

use sha2::{Digest, Sha256};

/// Split text into its lines
pub fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').map(str::to_string).collect()
}

/// Join lines back into text
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line.as_ref());
    }
    out
}

/// SHA-256 of the UTF-8 text, hex-encoded (64 chars)
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Number of lines in `text` under the line model
pub fn line_count(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.split('\n').count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_no_lines() {
        assert!(split_lines("").is_empty());
        assert_eq!(line_count(""), 0);
    }

    #[test]
    fn test_trailing_newline_is_a_line() {
        assert_eq!(split_lines("a\n"), vec!["a".to_string(), String::new()]);
        assert_eq!(line_count("a\n"), 2);
    }

    #[test]
    fn test_split_join_round_trip() {
        for text in ["", "a", "a\nb", "a\n", "\n", "\n\n", "x\n\ny"] {
            assert_eq!(join_lines(&split_lines(text)), text);
        }
    }

    #[test]
    fn test_content_hash_is_sha256_hex() {
        let h = content_hash("hello");
        assert_eq!(h.len(), 64);
        assert_eq!(
            h,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_ne!(content_hash("hello"), content_hash("hello\n"));
    }
}
