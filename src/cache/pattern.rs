//! Glob-style key patterns: `*` matches any run of characters, `?` matches
//! exactly one. Everything else is literal.

use regex::Regex;

use crate::error::{CacheError, Result};

/// Compiles a glob pattern into a regex anchored on the whole key.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str("(?s)^");
    let mut buf = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    source.push('$');

    Regex::new(&source)
        .map_err(|e| CacheError::InvalidRequest(format!("invalid key pattern '{}': {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_matches_any_suffix() {
        let re = compile_pattern("user:*").unwrap();
        assert!(re.is_match("user:1"));
        assert!(re.is_match("user:abc"));
        assert!(re.is_match("user:"));
        assert!(!re.is_match("users:1"));
        assert!(!re.is_match("user"));
    }

    #[test]
    fn test_question_mark_matches_one_char() {
        let re = compile_pattern("dev?").unwrap();
        assert!(re.is_match("dev1"));
        assert!(!re.is_match("dev"));
        assert!(!re.is_match("dev12"));
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let re = compile_pattern("a.b").unwrap();
        assert!(re.is_match("a.b"));
        assert!(!re.is_match("axb"));

        let re = compile_pattern("(x)+[y]").unwrap();
        assert!(re.is_match("(x)+[y]"));
        assert!(!re.is_match("xx[y]"));
    }

    #[test]
    fn test_anchored_on_both_ends() {
        let re = compile_pattern("mid").unwrap();
        assert!(re.is_match("mid"));
        assert!(!re.is_match("amid"));
        assert!(!re.is_match("midst"));
    }
}
