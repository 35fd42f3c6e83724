//! Spreadsheet wildcard patterns
//!
//! `*` matches any run of characters and `?` exactly one. `~` escapes a
//! following `*` or `?`; any other tilde is literal, so `~~` is two
//! literal tildes. Matching is anchored and case-sensitive.

use crate::FormulaError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

static PATTERN_CACHE: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, Regex>> {
    PATTERN_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Whether `text` contains wildcard syntax
pub fn is_wildcard_pattern(text: &str) -> bool {
    text.contains(['*', '?', '~'])
}

/// Translate a wildcard pattern to an anchored regex source.
pub fn to_regex_source(pattern: &str) -> String {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str("^(?s:");

    let mut chars = pattern.chars().peekable();
    let mut literal = [0u8; 4];
    while let Some(c) = chars.next() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            '~' => match chars.peek() {
                Some(&next @ ('*' | '?')) => {
                    chars.next();
                    source.push_str(&regex::escape(next.encode_utf8(&mut literal)));
                }
                _ => source.push_str(&regex::escape("~")),
            },
            other => source.push_str(&regex::escape(other.encode_utf8(&mut literal))),
        }
    }

    source.push_str(")$");
    source
}

/// Get or compile the matcher for a wildcard pattern
pub fn compile(pattern: &str) -> Result<Regex, FormulaError> {
    let cache = get_cache();

    if let Ok(read_guard) = cache.read() {
        if let Some(re) = read_guard.get(pattern) {
            return Ok(re.clone());
        }
    }

    let re = Regex::new(&to_regex_source(pattern)).map_err(|e| {
        FormulaError::value().with_message(format!("Invalid pattern '{}': {}", pattern, e))
    })?;

    if let Ok(mut write_guard) = cache.write() {
        write_guard.insert(pattern.to_string(), re.clone());
    }

    Ok(re)
}

/// Match `text` against a wildcard pattern. An uncompilable pattern matches nothing.
pub fn is_match(pattern: &str, text: &str) -> bool {
    match compile(pattern) {
        Ok(re) => re.is_match(text),
        Err(e) => {
            tracing::debug!(pattern, error = ?e.message, "wildcard pattern rejected");
            false
        }
    }
}
