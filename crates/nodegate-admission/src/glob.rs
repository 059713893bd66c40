//! Shell-style glob matching for conflict patterns.
//!
//! Syntax:
//!
//! ```text
//! *        any run of characters except '/'
//! ?        any single character except '/'
//! [abc]    one character from the class; ranges like [a-z]
//! [^abc]   one character not in the class
//! \c       the literal character c
//! ```
//!
//! Patterns are validated in full before matching, so a malformed
//! pattern fails the same way whatever name it is tested against.

use regex::Regex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GlobError {
    #[error("unterminated character class")]
    UnterminatedClass,

    #[error("pattern ends with an escape")]
    TrailingEscape,

    #[error("unexpected {0:?} in character class")]
    MalformedClass(char),

    #[error("reversed range {0}-{1} in character class")]
    ReversedRange(char, char),

    #[error("compiled pattern rejected: {0}")]
    Compile(#[from] regex::Error),
}

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    regex: Regex,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Self, GlobError> {
        let regex = Regex::new(&translate(pattern)?)?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Whether the whole of `name` matches.
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// Match `name` against `pattern`, treating a malformed pattern as no match.
pub fn glob_matches(pattern: &str, name: &str) -> bool {
    match Glob::new(pattern) {
        Ok(glob) => glob.is_match(name),
        Err(e) => {
            debug!(%pattern, error = %e, "received error while matching pattern");
            false
        }
    }
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

fn translate(pattern: &str) -> Result<String, GlobError> {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '\\' => {
                let escaped = chars.next().ok_or(GlobError::TrailingEscape)?;
                push_literal(&mut out, escaped);
            }
            '[' => translate_class(&mut chars, &mut out)?,
            c => push_literal(&mut out, c),
        }
    }

    out.push('$');
    Ok(out)
}

/// Consume a character class body (after '[') through its closing ']'.
fn translate_class(chars: &mut Chars<'_>, out: &mut String) -> Result<(), GlobError> {
    out.push('[');
    if chars.next_if_eq(&'^').is_some() {
        out.push('^');
    }

    let mut ranges = 0;
    loop {
        let lo = match chars.next() {
            None => return Err(GlobError::UnterminatedClass),
            Some(']') if ranges > 0 => break,
            Some(c) => class_char(c, chars)?,
        };

        let hi = if chars.next_if_eq(&'-').is_some() {
            match chars.next() {
                None => return Err(GlobError::UnterminatedClass),
                Some(c) => class_char(c, chars)?,
            }
        } else {
            lo
        };

        if hi < lo {
            return Err(GlobError::ReversedRange(lo, hi));
        }
        push_class_range(out, lo, hi);
        ranges += 1;
    }

    out.push(']');
    Ok(())
}

/// Resolve one class member, handling escapes and rejecting bare '-' and ']'.
fn class_char(c: char, chars: &mut Chars<'_>) -> Result<char, GlobError> {
    match c {
        '\\' => chars.next().ok_or(GlobError::UnterminatedClass),
        '-' | ']' => Err(GlobError::MalformedClass(c)),
        c => Ok(c),
    }
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

fn push_class_range(out: &mut String, lo: char, hi: char) {
    out.push_str(&format!("\\x{{{:X}}}", lo as u32));
    if hi != lo {
        out.push_str(&format!("-\\x{{{:X}}}", hi as u32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_patterns_match_exactly() {
        assert!(glob_matches("web.service", "web.service"));
        assert!(!glob_matches("web.service", "web.services"));
        assert!(!glob_matches("web.service", "xweb.service"));
    }

    #[test]
    fn star_matches_any_run() {
        assert!(glob_matches("foo*", "foo"));
        assert!(glob_matches("foo*", "foobar.service"));
        assert!(glob_matches("web@*.service", "web@1.service"));
        assert!(!glob_matches("web@*.service", "api@1.service"));
        assert!(glob_matches("*", "anything"));
    }

    #[test]
    fn wildcards_do_not_cross_slashes() {
        assert!(!glob_matches("a*", "a/b"));
        assert!(!glob_matches("a?b", "a/b"));
        assert!(glob_matches("a/*", "a/b"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(glob_matches("web?.service", "web1.service"));
        assert!(!glob_matches("web?.service", "web12.service"));
        assert!(!glob_matches("web?.service", "web.service"));
    }

    #[test]
    fn character_classes() {
        assert!(glob_matches("web[0-9].service", "web7.service"));
        assert!(!glob_matches("web[0-9].service", "webx.service"));
        assert!(glob_matches("web[^0-9].service", "webx.service"));
        assert!(!glob_matches("web[^0-9].service", "web7.service"));
        assert!(glob_matches("[abc]", "b"));
        assert!(glob_matches("[a\\]]", "]"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(glob_matches("a.b", "a.b"));
        assert!(!glob_matches("a.b", "axb"));
        assert!(glob_matches("a+(b)", "a+(b)"));
        assert!(glob_matches("\\*", "*"));
        assert!(!glob_matches("\\*", "x"));
    }

    #[test]
    fn malformed_patterns_are_errors() {
        assert!(matches!(Glob::new("web["), Err(GlobError::UnterminatedClass)));
        assert!(matches!(Glob::new("[a-"), Err(GlobError::UnterminatedClass)));
        assert!(matches!(Glob::new("[]"), Err(GlobError::MalformedClass(']'))));
        assert!(matches!(Glob::new("[^]"), Err(GlobError::MalformedClass(']'))));
        assert!(matches!(Glob::new("[-a]"), Err(GlobError::MalformedClass('-'))));
        assert!(matches!(Glob::new("[z-a]"), Err(GlobError::ReversedRange('z', 'a'))));
        assert!(matches!(Glob::new("abc\\"), Err(GlobError::TrailingEscape)));
    }

    #[test]
    fn malformed_pattern_never_matches() {
        assert!(!glob_matches("web[", "web["));
        assert!(!glob_matches("[", ""));
    }

    #[test]
    fn glob_keeps_source_pattern() {
        let glob = Glob::new("db-*").unwrap();
        assert_eq!(glob.as_str(), "db-*");
        assert!(glob.is_match("db-primary"));
    }
}
