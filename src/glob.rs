//! Filename glob matching for include patterns.
//!
//! Patterns support `*`, `?` and POSIX-style bracket classes (`[abc]`,
//! `[a-z]`, `[!abc]`). Matching is case-insensitive and anchored over a
//! whole filename; there are no directory-separator semantics, a pattern
//! only ever sees a basename.

use ::glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A single compiled filename pattern.
///
/// Compilation never fails: an unterminated or otherwise unrecognized
/// bracket expression degrades to a literal `[` instead of being rejected.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    compiled: Pattern,
}

impl GlobPattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = match Pattern::new(&escape_stray_brackets(&source)) {
            Ok(pattern) => pattern,
            // Bracket expression the engine still rejects (e.g. a bad
            // range); treat the whole pattern as literal text.
            Err(_) => Pattern::new(&Pattern::escape(&source))
                .expect("escaped pattern is always valid"),
        };

        GlobPattern { source, compiled }
    }

    /// Tests a single filename (not a path) against this pattern.
    pub fn matches(&self, file_name: &str) -> bool {
        self.compiled.matches_with(file_name, MATCH_OPTIONS)
    }

    /// The pattern string as supplied by the user.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// A set of patterns combined with OR semantics.
#[derive(Debug, Clone)]
pub struct GlobSet {
    patterns: Vec<GlobPattern>,
}

impl GlobSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GlobSet {
            patterns: patterns.into_iter().map(GlobPattern::new).collect(),
        }
    }

    /// Returns `true` if any pattern in the set matches the filename.
    pub fn matches(&self, file_name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(file_name))
    }

    pub fn patterns(&self) -> &[GlobPattern] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Escapes every `[` that does not open a well-formed bracket expression,
/// so it matches itself instead of failing to compile.
fn escape_stray_brackets(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '[' {
            if let Some(end) = bracket_end(&chars, i) {
                out.extend(&chars[i..=end]);
                i = end + 1;
                continue;
            }
            out.push_str("[[]");
            i += 1;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    out
}

/// Finds the closing `]` of a bracket expression opened at `open`.
///
/// A leading `!` negates; a `]` directly after `[` or `[!` is a literal
/// class member, not a terminator.
fn bracket_end(chars: &[char], open: usize) -> Option<usize> {
    let mut i = open + 1;
    if chars.get(i) == Some(&'!') {
        i += 1;
    }
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    while i < chars.len() {
        if chars[i] == ']' {
            return Some(i);
        }
        i += 1;
    }
    None
}
