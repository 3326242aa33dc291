//! Delimiter Matchers
//!
//! Compiled regex matchers for the opener and closer blocks of a dialect.
//! A matcher only ever looks at line-local text: the slice left of a selection
//! for openers, the slice right of it for closers.
//!
//! ## Closer guard
//!
//! An opener is rejected when the closer literal appears anywhere after it in
//! the scanned text. The `regex` crate has no lookahead, so the guard runs as a
//! post-filter over each candidate. A rejected candidate only advances the scan
//! by one character, so overlapping candidates that start inside it are still
//! tried.
//!
//! ```text
//! Text:     "<% a %> b <%"
//! Pattern:  "<%([\#\-=])?"  with guard "%>"
//! Result:   match at 10..12 (the opener at 0 is followed by "%>")
//! ```

use regex::Regex;
use std::ops::Range;

use super::grammar::GrammarError;

/// One occurrence of an opener or closer block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMatch {
    /// Byte range of the block, relative to the scanned text
    pub range: Range<usize>,

    /// The literal text of the block
    pub text: String,
}

impl BlockMatch {
    /// Move the match by `offset` bytes
    pub fn shifted(self, offset: usize) -> Self {
        Self {
            range: self.range.start + offset..self.range.end + offset,
            text: self.text,
        }
    }
}

/// A compiled opener or closer matcher.
#[derive(Debug, Clone)]
pub struct DelimiterMatcher {
    pattern: String,
    regex: Regex,
    guard: Option<String>,
}

impl DelimiterMatcher {
    /// Compile a pattern with no guard
    pub fn new(pattern: &str) -> Result<Self, GrammarError> {
        let regex = Regex::new(pattern)?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            guard: None,
        })
    }

    /// Reject any match whose remaining text contains `literal`
    pub fn with_guard(mut self, literal: &str) -> Self {
        self.guard = Some(literal.to_string());
        self
    }

    /// All accepted, non-overlapping matches in `text`, left to right
    pub fn find_all(&self, text: &str) -> Vec<BlockMatch> {
        let mut found = Vec::new();
        let mut at = 0;

        while at <= text.len() {
            let Some(m) = self.regex.find_at(text, at) else {
                break;
            };

            if self.is_guarded(&text[m.end()..]) {
                // Retry from the next character, not from the end of the match
                at = next_char_boundary(text, m.start());
                continue;
            }

            found.push(BlockMatch {
                range: m.range(),
                text: m.as_str().to_string(),
            });

            at = if m.end() > m.start() {
                m.end()
            } else {
                next_char_boundary(text, m.end())
            };
        }

        found
    }

    /// The accepted match closest to the end of `text`
    pub fn find_last(&self, text: &str) -> Option<BlockMatch> {
        self.find_all(text).pop()
    }

    /// The accepted match closest to the start of `text`
    pub fn find_first(&self, text: &str) -> Option<BlockMatch> {
        self.find_all(text).into_iter().next()
    }

    /// Get the pattern string
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Get the guard literal, if any
    pub fn guard(&self) -> Option<&str> {
        self.guard.as_deref()
    }

    fn is_guarded(&self, rest: &str) -> bool {
        match &self.guard {
            Some(literal) => rest.contains(literal.as_str()),
            None => false,
        }
    }
}

fn next_char_boundary(text: &str, from: usize) -> usize {
    text[from..]
        .chars()
        .next()
        .map_or(text.len() + 1, |c| from + c.len_utf8())
}
