//! Host text buffer
//!
//! [`TextBuffer`] is the narrow surface the cycler needs from an editor: line
//! lookup, substrings, insert/replace, and the selection set. [`Buffer`] is a
//! plain in-memory implementation used by the CLI and the tests.
//!
//! All offsets are byte offsets into the document and must fall on UTF-8
//! character boundaries.

use serde::Serialize;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("offset {offset} is past the end of the buffer ({len} bytes)")]
    OutOfBounds { offset: usize, len: usize },

    #[error("offset {0} is not on a character boundary")]
    NotCharBoundary(usize),

    #[error("edits at {first:?} and {second:?} overlap")]
    OverlappingEdits {
        first: Range<usize>,
        second: Range<usize>,
    },
}

/// A stretch of whole lines and its absolute byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    pub range: Range<usize>,
    pub text: &'a str,
}

/// Which side of a selection an edit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    /// At or before the selection start
    Opener,
    /// At or after the selection end
    Closer,
}

/// Replace `range` with `text`. An empty range is an insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
    pub range: Range<usize>,
    pub text: String,
    pub kind: EditKind,
}

impl Edit {
    pub fn insert(offset: usize, text: impl Into<String>, kind: EditKind) -> Self {
        Self {
            range: offset..offset,
            text: text.into(),
            kind,
        }
    }

    pub fn replace(range: Range<usize>, text: impl Into<String>, kind: EditKind) -> Self {
        Self {
            range,
            text: text.into(),
            kind,
        }
    }

    pub fn is_insert(&self) -> bool {
        self.range.is_empty()
    }

    /// Change in document length once applied
    pub fn delta(&self) -> isize {
        self.text.len() as isize - self.range.len() as isize
    }
}

/// The editing surface of a host editor.
pub trait TextBuffer {
    /// The line containing `offset`, without its line terminator
    fn line(&self, offset: usize) -> Line<'_>;

    /// Text in `range`, or an empty string when the range is invalid
    fn substr(&self, range: Range<usize>) -> &str;

    /// Insert `text` at `offset` and return the number of bytes inserted
    fn insert(&mut self, offset: usize, text: &str) -> Result<usize, BufferError>;

    fn replace(&mut self, range: Range<usize>, text: &str) -> Result<(), BufferError>;

    fn selections(&self) -> Vec<Range<usize>>;

    fn set_selections(&mut self, selections: Vec<Range<usize>>);

    /// The whole lines touched by `range`
    fn region(&self, range: Range<usize>) -> Line<'_> {
        let start = self.line(range.start).range.start;
        let end = self.line(range.end).range.end.max(start);
        Line {
            range: start..end,
            text: self.substr(start..end),
        }
    }

    /// Apply edits given in document order, last first so earlier offsets
    /// stay valid. Nothing is applied if any two edits overlap.
    fn apply_edits(&mut self, edits: &[Edit]) -> Result<(), BufferError> {
        for pair in edits.windows(2) {
            if pair[0].range.end > pair[1].range.start {
                return Err(BufferError::OverlappingEdits {
                    first: pair[0].range.clone(),
                    second: pair[1].range.clone(),
                });
            }
        }

        for edit in edits.iter().rev() {
            if edit.is_insert() {
                self.insert(edit.range.start, &edit.text)?;
            } else {
                self.replace(edit.range.clone(), &edit.text)?;
            }
        }
        Ok(())
    }
}

/// An in-memory document with a selection set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    text: String,
    selections: Vec<Range<usize>>,
}

impl Buffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            selections: Vec::new(),
        }
    }

    /// Replace the selection set, checking every offset.
    ///
    /// Reversed ranges are normalized.
    pub fn with_selections(
        mut self,
        selections: impl IntoIterator<Item = Range<usize>>,
    ) -> Result<Self, BufferError> {
        let mut checked = Vec::new();
        for selection in selections {
            let (start, end) = if selection.start <= selection.end {
                (selection.start, selection.end)
            } else {
                (selection.end, selection.start)
            };
            self.check_offset(start)?;
            self.check_offset(end)?;
            checked.push(start..end);
        }
        self.selections = checked;
        Ok(self)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    fn check_offset(&self, offset: usize) -> Result<(), BufferError> {
        if offset > self.text.len() {
            return Err(BufferError::OutOfBounds {
                offset,
                len: self.text.len(),
            });
        }
        if !self.text.is_char_boundary(offset) {
            return Err(BufferError::NotCharBoundary(offset));
        }
        Ok(())
    }

    fn floor_boundary(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

impl TextBuffer for Buffer {
    fn line(&self, offset: usize) -> Line<'_> {
        let offset = self.floor_boundary(offset);
        let start = self.text[..offset].rfind('\n').map_or(0, |i| i + 1);
        let mut end = self.text[offset..]
            .find('\n')
            .map_or(self.text.len(), |i| offset + i);
        if end > start && self.text[..end].ends_with('\r') {
            end -= 1;
        }
        Line {
            range: start..end,
            text: &self.text[start..end],
        }
    }

    fn substr(&self, range: Range<usize>) -> &str {
        self.text.get(range).unwrap_or("")
    }

    fn insert(&mut self, offset: usize, text: &str) -> Result<usize, BufferError> {
        self.check_offset(offset)?;
        self.text.insert_str(offset, text);
        Ok(text.len())
    }

    fn replace(&mut self, range: Range<usize>, text: &str) -> Result<(), BufferError> {
        self.check_offset(range.start)?;
        self.check_offset(range.end)?;
        self.text.replace_range(range, text);
        Ok(())
    }

    fn selections(&self) -> Vec<Range<usize>> {
        self.selections.clone()
    }

    fn set_selections(&mut self, selections: Vec<Range<usize>>) {
        self.selections = selections;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_lookup() {
        let buffer = Buffer::new("one\ntwo\r\nthree");
        assert_eq!(buffer.line(0).text, "one");
        assert_eq!(buffer.line(3).text, "one");
        assert_eq!(buffer.line(5).range, 4..7);
        assert_eq!(buffer.line(5).text, "two");
        assert_eq!(buffer.line(14).text, "three");
        assert_eq!(buffer.line(99).text, "three");
    }

    #[test]
    fn test_empty_buffer_line() {
        let buffer = Buffer::new("");
        assert_eq!(buffer.line(0).range, 0..0);
    }

    #[test]
    fn test_region_spans_lines() {
        let buffer = Buffer::new("ab\ncd\nef");
        let region = buffer.region(1..4);
        assert_eq!(region.range, 0..5);
        assert_eq!(region.text, "ab\ncd");
    }

    #[test]
    fn test_selections_validated() {
        let err = Buffer::new("abc").with_selections([0..9]).unwrap_err();
        assert_eq!(err, BufferError::OutOfBounds { offset: 9, len: 3 });

        let err = Buffer::new("é").with_selections([1..1]).unwrap_err();
        assert_eq!(err, BufferError::NotCharBoundary(1));

        let buffer = Buffer::new("abc").with_selections([2..1]).unwrap();
        assert_eq!(buffer.selections(), vec![1..2]);
    }

    #[test]
    fn test_apply_edits_reverse_order() {
        let mut buffer = Buffer::new("foo");
        buffer
            .apply_edits(&[
                Edit::insert(0, "<% ", EditKind::Opener),
                Edit::insert(3, " %>", EditKind::Closer),
            ])
            .unwrap();
        assert_eq!(buffer.text(), "<% foo %>");
    }

    #[test]
    fn test_apply_edits_same_offset() {
        let mut buffer = Buffer::new("");
        buffer
            .apply_edits(&[
                Edit::insert(0, "<% ", EditKind::Opener),
                Edit::insert(0, " %>", EditKind::Closer),
            ])
            .unwrap();
        assert_eq!(buffer.text(), "<%  %>");
    }

    #[test]
    fn test_apply_edits_rejects_overlap() {
        let mut buffer = Buffer::new("<% a %>");
        let err = buffer
            .apply_edits(&[
                Edit::replace(0..2, "<%=", EditKind::Opener),
                Edit::replace(1..3, "x", EditKind::Opener),
            ])
            .unwrap_err();
        assert!(matches!(err, BufferError::OverlappingEdits { .. }));
        assert_eq!(buffer.text(), "<% a %>");
    }

    #[test]
    fn test_edit_delta() {
        assert_eq!(Edit::replace(0..2, "<%=", EditKind::Opener).delta(), 1);
        assert_eq!(Edit::replace(0..3, "<%", EditKind::Opener).delta(), -1);
        assert_eq!(Edit::insert(4, " %>", EditKind::Closer).delta(), 3);
    }
}
