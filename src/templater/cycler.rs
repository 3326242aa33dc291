//! Tag Cycler
//!
//! Finds the tag pair around a selection and either inserts the dialect's
//! default tag or advances the existing pair to its next variant.
//!
//! ## Discovery
//!
//! ```text
//! Line:       "<% foo %>"
//! Selection:      ^^^            3..6
//! Left text:  "<% "             nearest opener -> 0..2 "<%"
//! Right text:       " %>"       nearest closer -> 7..9 "%>"
//! ```
//!
//! Both blocks must be found for the selection to count as inside a tag. A
//! lone opener or closer falls through to insertion.
//!
//! ## Batches
//!
//! [`TagCycler::run`] plans every selection against the same unmodified
//! snapshot. The resulting [`CyclePlan`] lists edits in document order and the
//! selections as they will be once the edits are applied back to front.

use serde::Serialize;
use std::ops::Range;

use super::buffer::{Edit, EditKind, Line, TextBuffer};
use super::grammar::Dialect;
use super::matcher::BlockMatch;

/// The opener and closer blocks found around a selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SurroundingBlocks {
    pub opener: Option<BlockMatch>,
    pub closer: Option<BlockMatch>,
}

impl SurroundingBlocks {
    /// Both blocks, if the selection sits inside a tag pair
    pub fn pair(&self) -> Option<(&BlockMatch, &BlockMatch)> {
        self.opener.as_ref().zip(self.closer.as_ref())
    }
}

/// The two edits for one selection and the selection that results from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEdit {
    pub opener: Edit,
    pub closer: Edit,
    /// Selection after both edits, counting only this tag's edits
    pub selection: Range<usize>,
}

impl TagEdit {
    /// The edits in application order: closer first, then opener
    pub fn edits(&self) -> [&Edit; 2] {
        [&self.closer, &self.opener]
    }
}

/// Every edit of a batch and the selections that follow from it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CyclePlan {
    /// Non-duplicated edits in document order
    pub edits: Vec<Edit>,
    /// New selections, in the order the selections were given
    pub selections: Vec<Range<usize>>,
}

/// Inserts and cycles tags of one dialect.
#[derive(Debug, Clone, Copy)]
pub struct TagCycler<'d> {
    dialect: &'d Dialect,
}

impl<'d> TagCycler<'d> {
    pub fn new(dialect: &'d Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &'d Dialect {
        self.dialect
    }

    /// Nearest valid opener left of the selection and nearest closer right of it.
    ///
    /// `line` must cover the selection; offsets in the result are absolute.
    pub fn find_surrounding_blocks(&self, line: &Line<'_>, selection: &Range<usize>) -> SurroundingBlocks {
        let base = line.range.start;
        let left = selection
            .start
            .checked_sub(base)
            .and_then(|end| line.text.get(..end));
        let right = selection
            .end
            .checked_sub(base)
            .and_then(|start| line.text.get(start..));

        let (Some(left), Some(right)) = (left, right) else {
            return SurroundingBlocks::default();
        };

        SurroundingBlocks {
            opener: self
                .dialect
                .opener_matcher()
                .find_last(left)
                .map(|m| m.shifted(base)),
            closer: self
                .dialect
                .closer_matcher()
                .find_first(right)
                .map(|m| m.shifted(selection.end)),
        }
    }

    /// Wrap the selection in the insert variant, one space inside each delimiter.
    pub fn insert_block(&self, selection: &Range<usize>) -> TagEdit {
        let variant = self.dialect.insert_variant();
        let opener_text = format!("{} ", variant.opener);
        let closer_text = format!(" {}", variant.closer);
        let shift = opener_text.len();

        TagEdit {
            closer: Edit::insert(selection.end, closer_text, EditKind::Closer),
            opener: Edit::insert(selection.start, opener_text, EditKind::Opener),
            selection: selection.start + shift..selection.end + shift,
        }
    }

    /// Replace a found pair with the next variant of the dialect.
    pub fn cycle_block(&self, opener: &BlockMatch, closer: &BlockMatch, selection: &Range<usize>) -> TagEdit {
        let next = self.dialect.next_variant(&opener.text, &closer.text);
        let closer_edit = Edit::replace(closer.range.clone(), next.closer.as_str(), EditKind::Closer);
        let opener_edit = Edit::replace(opener.range.clone(), next.opener.as_str(), EditKind::Opener);

        let shift = opener_edit.delta();
        TagEdit {
            selection: offset_by(selection.start, shift)..offset_by(selection.end, shift),
            closer: closer_edit,
            opener: opener_edit,
        }
    }

    /// Cycle or insert for one selection of `buffer`
    pub fn edit_selection<B: TextBuffer + ?Sized>(&self, buffer: &B, selection: &Range<usize>) -> TagEdit {
        let region = buffer.region(selection.clone());
        let blocks = self.find_surrounding_blocks(&region, selection);

        match blocks.pair() {
            Some((opener, closer)) => {
                log::trace!(
                    "cycling {:?}..{:?} around {:?}",
                    opener.text,
                    closer.text,
                    selection
                );
                self.cycle_block(opener, closer, selection)
            }
            None => {
                log::trace!("inserting tag around {:?}", selection);
                self.insert_block(selection)
            }
        }
    }

    /// Plan one cycle-or-insert action for every selection.
    ///
    /// Discovery runs on the buffer as given; nothing is modified. Two
    /// selections inside the same tag produce the same edits, which are kept
    /// once.
    pub fn run<B: TextBuffer + ?Sized>(&self, buffer: &B, selections: &[Range<usize>]) -> CyclePlan {
        let mut order: Vec<usize> = (0..selections.len()).collect();
        order.sort_by_key(|&i| selections[i].start);

        let mut tag_edits: Vec<Option<TagEdit>> = vec![None; selections.len()];
        let mut edits: Vec<Edit> = Vec::with_capacity(selections.len() * 2);
        for i in order {
            let tag_edit = self.edit_selection(buffer, &selections[i]);
            edits.push(tag_edit.opener.clone());
            edits.push(tag_edit.closer.clone());
            tag_edits[i] = Some(tag_edit);
        }

        // Inserts go before replacements starting at the same offset. Stable,
        // so an opener and closer inserted at one offset keep their order
        edits.sort_by_key(|e| (e.range.start, e.range.end));
        let mut unique: Vec<Edit> = Vec::with_capacity(edits.len());
        for edit in edits {
            if !unique.contains(&edit) {
                unique.push(edit);
            }
        }

        let new_selections = selections
            .iter()
            .zip(&tag_edits)
            .map(|(selection, tag_edit)| match tag_edit {
                Some(tag_edit) => {
                    let start = shift_through(&unique, &tag_edit.opener, selection.start, true);
                    let end = shift_through(&unique, &tag_edit.closer, selection.end, false);
                    start..end.max(start)
                }
                None => selection.clone(),
            })
            .collect();

        CyclePlan {
            edits: unique,
            selections: new_selections,
        }
    }
}

fn offset_by(offset: usize, delta: isize) -> usize {
    offset.saturating_add_signed(delta)
}

/// Map `offset` through the edits preceding `anchor` in `edits`, and through
/// `anchor` itself when `through_anchor` is set. Only edits ending at or
/// before `offset` move it.
fn shift_through(edits: &[Edit], anchor: &Edit, offset: usize, through_anchor: bool) -> usize {
    let mut delta = 0isize;
    for edit in edits {
        let is_anchor = edit == anchor;
        if is_anchor && !through_anchor {
            break;
        }
        if edit.range.end <= offset {
            delta += edit.delta();
        }
        if is_anchor {
            break;
        }
    }
    offset_by(offset, delta)
}
