//! Dialect Grammar
//!
//! Turns a dialect's sparse table of addon symbols into opener/closer matchers
//! and an ordered, cyclic list of tag variants.
//!
//! ## Terminology
//!
//! Take the ERB family, with tags such as `<% %>` and `<%= %>`:
//!
//! - the opener `<%` is common to every tag of the dialect, as is the closer `%>`
//! - an addon pair such as `("=", "")` is appended to the opener and prepended
//!   to the closer to form one variant, here `<%= %>`
//! - a block is an opener plus its addon, or an addon plus the closer
//!
//! ## Design
//!
//! Matchers are compiled once, when the [`Dialect`] is built. Cycling never
//! carries a position between calls: [`Dialect::next_variant`] finds the
//! current variant by value in the matched text and returns the one after it.

use regex::escape;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use super::matcher::DelimiterMatcher;

/// Errors raised while building a dialect. Cycling itself never fails.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("dialect {0} must not be empty")]
    EmptyDelimiter(&'static str),

    #[error("addon symbol {symbol:?} spans a line break")]
    MultilineSymbol { symbol: String },

    #[error("invalid delimiter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Which side of a tag an addon symbol attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Suffix of the opener
    Left,
    /// Prefix of the closer
    Right,
}

/// The opener suffix and closer prefix that make up one variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddonPair {
    pub left: String,
    pub right: String,
}

impl AddonPair {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    /// The pair with nothing on either side
    pub fn empty() -> Self {
        Self::new("", "")
    }

    pub fn symbol(&self, position: Position) -> &str {
        match position {
            Position::Left => &self.left,
            Position::Right => &self.right,
        }
    }
}

impl From<(&str, &str)> for AddonPair {
    fn from((left, right): (&str, &str)) -> Self {
        Self::new(left, right)
    }
}

/// A concrete opener/closer combination, e.g. `("<%=", "%>")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Variant {
    pub opener: String,
    pub closer: String,
}

impl Variant {
    pub fn new(opener: impl Into<String>, closer: impl Into<String>) -> Self {
        Self {
            opener: opener.into(),
            closer: closer.into(),
        }
    }
}

/// Build the regex fragment matching any addon symbol at `position`.
///
/// Multi-character symbols come first, longest first, so that a symbol is
/// never cut short by a one-character symbol it starts with. The fragment is
/// optional when an empty symbol occurs at that position. Returns an empty
/// string when the position carries no symbols at all.
pub fn build_addon_class(position: Position, addons: &[AddonPair]) -> String {
    let symbols: BTreeSet<&str> = addons.iter().map(|a| a.symbol(position)).collect();
    let can_be_empty = addons.is_empty() || symbols.contains("");

    let mut multis: Vec<&str> = symbols.iter().copied().filter(|s| s.chars().count() > 1).collect();
    multis.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let singles: Vec<&str> = symbols.iter().copied().filter(|s| s.chars().count() == 1).collect();

    let mut alternatives: Vec<String> = multis.iter().map(|s| escape(s)).collect();
    if !singles.is_empty() {
        let class: String = singles.iter().map(|s| escape(s)).collect();
        alternatives.push(format!("[{}]", class));
    }

    if alternatives.is_empty() {
        return String::new();
    }

    let group = format!("(?:{})", alternatives.join("|"));
    if can_be_empty {
        group + "?"
    } else {
        group
    }
}

/// A templating dialect with its compiled matchers and variant sequence.
///
/// `Dialect` is immutable once built. Switching dialects means building (or
/// cloning) a new one, which also restarts the insert default.
#[derive(Debug, Clone)]
pub struct Dialect {
    opener: String,
    closer: String,
    addons: Vec<AddonPair>,
    variants: Vec<Variant>,
    opener_matcher: DelimiterMatcher,
    closer_matcher: DelimiterMatcher,
    insert_index: usize,
}

impl Dialect {
    /// Compile a dialect from its opener, closer and ordered addon table.
    ///
    /// An empty addon table means a single variant: the bare opener and closer.
    pub fn new(
        opener: impl Into<String>,
        closer: impl Into<String>,
        addons: Vec<AddonPair>,
    ) -> Result<Self, GrammarError> {
        let opener = opener.into();
        let closer = closer.into();

        if opener.is_empty() {
            return Err(GrammarError::EmptyDelimiter("opener"));
        }
        if closer.is_empty() {
            return Err(GrammarError::EmptyDelimiter("closer"));
        }
        let delimiters = [opener.as_str(), closer.as_str()];
        let symbols = addons.iter().flat_map(|a| [a.left.as_str(), a.right.as_str()]);
        if let Some(bad) = delimiters
            .into_iter()
            .chain(symbols)
            .find(|s| s.contains(['\n', '\r']))
        {
            return Err(GrammarError::MultilineSymbol {
                symbol: bad.to_string(),
            });
        }

        let opener_pattern = escape(&opener) + &build_addon_class(Position::Left, &addons);
        let closer_pattern = build_addon_class(Position::Right, &addons) + &escape(&closer);

        let opener_matcher = DelimiterMatcher::new(&opener_pattern)?.with_guard(&closer);
        let closer_matcher = DelimiterMatcher::new(&closer_pattern)?;

        let variants = if addons.is_empty() {
            vec![Variant::new(opener.clone(), closer.clone())]
        } else {
            addons
                .iter()
                .map(|a| Variant::new(format!("{}{}", opener, a.left), format!("{}{}", a.right, closer)))
                .collect()
        };

        Ok(Self {
            opener,
            closer,
            addons,
            variants,
            opener_matcher,
            closer_matcher,
            insert_index: 0,
        })
    }

    /// Use the variant at `index` (modulo the variant count) when inserting
    pub fn with_insert_variant(mut self, index: usize) -> Self {
        self.insert_index = index % self.variants.len();
        self
    }

    pub fn opener(&self) -> &str {
        &self.opener
    }

    pub fn closer(&self) -> &str {
        &self.closer
    }

    pub fn addons(&self) -> &[AddonPair] {
        &self.addons
    }

    /// Matches an opener block. Openers followed by the closer are rejected.
    pub fn opener_matcher(&self) -> &DelimiterMatcher {
        &self.opener_matcher
    }

    /// Matches a closer block
    pub fn closer_matcher(&self) -> &DelimiterMatcher {
        &self.closer_matcher
    }

    /// Every variant, in cycle order. Never empty.
    pub fn variant_sequence(&self) -> &[Variant] {
        &self.variants
    }

    /// Position of the variant whose texts equal the given pair, if any
    pub fn variant_index(&self, opener: &str, closer: &str) -> Option<usize> {
        self.variants
            .iter()
            .position(|v| v.opener == opener && v.closer == closer)
    }

    /// The variant inserted around a selection with no surrounding tag
    pub fn insert_variant(&self) -> &Variant {
        &self.variants[self.insert_index]
    }

    /// The variant following the given pair, wrapping after the last one.
    ///
    /// A pair that is not a known variant yields the first variant, so cycling
    /// repairs a hand-edited tag to its canonical form.
    pub fn next_variant(&self, opener: &str, closer: &str) -> &Variant {
        match self.variant_index(opener, closer) {
            Some(i) => &self.variants[(i + 1) % self.variants.len()],
            None => {
                log::debug!(
                    "unknown variant {:?} {:?}, falling back to {:?}",
                    opener,
                    closer,
                    self.variants[0]
                );
                &self.variants[0]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn erb_addons() -> Vec<AddonPair> {
        [("", ""), ("=", ""), ("#", ""), ("-", "-"), ("=", "-"), ("", "-")]
            .into_iter()
            .map(AddonPair::from)
            .collect()
    }

    #[test]
    fn test_addon_class_optional_singles() {
        let class = build_addon_class(Position::Left, &erb_addons());
        assert_eq!(class, r"(?:[\#\-=])?");
    }

    #[test]
    fn test_addon_class_right_side() {
        let class = build_addon_class(Position::Right, &erb_addons());
        assert_eq!(class, r"(?:[\-])?");
    }

    #[test]
    fn test_addon_class_required() {
        let addons = vec![AddonPair::new("%", "%"), AddonPair::new("{", "}")];
        assert_eq!(build_addon_class(Position::Left, &addons), r"(?:[%\{])");
        assert_eq!(build_addon_class(Position::Right, &addons), r"(?:[%\}])");
    }

    #[test]
    fn test_addon_class_multis_first_longest_first() {
        let addons = vec![
            AddonPair::new("-", ""),
            AddonPair::new("--", ""),
            AddonPair::new("php", ""),
            AddonPair::new("", ""),
        ];
        assert_eq!(
            build_addon_class(Position::Left, &addons),
            r"(?:php|\-\-|[\-])?"
        );
    }

    #[test]
    fn test_addon_class_empty_table() {
        assert_eq!(build_addon_class(Position::Left, &[]), "");
        assert_eq!(build_addon_class(Position::Right, &[]), "");
    }

    #[test]
    fn test_addon_class_only_empty_symbols() {
        let addons = vec![AddonPair::new("=", ""), AddonPair::empty()];
        assert_eq!(build_addon_class(Position::Right, &addons), "");
    }

    #[test]
    fn test_variant_sequence_without_addons() {
        let dialect = Dialect::new("{{", "}}", vec![]).unwrap();
        assert_eq!(dialect.variant_sequence(), &[Variant::new("{{", "}}")]);
    }

    #[test]
    fn test_variant_sequence_order() {
        let dialect = Dialect::new("<%", "%>", erb_addons()).unwrap();
        let variants = dialect.variant_sequence();
        assert_eq!(variants.len(), 6);
        assert_eq!(variants[0], Variant::new("<%", "%>"));
        assert_eq!(variants[1], Variant::new("<%=", "%>"));
        assert_eq!(variants[3], Variant::new("<%-", "-%>"));
        assert_eq!(variants[5], Variant::new("<%", "-%>"));
    }

    #[test]
    fn test_next_variant_advances_and_wraps() {
        let dialect = Dialect::new("<%", "%>", erb_addons()).unwrap();
        assert_eq!(dialect.next_variant("<%", "%>"), &Variant::new("<%=", "%>"));
        assert_eq!(dialect.next_variant("<%", "-%>"), &Variant::new("<%", "%>"));
    }

    #[test]
    fn test_next_variant_unknown_falls_back() {
        let dialect = Dialect::new("<%", "%>", erb_addons()).unwrap();
        assert_eq!(dialect.next_variant("<%#", "-%>"), &Variant::new("<%", "%>"));
    }

    #[test]
    fn test_single_variant_cycles_to_itself() {
        let dialect = Dialect::new("{{", "}}", vec![]).unwrap();
        assert_eq!(dialect.next_variant("{{", "}}"), &Variant::new("{{", "}}"));
    }

    #[test]
    fn test_insert_variant_wraps() {
        let dialect = Dialect::new("<%", "%>", erb_addons())
            .unwrap()
            .with_insert_variant(7);
        assert_eq!(dialect.insert_variant(), &Variant::new("<%=", "%>"));
    }

    #[test]
    fn test_opener_pattern() {
        let dialect = Dialect::new("<%", "%>", erb_addons()).unwrap();
        assert_eq!(dialect.opener_matcher().pattern(), r"<%(?:[\#\-=])?");
        assert_eq!(dialect.opener_matcher().guard(), Some("%>"));
        assert_eq!(dialect.closer_matcher().pattern(), r"(?:[\-])?%>");
    }

    #[test]
    fn test_empty_delimiters_rejected() {
        assert!(matches!(
            Dialect::new("", "%>", vec![]),
            Err(GrammarError::EmptyDelimiter("opener"))
        ));
        assert!(matches!(
            Dialect::new("<%", "", vec![]),
            Err(GrammarError::EmptyDelimiter("closer"))
        ));
    }

    #[test]
    fn test_multiline_symbol_rejected() {
        let result = Dialect::new("<%", "%>", vec![AddonPair::new("\n", "")]);
        assert!(matches!(result, Err(GrammarError::MultilineSymbol { .. })));
    }
}
