//! Editing session
//!
//! A [`Session`] owns the dialect that is active for one document and exposes
//! the two user actions: switching the dialect and cycling at the selections.
//! The host drives it from a single interaction stream, so the active dialect
//! is a plain field: the last switch wins and every later action sees it.

use std::ops::Range;

use super::buffer::{BufferError, TextBuffer};
use super::cycler::{CyclePlan, TagCycler};
use super::dialects::{DialectId, DialectRegistry};
use super::grammar::Dialect;

#[derive(Debug, Clone)]
pub struct Session {
    registry: DialectRegistry,
    active_name: String,
    active: Dialect,
    insert_variant: usize,
}

impl Session {
    /// A session over the built-in dialects, starting with ERB
    pub fn new() -> Self {
        Self::with_registry(DialectRegistry::builtin())
    }

    /// A session over `registry`, starting with ERB
    pub fn with_registry(registry: DialectRegistry) -> Self {
        let active = registry
            .get(DialectId::Erb.as_str())
            .cloned()
            .unwrap_or_else(|| DialectId::Erb.dialect());
        Self {
            registry,
            active_name: DialectId::Erb.as_str().to_string(),
            active,
            insert_variant: 0,
        }
    }

    /// Insert the variant at `index` instead of the first one.
    ///
    /// Applies to the active dialect and to every dialect switched to later.
    pub fn with_insert_variant(mut self, index: usize) -> Self {
        self.insert_variant = index;
        self.active = self.active.with_insert_variant(index);
        self
    }

    pub fn registry(&self) -> &DialectRegistry {
        &self.registry
    }

    pub fn active_dialect(&self) -> &Dialect {
        &self.active
    }

    pub fn active_name(&self) -> &str {
        &self.active_name
    }

    /// Make the dialect registered under `name` active.
    ///
    /// Unknown names leave the current dialect in place and return `false`.
    pub fn set_active_dialect(&mut self, name: &str) -> bool {
        match self.registry.get(name) {
            Some(dialect) => {
                log::debug!("switching dialect {} -> {}", self.active_name, name);
                self.active = dialect.clone().with_insert_variant(self.insert_variant);
                self.active_name = name.to_lowercase();
                true
            }
            None => {
                log::warn!("unknown dialect {:?}, keeping {}", name, self.active_name);
                false
            }
        }
    }

    /// Sniff the dialect from a syntax name and file name and make it active
    pub fn detect_dialect(&mut self, syntax: &str, file_name: Option<&str>) -> DialectId {
        let id = DialectId::sniff(syntax, file_name);
        self.set_active_dialect(id.as_str());
        id
    }

    /// Plan the action for `selections` without touching the buffer
    pub fn plan<B: TextBuffer + ?Sized>(&self, buffer: &B, selections: &[Range<usize>]) -> CyclePlan {
        TagCycler::new(&self.active).run(buffer, selections)
    }

    /// Cycle or insert a tag at every selection of `buffer`.
    ///
    /// The buffer's selections are replaced by the returned ones. With no
    /// selections nothing happens.
    pub fn cycle_or_insert_at_selections<B: TextBuffer + ?Sized>(
        &self,
        buffer: &mut B,
    ) -> Result<Vec<Range<usize>>, BufferError> {
        let selections = buffer.selections();
        if selections.is_empty() {
            return Ok(selections);
        }

        let plan = self.plan(buffer, &selections);
        buffer.apply_edits(&plan.edits)?;
        buffer.set_selections(plan.selections.clone());
        Ok(plan.selections)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templater::buffer::Buffer;

    #[test]
    fn test_default_is_erb() {
        let session = Session::new();
        assert_eq!(session.active_name(), "erb");
        assert_eq!(session.active_dialect().opener(), "<%");
    }

    #[test]
    fn test_unknown_dialect_is_ignored() {
        let mut session = Session::new();
        assert!(session.set_active_dialect("Twig"));
        assert!(!session.set_active_dialect("haml"));
        assert_eq!(session.active_name(), "twig");
        assert_eq!(session.active_dialect().opener(), "{");
    }

    #[test]
    fn test_detect_dialect() {
        let mut session = Session::new();
        assert_eq!(session.detect_dialect("PHP", Some("index.php")), DialectId::Php);
        assert_eq!(session.active_dialect().opener(), "<?");
    }

    #[test]
    fn test_no_selections_is_noop() {
        let session = Session::new();
        let mut buffer = Buffer::new("<% a %>");
        let selections = session.cycle_or_insert_at_selections(&mut buffer).unwrap();
        assert!(selections.is_empty());
        assert_eq!(buffer.text(), "<% a %>");
    }

    #[test]
    fn test_cycle_updates_buffer_and_selections() {
        let session = Session::new();
        let mut buffer = Buffer::new("<% foo %>").with_selections([3..6]).unwrap();
        let selections = session.cycle_or_insert_at_selections(&mut buffer).unwrap();
        assert_eq!(buffer.text(), "<%= foo %>");
        assert_eq!(selections, vec![4..7]);
        assert_eq!(buffer.selections(), vec![4..7]);
    }

    #[test]
    fn test_insert_variant_survives_switch() {
        let mut session = Session::new().with_insert_variant(1);
        session.set_active_dialect("php");
        let mut buffer = Buffer::new("x").with_selections([0..1]).unwrap();
        session.cycle_or_insert_at_selections(&mut buffer).unwrap();
        assert_eq!(buffer.text(), "<?= x ?>");
    }
}
