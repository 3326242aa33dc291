//! Shared configuration loader for templater.
//!
//! `defaults/templater.default.toml` is embedded into every binary so that docs
//! and runtime behavior stay in sync. Applications layer user-specific files on
//! top of those defaults via [`Loader`] before deserializing into
//! [`TemplaterConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use templater::templater::{DialectRegistry, DialectTable, GrammarError, Session};

const DEFAULT_TOML: &str = include_str!("../defaults/templater.default.toml");

/// Top-level configuration consumed by templater applications.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplaterConfig {
    pub cycle: CycleConfig,
    #[serde(default)]
    pub dialects: BTreeMap<String, DialectTable>,
}

/// Behavior of the cycle-or-insert action.
#[derive(Debug, Clone, Deserialize)]
pub struct CycleConfig {
    pub default_dialect: String,
    pub insert_variant: usize,
}

impl TemplaterConfig {
    /// Built-in dialects plus every dialect defined in the configuration
    pub fn registry(&self) -> Result<DialectRegistry, GrammarError> {
        let mut registry = DialectRegistry::builtin();
        for (name, table) in &self.dialects {
            registry.register(name, table)?;
        }
        Ok(registry)
    }

    /// A session over [`Self::registry`] with the configured defaults applied.
    ///
    /// An unknown `default_dialect` leaves the session on ERB.
    pub fn session(&self) -> Result<Session, GrammarError> {
        let mut session =
            Session::with_registry(self.registry()?).with_insert_variant(self.cycle.insert_variant);
        session.set_active_dialect(&self.cycle.default_dialect);
        Ok(session)
    }
}

/// File name of the per-project configuration picked up next to templates.
pub const PROJECT_FILE: &str = "templater.toml";

/// Layers configuration sources over the embedded defaults.
///
/// Later layers win: defaults, the project file, an explicit file, then
/// single-key overrides.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            builder: Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml)),
        }
    }

    /// Layer the file at `path`; building fails if it does not exist.
    pub fn with_file(self, path: impl AsRef<Path>) -> Self {
        self.layer(path.as_ref(), true)
    }

    /// Layer [`PROJECT_FILE`] from `dir` when the directory has one.
    pub fn with_project_dir(self, dir: impl AsRef<Path>) -> Self {
        self.layer(&dir.as_ref().join(PROJECT_FILE), false)
    }

    fn layer(mut self, path: &Path, required: bool) -> Self {
        let source = File::from(path).format(FileFormat::Toml).required(required);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Override one key, e.g. `cycle.insert_variant` from a command-line flag.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<TemplaterConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<TemplaterConfig, ConfigError> {
    Loader::new().build()
}
