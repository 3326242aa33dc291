//! Built-in dialects and name resolution
//!
//! Four templating families ship with the crate. Each is reachable through a
//! canonical id and a handful of language names:
//!
//! ```text
//! erb            <% %>   erb, underscore, ejs
//! mustache       {{ }}   mustache, handlebars, angular
//! brace-percent  {  }    jinja, twig, nunjucks
//! php            <? ?>   php
//! ```
//!
//! A [`DialectRegistry`] holds compiled dialects by lowercase name. User
//! dialects from configuration are added on top of the built-ins.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

use super::grammar::{AddonPair, Dialect, GrammarError};

const ERB_ADDONS: &[(&str, &str)] = &[
    ("", ""),
    ("=", ""),
    ("#", ""),
    ("-", "-"),
    ("=", "-"),
    ("", "-"),
];
const MUSTACHE_ADDONS: &[(&str, &str)] = &[];
const BRACE_PERCENT_ADDONS: &[(&str, &str)] = &[("%", "%"), ("{", "}")];
const PHP_ADDONS: &[(&str, &str)] = &[("", ""), ("=", ""), ("#", ""), ("php", "")];

/// The built-in dialects, compiled once per process
static BUILTIN: Lazy<DialectRegistry> = Lazy::new(|| {
    let mut registry = DialectRegistry::empty();
    for id in DialectId::ALL {
        let dialect = id.dialect();
        for alias in id.aliases() {
            registry.insert(alias, dialect.clone());
        }
        registry.insert(id.as_str(), dialect);
    }
    registry
});

/// The built-in dialect families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectId {
    /// ERB, Underscore, EJS
    Erb,
    /// Mustache, Handlebars, Angular
    Mustache,
    /// Jinja, Twig, Nunjucks
    BracePercent,
    /// PHP
    Php,
}

impl DialectId {
    pub const ALL: [DialectId; 4] = [
        DialectId::Erb,
        DialectId::Mustache,
        DialectId::BracePercent,
        DialectId::Php,
    ];

    /// Canonical id, as used in configuration
    pub fn as_str(self) -> &'static str {
        match self {
            DialectId::Erb => "erb",
            DialectId::Mustache => "mustache",
            DialectId::BracePercent => "brace-percent",
            DialectId::Php => "php",
        }
    }

    /// Language names that select this dialect
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            DialectId::Erb => &["erb", "underscore", "ejs"],
            DialectId::Mustache => &["mustache", "handlebars", "angular"],
            DialectId::BracePercent => &["jinja", "twig", "nunjucks"],
            DialectId::Php => &["php"],
        }
    }

    /// Pick a dialect from an editor syntax name and an optional file name.
    ///
    /// The first syntax keyword found wins; an `erb` file name always wins.
    pub fn sniff(syntax: &str, file_name: Option<&str>) -> DialectId {
        const KEYWORDS: [(&str, DialectId); 6] = [
            ("javascript", DialectId::Erb),
            ("angularjs", DialectId::Mustache),
            ("python", DialectId::BracePercent),
            ("ruby", DialectId::Erb),
            ("rails", DialectId::Erb),
            ("php", DialectId::Php),
        ];

        let syntax = syntax.to_lowercase();
        let mut id = KEYWORDS
            .iter()
            .find(|(keyword, _)| syntax.contains(keyword))
            .map_or(DialectId::Erb, |(_, id)| *id);

        if let Some(file_name) = file_name {
            if file_name.to_lowercase().ends_with("erb") {
                id = DialectId::Erb;
            }
        }

        id
    }

    /// The opener, closer and addon table of this dialect
    pub fn table(self) -> DialectTable {
        let (opener, closer, addons) = match self {
            DialectId::Erb => ("<%", "%>", ERB_ADDONS),
            DialectId::Mustache => ("{{", "}}", MUSTACHE_ADDONS),
            DialectId::BracePercent => ("{", "}", BRACE_PERCENT_ADDONS),
            DialectId::Php => ("<?", "?>", PHP_ADDONS),
        };

        DialectTable {
            opener: opener.to_string(),
            closer: closer.to_string(),
            addons: addons
                .iter()
                .map(|(l, r)| (l.to_string(), r.to_string()))
                .collect(),
            aliases: self.aliases().iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Compile this dialect
    pub fn dialect(self) -> Dialect {
        self.table()
            .compile()
            .unwrap_or_else(|e| unreachable!("built-in dialect {} is invalid: {}", self, e))
    }
}

impl fmt::Display for DialectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable description of a dialect, as found in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DialectTable {
    pub opener: String,
    pub closer: String,
    #[serde(default)]
    pub addons: Vec<(String, String)>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl DialectTable {
    pub fn compile(&self) -> Result<Dialect, GrammarError> {
        let addons = self
            .addons
            .iter()
            .map(|(l, r)| AddonPair::new(l.as_str(), r.as_str()))
            .collect();
        Dialect::new(self.opener.as_str(), self.closer.as_str(), addons)
    }
}

/// Compiled dialects by lowercase name.
#[derive(Debug, Clone)]
pub struct DialectRegistry {
    dialects: BTreeMap<String, Dialect>,
}

impl DialectRegistry {
    /// A registry with no dialects
    pub fn empty() -> Self {
        Self {
            dialects: BTreeMap::new(),
        }
    }

    /// The four built-in dialects, under their ids and aliases
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Compile a table and register it under `name` and its aliases.
    ///
    /// Existing entries with the same names are replaced.
    pub fn register(&mut self, name: &str, table: &DialectTable) -> Result<(), GrammarError> {
        let dialect = table.compile()?;
        for alias in &table.aliases {
            self.insert(alias, dialect.clone());
        }
        self.insert(name, dialect);
        Ok(())
    }

    fn insert(&mut self, name: &str, dialect: Dialect) {
        self.dialects.insert(name.to_lowercase(), dialect);
    }

    pub fn get(&self, name: &str) -> Option<&Dialect> {
        self.dialects.get(&name.to_lowercase())
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dialects.keys().map(String::as_str)
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templater::grammar::Variant;

    #[test]
    fn test_builtin_names_resolve_ignoring_case() {
        let registry = DialectRegistry::builtin();
        for (name, opener) in [
            ("EJS", "<%"),
            ("handlebars", "{{"),
            ("brace-percent", "{"),
            ("Twig", "{"),
            ("PHP", "<?"),
        ] {
            assert_eq!(registry.get(name).map(Dialect::opener), Some(opener), "{}", name);
        }
        assert!(registry.get("haml").is_none());
    }

    #[test]
    fn test_sniff_syntax() {
        assert_eq!(DialectId::sniff("Packages/JavaScript/JavaScript.sublime-syntax", None), DialectId::Erb);
        assert_eq!(DialectId::sniff("AngularJS", None), DialectId::Mustache);
        assert_eq!(DialectId::sniff("Python Django", None), DialectId::BracePercent);
        assert_eq!(DialectId::sniff("Ruby on Rails", None), DialectId::Erb);
        assert_eq!(DialectId::sniff("PHP", None), DialectId::Php);
        assert_eq!(DialectId::sniff("Plain Text", None), DialectId::Erb);
    }

    #[test]
    fn test_sniff_erb_file_wins() {
        assert_eq!(DialectId::sniff("PHP", Some("views/index.html.ERB")), DialectId::Erb);
        assert_eq!(DialectId::sniff("PHP", Some("index.php")), DialectId::Php);
    }

    #[test]
    fn test_builtin_tables_compile() {
        for id in DialectId::ALL {
            assert!(id.table().compile().is_ok(), "{} failed to compile", id);
        }
    }

    #[test]
    fn test_registry_aliases_share_dialect() {
        let registry = DialectRegistry::builtin();
        let jinja = registry.get("Jinja").unwrap();
        assert_eq!(jinja.opener(), "{");
        assert_eq!(jinja.variant_sequence()[0], Variant::new("{%", "%}"));
        assert!(registry.get("brace-percent").is_some());
        assert!(registry.get("haml").is_none());
    }

    #[test]
    fn test_register_user_dialect() {
        let mut registry = DialectRegistry::builtin();
        let table = DialectTable {
            opener: "[[".to_string(),
            closer: "]]".to_string(),
            addons: vec![("".to_string(), "".to_string()), ("!".to_string(), "".to_string())],
            aliases: vec!["Brackets".to_string()],
        };
        registry.register("wiki", &table).unwrap();

        let wiki = registry.get("brackets").unwrap();
        assert_eq!(wiki.variant_sequence()[1], Variant::new("[[!", "]]"));
        assert!(registry.names().any(|n| n == "wiki"));
    }

    #[test]
    fn test_register_invalid_dialect() {
        let mut registry = DialectRegistry::empty();
        let table = DialectTable {
            opener: String::new(),
            closer: "]]".to_string(),
            addons: vec![],
            aliases: vec![],
        };
        assert!(registry.register("broken", &table).is_err());
        assert_eq!(registry.names().count(), 0);
    }
}
