//! Extraction configuration.
//!
//! [`Config`] is the user-facing form, loaded from TOML. [`CompiledConfig`]
//! is what the resolver consults: the same settings with every exclusion
//! pattern compiled to a [`Regex`].
//!
//! ```toml
//! maxDepth = 10
//! useRawDocstring = true
//! ignoreTypes = ["List$"]
//! ignoreFields = ["\\.status$", "TypeMeta$"]
//! ignoreGroupVersions = ["^internal\\."]
//! ```

use regex::Regex;
use refdoc_schemas::NamespaceVersion;
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Default bound on pointer/slice/map/alias indirection.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Settings for an extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Maximum indirection depth before a type degrades to unknown.
    pub max_depth: usize,

    /// Patterns matched against type identities (`package.Name`).
    pub ignore_types: Vec<String>,

    /// Patterns matched against `package.Type.field`.
    pub ignore_fields: Vec<String>,

    /// Patterns matched against `namespace/version`.
    pub ignore_group_versions: Vec<String>,

    /// Prefer the verbatim documentation text, keeping line breaks and
    /// indentation.
    pub use_raw_docstring: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            ignore_types: Vec::new(),
            ignore_fields: Vec::new(),
            ignore_group_versions: Vec::new(),
            use_raw_docstring: false,
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ExtractError> {
        Ok(toml::from_str(text)?)
    }

    /// Compiles every exclusion pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::is_invalid_pattern`] naming the first pattern
    /// that is not a valid regular expression.
    pub fn compile(&self) -> Result<CompiledConfig, ExtractError> {
        Ok(CompiledConfig {
            max_depth: self.max_depth,
            use_raw_docstring: self.use_raw_docstring,
            ignore_types: compile_patterns(&self.ignore_types)?,
            ignore_fields: compile_patterns(&self.ignore_fields)?,
            ignore_group_versions: compile_patterns(
                &self.ignore_group_versions,
            )?,
        })
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ExtractError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ExtractError::invalid_pattern(p, e))
        })
        .collect()
}

fn matches_any(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|re| re.is_match(text))
}

/// Configuration with compiled exclusion patterns.
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub max_depth: usize,
    pub use_raw_docstring: bool,
    ignore_types: Vec<Regex>,
    ignore_fields: Vec<Regex>,
    ignore_group_versions: Vec<Regex>,
}

impl Default for CompiledConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            use_raw_docstring: false,
            ignore_types: Vec::new(),
            ignore_fields: Vec::new(),
            ignore_group_versions: Vec::new(),
        }
    }
}

impl CompiledConfig {
    pub fn ignores_type(&self, identity: &str) -> bool {
        matches_any(&self.ignore_types, identity)
    }

    /// `type_identity` is the identity of the struct declaring the field.
    pub fn ignores_field(&self, type_identity: &str, field: &str) -> bool {
        matches_any(&self.ignore_fields, &format!("{type_identity}.{field}"))
    }

    pub fn ignores_group_version(&self, id: &NamespaceVersion) -> bool {
        matches_any(&self.ignore_group_versions, &id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_keys_missing() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_parse_camel_case_keys() {
        let config = Config::from_toml_str(
            r#"
            maxDepth = 3
            useRawDocstring = true
            ignoreTypes = ["List$"]
            ignoreFields = ["\\.status$"]
            ignoreGroupVersions = ["^internal\\."]
            "#,
        )
        .unwrap();

        assert_eq!(config.max_depth, 3);
        assert!(config.use_raw_docstring);
        assert_eq!(config.ignore_types, ["List$"]);
        assert_eq!(config.ignore_fields, ["\\.status$"]);
    }

    #[test]
    fn test_unknown_value_type_is_config_error() {
        let err = Config::from_toml_str("maxDepth = \"deep\"").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_compiled_matchers() {
        let config = Config {
            ignore_types: vec!["GuestbookList$".into()],
            ignore_fields: vec!["Guestbook\\.status$".into()],
            ignore_group_versions: vec!["^internal\\.test/".into()],
            ..Config::default()
        }
        .compile()
        .unwrap();

        assert!(config.ignores_type("example.com/v1.GuestbookList"));
        assert!(!config.ignores_type("example.com/v1.Guestbook"));

        assert!(config.ignores_field("example.com/v1.Guestbook", "status"));
        assert!(!config.ignores_field("example.com/v1.Guestbook", "spec"));
        assert!(
            !config.ignores_field("example.com/v1.GuestbookSpec", "statuses")
        );

        assert!(
            config.ignores_group_version(&NamespaceVersion::new(
                "internal.test",
                "v1"
            ))
        );
        assert!(
            !config.ignores_group_version(&NamespaceVersion::new(
                "webapp.test",
                "v1"
            ))
        );
    }

    #[test]
    fn test_invalid_pattern_names_pattern() {
        let err = Config {
            ignore_fields: vec!["[oops".into()],
            ..Config::default()
        }
        .compile()
        .unwrap_err();

        assert!(err.is_invalid_pattern());
        assert!(err.to_string().contains("[oops"));
    }
}
