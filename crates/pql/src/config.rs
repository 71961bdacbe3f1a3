//! Builder configuration.

use serde::{Deserialize, Serialize};

/// What to do when an alias is reused across sources and joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasPolicy {
    /// Log a warning and render both entities (default).
    #[default]
    Warn,
    /// Refuse to render; `get_phql` / `get_query` return `DuplicateAlias`.
    Reject,
}

/// Configuration for rendering and bind-key generation.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```ignore
/// let config: BuilderConfig = serde_json::from_str(r#"{"escape_identifiers": true}"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Column list rendered when none was set.
    pub default_columns: String,
    /// Prefix of generated bind keys (`AP0`, `AP1`, ...).
    pub placeholder_prefix: String,
    /// Alias collision handling.
    pub alias_policy: AliasPolicy,
    /// Wrap entity names and aliases in `[...]`.
    pub escape_identifiers: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            default_columns: "*".to_string(),
            placeholder_prefix: "AP".to_string(),
            alias_policy: AliasPolicy::Warn,
            escape_identifiers: false,
        }
    }
}

impl BuilderConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column list used when no columns are given.
    pub fn with_default_columns(mut self, columns: impl Into<String>) -> Self {
        self.default_columns = columns.into();
        self
    }

    /// Set the prefix of generated bind keys.
    pub fn with_placeholder_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.placeholder_prefix = prefix.into();
        self
    }

    /// Set the alias collision policy.
    pub fn with_alias_policy(mut self, policy: AliasPolicy) -> Self {
        self.alias_policy = policy;
        self
    }

    /// Escape entity names and aliases as `[Name]`.
    pub fn escape_identifiers(mut self) -> Self {
        self.escape_identifiers = true;
        self
    }

    /// Render entity names and aliases as given (default).
    pub fn raw_identifiers(mut self) -> Self {
        self.escape_identifiers = false;
        self
    }
}
