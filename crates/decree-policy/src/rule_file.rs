//! Rule file schema.
//!
//! A `RuleFile` is deserialized from TOML and holds an ordered list of
//! `RuleEntry`s. Each entry attaches one rule expression to a set of
//! abilities as an enable or prevent obligation, or to every ability as a
//! prevent-all rule. Entries keep their declaration order, which is the
//! order their steps are declared in.

use serde::{Deserialize, Serialize};

use decree_core::Rule;

/// The `action` value marking a rule that prevents every ability.
pub const PREVENT_ALL: &str = "prevent_all";

/// A single rule loaded from TOML.
///
/// The `rule` field is the serde form of [`Rule`]: an inline table with
/// exactly one of `condition`, `ability`, `delegated`, `all`, `any`, `not`.
///
/// Example in TOML:
/// ```toml
/// [[rules]]
/// action = "enable"
/// abilities = ["read_issue", "update_issue"]
/// rule = { all = [{ condition = "author" }, { not = { condition = "locked" } }] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    /// `"enable"`, `"prevent"` or `"prevent_all"`. Validated when applied.
    pub action: String,

    /// Abilities the rule attaches to. Must be empty for `prevent_all`.
    #[serde(default)]
    pub abilities: Vec<String>,

    pub rule: Rule,

    /// Free-form note for whoever maintains the file.
    #[serde(default)]
    pub description: Option<String>,
}

impl RuleEntry {
    pub fn is_prevent_all(&self) -> bool {
        self.action == PREVENT_ALL
    }
}

/// The top-level structure deserialized from a TOML rule file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}
