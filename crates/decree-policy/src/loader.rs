//! Loading rule files onto policy builders.
//!
//! `TomlRuleLoader` parses a `RuleFile` from a TOML string or file and
//! attaches every entry to a `PolicyBuilder`:
//!
//! 1. `action = "prevent_all"` entries become prevent-all rules. They must
//!    not name abilities.
//! 2. Any other action is parsed as an `Action` (`InvalidAction` on
//!    failure) and attached to every listed ability. An entry listing no
//!    abilities is rejected.
//!
//! Conditions are not checked here: they may be declared by a parent policy
//! that is only known at registration time.

use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use decree_contracts::{
    action::Action,
    error::{PolicyError, PolicyResult},
};
use decree_core::PolicyBuilder;

use crate::rule_file::{RuleEntry, RuleFile};

/// Rule entries read from a TOML document, ready to be applied.
///
/// ```rust,ignore
/// use decree_policy::TomlRuleLoader;
///
/// let loader = TomlRuleLoader::from_file(Path::new("policies/issue.toml"))?;
/// let issue = loader.apply(PolicyBuilder::new("issue").inherits("issuable"))?;
/// ```
#[derive(Debug)]
pub struct TomlRuleLoader {
    file: RuleFile,
}

impl TomlRuleLoader {
    /// Parse `s` as a TOML rule file.
    ///
    /// Returns `PolicyError::ConfigError` if the TOML is malformed or does
    /// not match the `RuleFile` schema.
    pub fn from_toml_str(s: &str) -> PolicyResult<Self> {
        let file: RuleFile = toml::from_str(s).map_err(|e| PolicyError::ConfigError {
            reason: format!("failed to parse rule TOML: {}", e),
        })?;
        Ok(Self { file })
    }

    /// Read the file at `path` and parse it as a TOML rule file.
    pub fn from_file(path: &Path) -> PolicyResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| PolicyError::ConfigError {
            reason: format!("failed to read rule file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn rules(&self) -> &[RuleEntry] {
        &self.file.rules
    }

    /// Attach every entry, in declaration order, to `builder`.
    pub fn apply(&self, mut builder: PolicyBuilder) -> PolicyResult<PolicyBuilder> {
        for (index, entry) in self.file.rules.iter().enumerate() {
            builder = Self::apply_entry(builder, index, entry)?;
        }
        info!(
            policy = %builder.name(),
            rules = self.file.rules.len(),
            "applied rule file"
        );
        Ok(builder)
    }

    fn apply_entry(builder: PolicyBuilder, index: usize, entry: &RuleEntry) -> PolicyResult<PolicyBuilder> {
        debug!(
            policy = %builder.name(),
            index,
            action = %entry.action,
            rule = %entry.rule,
            "attaching rule"
        );

        if entry.is_prevent_all() {
            if !entry.abilities.is_empty() {
                return Err(PolicyError::ConfigError {
                    reason: format!(
                        "rule #{} in policy '{}': prevent_all rules apply to every ability and must not list abilities",
                        index,
                        builder.name()
                    ),
                });
            }
            return Ok(builder.prevent_all(entry.rule.clone()));
        }

        let action = Action::from_str(&entry.action)?;
        if entry.abilities.is_empty() {
            return Err(PolicyError::ConfigError {
                reason: format!(
                    "rule #{} in policy '{}': {} rule lists no abilities",
                    index,
                    builder.name(),
                    action
                ),
            });
        }
        Ok(builder.attach(action, entry.abilities.iter(), entry.rule.clone()))
    }
}
