//! # decree-policy
//!
//! TOML-driven configuration for the DECREE engine.
//!
//! ## Overview
//!
//! - [`load_engine_config`] reads the engine tunables (`preferred_scope`,
//!   `static_sort_threshold`).
//! - [`TomlRuleLoader`] reads a rule file and attaches its rules to a
//!   [`PolicyBuilder`](decree_core::PolicyBuilder). Predicates stay in code;
//!   only the wiring of conditions to abilities lives in the file.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use decree_policy::{load_engine_config_file, TomlRuleLoader};
//!
//! let config = load_engine_config_file(Path::new("decree.toml"))?;
//! let project = TomlRuleLoader::from_file(Path::new("policies/project.toml"))?
//!     .apply(PolicyBuilder::new("project").condition(member))?;
//! ```
//!
//! ## Rule expressions
//!
//! A rule is an inline table with one key: `condition`, `ability`,
//! `delegated`, `all`, `any` or `not`. Rules nest freely:
//!
//! ```toml
//! [[rules]]
//! action = "enable"
//! abilities = ["update_issue"]
//! rule = { any = [{ condition = "author" }, { delegated = { delegate = "project", condition = "maintainer" } }] }
//! ```

pub mod config;
pub mod loader;
pub mod rule_file;

pub use config::{load_engine_config, load_engine_config_file};
pub use loader::TomlRuleLoader;
pub use rule_file::{RuleEntry, RuleFile};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::Path;

    use decree_contracts::{action::Action, error::PolicyError, scope::Scope};
    use decree_core::{ability, all, condition, delegated, PolicyBuilder, PolicyDescriptor};

    use crate::{load_engine_config, load_engine_config_file, TomlRuleLoader};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Apply `toml` to an empty policy and compose it without a parent.
    fn compose(toml: &str) -> PolicyDescriptor {
        let loader = TomlRuleLoader::from_toml_str(toml).unwrap();
        let builder = loader.apply(PolicyBuilder::new("issue")).unwrap();
        PolicyDescriptor::compose(None, builder)
    }

    fn config_error_reason<T: std::fmt::Debug>(result: Result<T, PolicyError>) -> String {
        match result {
            Err(PolicyError::ConfigError { reason }) => reason,
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    // ── 1. Engine config ──────────────────────────────────────────────────────

    #[test]
    fn test_engine_config_defaults() {
        let config = load_engine_config("").unwrap();
        assert_eq!(config.preferred_scope, None);
        assert_eq!(config.static_sort_threshold, 50);
    }

    #[test]
    fn test_engine_config_values() {
        let config = load_engine_config(
            r#"
            preferred_scope = "subject"
            static_sort_threshold = 12
        "#,
        )
        .unwrap();
        assert_eq!(config.preferred_scope, Some(Scope::Subject));
        assert_eq!(config.static_sort_threshold, 12);
    }

    #[test]
    fn test_engine_config_rejects_unknown_scope() {
        let reason = config_error_reason(load_engine_config(r#"preferred_scope = "team""#));
        assert!(reason.contains("failed to parse engine config TOML"), "got: {reason}");
        assert!(reason.contains("team"), "got: {reason}");
    }

    #[test]
    fn test_engine_config_missing_file() {
        let reason = config_error_reason(load_engine_config_file(Path::new(
            "/nonexistent/decree-engine.toml",
        )));
        assert!(reason.contains("failed to read engine config"), "got: {reason}");
    }

    // ── 2. Rule files ─────────────────────────────────────────────────────────

    #[test]
    fn test_rules_attach_in_declaration_order() {
        let descriptor = compose(
            r#"
            [[rules]]
            action = "enable"
            abilities = ["read_issue", "update_issue"]
            rule = { condition = "author" }

            [[rules]]
            action = "prevent"
            abilities = ["update_issue"]
            rule = { condition = "locked" }
            description = "locked issues are read-only"

            [[rules]]
            action = "enable"
            abilities = ["update_issue"]
            rule = { delegated = { delegate = "project", condition = "maintainer" } }
        "#,
        );

        assert_eq!(
            descriptor.configuration_for("update_issue"),
            vec![
                (Action::Enable, condition("author")),
                (Action::Prevent, condition("locked")),
                (Action::Enable, delegated("project", "maintainer")),
            ]
        );
        assert_eq!(
            descriptor.configuration_for("read_issue"),
            vec![(Action::Enable, condition("author"))]
        );
    }

    #[test]
    fn test_nested_rules_are_simplified() {
        let descriptor = compose(
            r#"
            [[rules]]
            action = "enable"
            abilities = ["admin_issue"]
            rule = { not = { any = [{ condition = "guest" }, { not = { ability = "read_issue" } }] } }
        "#,
        );

        assert_eq!(
            descriptor.configuration_for("admin_issue"),
            vec![(
                Action::Enable,
                all([!condition("guest"), ability("read_issue")])
            )]
        );
    }

    #[test]
    fn test_prevent_all_rules() {
        let descriptor = compose(
            r#"
            [[rules]]
            action = "prevent_all"
            rule = { all = [{ condition = "blocked" }, { not = { condition = "admin" } }] }
        "#,
        );

        let global: Vec<_> = descriptor.global_actions().collect();
        assert_eq!(
            global,
            vec![(Action::Prevent, all([condition("blocked"), !condition("admin")]))]
        );
        assert_eq!(descriptor.configuration_for("read_issue"), global);
    }

    // ── 3. Rule file errors ───────────────────────────────────────────────────

    #[test]
    fn test_invalid_action() {
        let loader = TomlRuleLoader::from_toml_str(
            r#"
            [[rules]]
            action = "allow"
            abilities = ["read_issue"]
            rule = { condition = "author" }
        "#,
        )
        .unwrap();

        match loader.apply(PolicyBuilder::new("issue")) {
            Err(PolicyError::InvalidAction { action }) => assert_eq!(action, "allow"),
            other => panic!("expected InvalidAction, got {:?}", other.map(|b| b.name().to_string())),
        }
    }

    #[test]
    fn test_prevent_all_with_abilities_is_rejected() {
        let loader = TomlRuleLoader::from_toml_str(
            r#"
            [[rules]]
            action = "prevent_all"
            abilities = ["read_issue"]
            rule = { condition = "blocked" }
        "#,
        )
        .unwrap();

        let reason = config_error_reason(loader.apply(PolicyBuilder::new("issue")).map(|_| ()));
        assert!(reason.contains("must not list abilities"), "got: {reason}");
    }

    #[test]
    fn test_rule_without_abilities_is_rejected() {
        let loader = TomlRuleLoader::from_toml_str(
            r#"
            [[rules]]
            action = "enable"
            rule = { condition = "author" }
        "#,
        )
        .unwrap();

        let reason = config_error_reason(loader.apply(PolicyBuilder::new("issue")).map(|_| ()));
        assert!(reason.contains("lists no abilities"), "got: {reason}");
    }

    #[test]
    fn test_unknown_rule_kind() {
        let reason = config_error_reason(TomlRuleLoader::from_toml_str(
            r#"
            [[rules]]
            action = "enable"
            abilities = ["read_issue"]
            rule = { predicate = "author" }
        "#,
        ));
        assert!(reason.contains("failed to parse rule TOML"), "got: {reason}");
    }

    #[test]
    fn test_toml_parse_error() {
        let reason = config_error_reason(TomlRuleLoader::from_toml_str("this is not valid toml ][[["));
        assert!(reason.contains("failed to parse rule TOML"), "got: {reason}");
    }

    #[test]
    fn test_missing_rule_file() {
        let reason = config_error_reason(TomlRuleLoader::from_file(Path::new(
            "/nonexistent/decree-rules.toml",
        )));
        assert!(reason.contains("failed to read rule file"), "got: {reason}");
    }

    #[test]
    fn test_empty_file_has_no_rules() {
        let loader = TomlRuleLoader::from_toml_str("").unwrap();
        assert!(loader.rules().is_empty());
    }
}
