//! # decree-contracts
//!
//! Shared types, error taxonomy, and configuration schema for DECREE.
//!
//! All crates in the workspace import from here. No evaluation logic lives
//! in this crate, only data definitions and error types.

pub mod action;
pub mod config;
pub mod error;
pub mod identity;
pub mod scope;
pub mod trace;

pub use action::Action;
pub use config::EngineConfig;
pub use error::{PolicyError, PolicyResult};
pub use identity::{Actor, Subject};
pub use scope::Scope;
pub use trace::{DebugTrace, TraceEntry};

#[cfg(test)]
mod tests {
    use std::any::Any;

    use super::*;

    #[derive(Debug)]
    struct Named(&'static str);

    impl Actor for Named {
        fn actor_key(&self) -> String {
            format!("user:{}", self.0)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    // ── Scope ────────────────────────────────────────────────────────────────

    #[test]
    fn scope_parses_all_four_names() {
        assert_eq!("global".parse::<Scope>().unwrap(), Scope::Global);
        assert_eq!("user".parse::<Scope>().unwrap(), Scope::User);
        assert_eq!("subject".parse::<Scope>().unwrap(), Scope::Subject);
        assert_eq!("normal".parse::<Scope>().unwrap(), Scope::Normal);
    }

    #[test]
    fn scope_rejects_unknown_name() {
        match "team".parse::<Scope>() {
            Err(PolicyError::InvalidScope { scope }) => assert_eq!(scope, "team"),
            other => panic!("expected InvalidScope, got {:?}", other),
        }
    }

    #[test]
    fn scope_deserializes_from_lowercase_string() {
        let scope: Scope = serde_json::from_str("\"subject\"").unwrap();
        assert_eq!(scope, Scope::Subject);

        let err = serde_json::from_str::<Scope>("\"everyone\"").unwrap_err();
        assert!(err.to_string().contains("everyone"));
    }

    // ── Action ───────────────────────────────────────────────────────────────

    #[test]
    fn action_parses_enable_and_prevent_only() {
        assert_eq!("enable".parse::<Action>().unwrap(), Action::Enable);
        assert_eq!("prevent".parse::<Action>().unwrap(), Action::Prevent);

        match "allow".parse::<Action>() {
            Err(PolicyError::InvalidAction { action }) => assert_eq!(action, "allow"),
            other => panic!("expected InvalidAction, got {:?}", other),
        }
    }

    // ── EngineConfig ─────────────────────────────────────────────────────────

    #[test]
    fn engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.preferred_scope, None);
        assert_eq!(config.static_sort_threshold, 50);

        let empty: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, config);
    }

    // ── Identity ─────────────────────────────────────────────────────────────

    #[test]
    fn absent_actor_and_subject_have_distinct_fingerprints() {
        assert_eq!(identity::actor_key(None), "<anonymous>");
        assert_eq!(identity::subject_key(None), "<nil>");

        let alice = Named("alice");
        assert_eq!(identity::actor_key(Some(&alice)), "user:alice");
    }

    // ── DebugTrace ───────────────────────────────────────────────────────────

    #[test]
    fn trace_entry_display_marks_outcome() {
        let entry = TraceEntry {
            action: Action::Prevent,
            rule: "banned".to_string(),
            context: "(user:1 : project:2)".to_string(),
            cost: 1.75,
            outcome: Some(false),
        };
        assert_eq!(
            entry.to_string(),
            "- [1] prevent when banned (user:1 : project:2)"
        );

        let skipped = TraceEntry { outcome: None, ..entry };
        assert!(skipped.to_string().starts_with("  [1]"));
    }

    // ── PolicyError display messages ─────────────────────────────────────────

    #[test]
    fn error_unknown_condition_display() {
        let err = PolicyError::UnknownCondition {
            policy: "project".to_string(),
            condition: "owner".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("unknown condition"));
        assert!(msg.contains("owner"));
        assert!(msg.contains("project"));
    }

    #[test]
    fn error_delegation_cycle_display() {
        let err = PolicyError::DelegationCycle {
            policy: "(user:1 : issue:9)".to_string(),
            ability: "read".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("delegation cycle"));
        assert!(msg.contains("read"));
    }

    #[test]
    fn error_config_error_display() {
        let err = PolicyError::ConfigError {
            reason: "missing rules file".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("missing rules file"));
    }
}
