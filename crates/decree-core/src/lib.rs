//! # decree-core
//!
//! The DECREE evaluation engine: given an actor, a subject and an ability,
//! decide allow or deny by composing cacheable conditions into rules.
//!
//! ## Overview
//!
//! - [`PolicyBuilder`] declares conditions and attaches [`Rule`]s to
//!   abilities as enable or prevent obligations.
//! - [`PolicyRegistry`] composes each policy type onto its parent once, at
//!   startup, into an immutable [`PolicyDescriptor`].
//! - A [`Session`] is the cache store of one decision. [`Session::policy`]
//!   returns the [`Policy`] instance for an (actor, subject) pair, which
//!   answers `allowed`, `disallowed`, `can`, `can_on`, `banned` and `debug`.
//!
//! Evaluation is lazy. Each ability's [`Runner`] executes its cheapest step
//! first, re-scoring after every step, and stops as soon as the verdict can
//! no longer change. Condition results are computed at most once per cache
//! key per session.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use decree_core::{condition, ConditionDef, PolicyBuilder, PolicyRegistry, Session};
//!
//! let registry = PolicyRegistry::builder()
//!     .register(
//!         PolicyBuilder::new("document")
//!             .condition(ConditionDef::new("owner", |p| Ok(is_owner(p))))
//!             .enable(["edit"], condition("owner")),
//!     )?
//!     .build()?;
//!
//! let session = Session::new(Arc::new(registry), EngineConfig::default());
//! let allowed = session.policy(Some(user), Some(document))?.can("edit")?;
//! ```

pub mod condition;
pub mod descriptor;
pub mod registry;
pub mod rule;
pub mod runner;
pub mod session;
pub mod step;

pub use condition::{ConditionDef, ManifestCondition};
pub use descriptor::{PolicyBuilder, PolicyDescriptor};
pub use registry::PolicyRegistry;
pub use rule::{ability, all, any, condition, delegated, none, Rule};
pub use runner::Runner;
pub use session::{Policy, PolicyId, Session};

// ── Tests ─────────────────────────────────────────────────────────────────────
