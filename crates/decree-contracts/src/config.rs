//! Engine configuration schema.
//!
//! Parsing from TOML lives in `decree-policy`; this crate only defines the
//! shape so that the engine can take it by value without a TOML dependency.

use serde::{Deserialize, Serialize};

use crate::scope::Scope;

/// Flattened step lists longer than this are run in a static cost order.
pub const DEFAULT_STATIC_SORT_THRESHOLD: usize = 50;

/// Tunables threaded explicitly into every evaluation session.
///
/// Example in TOML:
/// ```toml
/// preferred_scope = "subject"
/// static_sort_threshold = 50
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Conditions with this scope (and no manual cost) are assumed cheaper
    /// than other non-global, non-normal conditions. Typically set by hosts
    /// that evaluate many subjects for one actor, or vice versa.
    #[serde(default)]
    pub preferred_scope: Option<Scope>,

    /// Step count above which the runner skips adaptive re-scoring.
    #[serde(default = "default_static_sort_threshold")]
    pub static_sort_threshold: usize,
}

fn default_static_sort_threshold() -> usize {
    DEFAULT_STATIC_SORT_THRESHOLD
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preferred_scope: None,
            static_sort_threshold: DEFAULT_STATIC_SORT_THRESHOLD,
        }
    }
}

impl EngineConfig {
    pub fn with_preferred_scope(mut self, scope: Scope) -> Self {
        self.preferred_scope = Some(scope);
        self
    }

    pub fn with_static_sort_threshold(mut self, threshold: usize) -> Self {
        self.static_sort_threshold = threshold;
        self
    }
}
