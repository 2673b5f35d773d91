//! Condition definitions and their per-policy manifestations.
//!
//! A `ConditionDef` is registered once per policy type and never changes. A
//! `ManifestCondition` binds a definition to one policy instance and owns the
//! cache lookup, compute, and store cycle for that instance.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use decree_contracts::{error::PolicyResult, scope::Scope};

use crate::session::{Policy, PolicyId, Session};

/// A caller-supplied predicate. It runs with the policy instance it is
/// evaluated for, so it can reach the actor, the subject, and other abilities.
pub type Predicate = Arc<dyn for<'a, 's> Fn(&'a Policy<'s>) -> PolicyResult<bool> + Send + Sync>;

/// Cost of an uncached `global` condition.
pub const GLOBAL_COST: f64 = 2.0;
/// Cost of an uncached condition whose scope is the session's preferred scope.
pub const PREFERRED_COST: f64 = 4.0;
/// Cost of an uncached `user` or `subject` condition.
pub const SCOPED_COST: f64 = 8.0;
/// Cost of an uncached `normal` condition.
pub const NORMAL_COST: f64 = 16.0;

/// A named, cacheable boolean predicate.
#[derive(Clone)]
pub struct ConditionDef {
    name: String,
    owner: String,
    description: Option<String>,
    scope: Scope,
    manual_cost: Option<u32>,
    predicate: Predicate,
}

impl ConditionDef {
    /// Define a `normal`-scoped condition with no manual cost.
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Policy<'_>) -> PolicyResult<bool> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            owner: String::new(),
            description: None,
            scope: Scope::default(),
            manual_cost: None,
            predicate: Arc::new(predicate),
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Override the scope-derived cost estimate.
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.manual_cost = Some(cost);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Record the policy type that declares this condition.
    pub(crate) fn owned_by(mut self, owner: &str) -> Self {
        self.owner = owner.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn manual_cost(&self) -> Option<u32> {
        self.manual_cost
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Qualified name, `<declaring policy>/<condition>`. A subtype that
    /// redefines a condition gets a distinct key from its parent's.
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    fn evaluate(&self, policy: &Policy<'_>) -> PolicyResult<bool> {
        (self.predicate)(policy)
    }
}

impl fmt::Debug for ConditionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionDef")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("scope", &self.scope)
            .field("manual_cost", &self.manual_cost)
            .finish_non_exhaustive()
    }
}

/// Condition results shared by every policy instance of one session.
///
/// A key that is absent has not been computed yet; a stored `false` is a
/// computed result, never a placeholder.
#[derive(Debug, Default)]
pub struct ConditionCache {
    values: RefCell<HashMap<String, bool>>,
}

impl ConditionCache {
    pub fn get(&self, key: &str) -> Option<bool> {
        self.values.borrow().get(key).copied()
    }

    pub fn store(&self, key: String, value: bool) {
        self.values.borrow_mut().insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

/// A condition bound to one policy instance.
#[derive(Debug)]
pub struct ManifestCondition {
    def: Arc<ConditionDef>,
    policy: PolicyId,
    cache_key: String,
}

impl ManifestCondition {
    pub(crate) fn new(def: Arc<ConditionDef>, policy: &Policy<'_>) -> Self {
        let cache_key = Self::cache_key_for(&def, policy.actor_key(), policy.subject_key());
        Self {
            def,
            policy: policy.id(),
            cache_key,
        }
    }

    /// Cache key for `def` evaluated with the given fingerprints. Only the
    /// parts named by the condition's scope are included.
    pub fn cache_key_for(def: &ConditionDef, actor_key: &str, subject_key: &str) -> String {
        let condition_key = format!("condition/{}", def.key());
        match def.scope() {
            Scope::Normal => format!("{}/{},{}", condition_key, actor_key, subject_key),
            Scope::User => format!("{}/{}", condition_key, actor_key),
            Scope::Subject => format!("{}/{}", condition_key, subject_key),
            Scope::Global => condition_key,
        }
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn definition(&self) -> &ConditionDef {
        &self.def
    }

    /// The condition's value, running the predicate only on a cache miss.
    pub fn pass(&self, session: &Session) -> PolicyResult<bool> {
        if let Some(value) = session.cache().get(&self.cache_key) {
            return Ok(value);
        }

        debug!(
            condition = %self.def.key(),
            scope = %self.def.scope(),
            cache_key = %self.cache_key,
            "condition cache miss, running predicate"
        );

        let policy = session.policy_by_id(self.policy);
        let value = self.def.evaluate(&policy)?;
        session.cache().store(self.cache_key.clone(), value);
        Ok(value)
    }

    pub fn cached_pass(&self, session: &Session) -> Option<bool> {
        session.cache().get(&self.cache_key)
    }

    /// Zero once cached; otherwise the manual cost, or a scope heuristic
    /// under which shared results are assumed cheaper than per-pair ones.
    pub fn cost(&self, session: &Session) -> f64 {
        if self.cached_pass(session).is_some() {
            return 0.0;
        }
        if let Some(cost) = self.def.manual_cost() {
            return f64::from(cost);
        }

        match self.def.scope() {
            Scope::Global => GLOBAL_COST,
            Scope::Normal => NORMAL_COST,
            scope if session.config().preferred_scope == Some(scope) => PREFERRED_COST,
            _ => SCOPED_COST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(scope: Scope) -> ConditionDef {
        ConditionDef::new("owner", |_| Ok(true))
            .with_scope(scope)
            .owned_by("project")
    }

    #[test]
    fn cache_key_includes_only_scoped_parts() {
        assert_eq!(
            ManifestCondition::cache_key_for(&def(Scope::Normal), "user:1", "project:7"),
            "condition/project/owner/user:1,project:7"
        );
        assert_eq!(
            ManifestCondition::cache_key_for(&def(Scope::User), "user:1", "project:7"),
            "condition/project/owner/user:1"
        );
        assert_eq!(
            ManifestCondition::cache_key_for(&def(Scope::Subject), "user:1", "project:7"),
            "condition/project/owner/project:7"
        );
        assert_eq!(
            ManifestCondition::cache_key_for(&def(Scope::Global), "user:1", "project:7"),
            "condition/project/owner"
        );
    }

    #[test]
    fn redefined_condition_has_its_own_key() {
        let parent = ConditionDef::new("owner", |_| Ok(true)).owned_by("issuable");
        let child = ConditionDef::new("owner", |_| Ok(false)).owned_by("issue");
        assert_ne!(parent.key(), child.key());
    }

    #[test]
    fn cache_distinguishes_false_from_missing() {
        let cache = ConditionCache::default();
        assert_eq!(cache.get("k"), None);

        cache.store("k".to_string(), false);
        assert_eq!(cache.get("k"), Some(false));
        assert_eq!(cache.len(), 1);
    }
}
