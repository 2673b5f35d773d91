//! Sessions and policy instances.
//!
//! A `Session` is the cache store of one authorization decision: condition
//! results, and every policy instance created while answering it (the
//! queried one, delegated ones, and those reached through `can_on`). All of
//! them share the session's condition cache. Sessions are cheap; create one
//! per decision and drop it afterwards. Nothing is shared between sessions.
//!
//! Policy instances live in an arena owned by the session and are addressed
//! by `PolicyId`. `Policy` is a handle to one of them.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use decree_contracts::{
    config::EngineConfig,
    error::{PolicyError, PolicyResult},
    identity::{self, Actor, Subject},
    trace::DebugTrace,
};

use crate::condition::{ConditionCache, ManifestCondition};
use crate::descriptor::PolicyDescriptor;
use crate::registry::PolicyRegistry;
use crate::runner::Runner;
use crate::step::Step;

/// Index of a policy instance within its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyId(usize);

/// State of one policy instance: its bindings plus everything it memoizes.
struct Frame {
    id: PolicyId,
    descriptor: Arc<PolicyDescriptor>,
    actor: Option<Arc<dyn Actor>>,
    subject: Option<Arc<dyn Subject>>,
    actor_key: String,
    subject_key: String,
    conditions: RefCell<HashMap<String, Rc<ManifestCondition>>>,
    runners: RefCell<HashMap<String, Rc<Runner>>>,
    /// Abilities whose runner is being built right now.
    building: RefCell<HashSet<String>>,
    delegates: RefCell<Option<Rc<[(String, PolicyId)]>>>,
}

pub struct Session {
    registry: Arc<PolicyRegistry>,
    config: EngineConfig,
    cache: ConditionCache,
    frames: RefCell<Vec<Rc<Frame>>>,
    index: RefCell<HashMap<String, PolicyId>>,
}

impl Session {
    pub fn new(registry: Arc<PolicyRegistry>, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            cache: ConditionCache::default(),
            frames: RefCell::new(Vec::new()),
            index: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ConditionCache {
        &self.cache
    }

    /// The policy instance for `(actor, subject)`, created on first use and
    /// reused afterwards.
    pub fn policy(
        &self,
        actor: Option<Arc<dyn Actor>>,
        subject: Option<Arc<dyn Subject>>,
    ) -> PolicyResult<Policy<'_>> {
        let descriptor = self.registry.descriptor_for(subject.as_deref())?;
        let actor_key = identity::actor_key(actor.as_deref());
        let subject_key = identity::subject_key(subject.as_deref());
        let key = format!("{}/{}/{}", descriptor.name(), actor_key, subject_key);

        if let Some(id) = self.index.borrow().get(&key).copied() {
            return Ok(self.policy_by_id(id));
        }

        let mut frames = self.frames.borrow_mut();
        let id = PolicyId(frames.len());
        let frame = Rc::new(Frame {
            id,
            descriptor,
            actor,
            subject,
            actor_key,
            subject_key,
            conditions: RefCell::new(HashMap::new()),
            runners: RefCell::new(HashMap::new()),
            building: RefCell::new(HashSet::new()),
            delegates: RefCell::new(None),
        });
        frames.push(Rc::clone(&frame));
        self.index.borrow_mut().insert(key, id);

        Ok(Policy {
            session: self,
            frame,
        })
    }

    pub(crate) fn policy_by_id(&self, id: PolicyId) -> Policy<'_> {
        let frame = Rc::clone(&self.frames.borrow()[id.0]);
        Policy {
            session: self,
            frame,
        }
    }

    /// Number of policy instances created so far.
    pub fn policy_count(&self) -> usize {
        self.frames.borrow().len()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("policies", &self.policy_count())
            .field("cached_conditions", &self.cache.len())
            .finish()
    }
}

/// A policy instance: one policy type bound to an actor and a subject
/// within a session.
#[derive(Clone)]
pub struct Policy<'s> {
    session: &'s Session,
    frame: Rc<Frame>,
}

impl<'s> Policy<'s> {
    pub fn id(&self) -> PolicyId {
        self.frame.id
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    pub fn descriptor(&self) -> &PolicyDescriptor {
        &self.frame.descriptor
    }

    pub fn actor(&self) -> Option<&dyn Actor> {
        self.frame.actor.as_deref()
    }

    pub fn subject(&self) -> Option<&dyn Subject> {
        self.frame.subject.as_deref()
    }

    /// The actor, if present and of type `T`.
    pub fn actor_as<T: Actor>(&self) -> Option<&T> {
        self.actor()?.as_any().downcast_ref::<T>()
    }

    /// The subject, if present and of type `T`.
    pub fn subject_as<T: Subject>(&self) -> Option<&T> {
        self.subject()?.as_any().downcast_ref::<T>()
    }

    pub fn actor_key(&self) -> &str {
        &self.frame.actor_key
    }

    pub fn subject_key(&self) -> &str {
        &self.frame.subject_key
    }

    // ── Query surface ─────────────────────────────────────────────────────────

    /// True iff every one of `abilities` is allowed.
    pub fn allowed(&self, abilities: &[&str]) -> PolicyResult<bool> {
        for ability in abilities {
            if !self.runner(ability)?.pass(self.session)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// True iff every one of `abilities` is denied.
    pub fn disallowed(&self, abilities: &[&str]) -> PolicyResult<bool> {
        for ability in abilities {
            if self.runner(ability)?.pass(self.session)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether the actor may perform `ability` on this policy's subject.
    pub fn can(&self, ability: &str) -> PolicyResult<bool> {
        self.allowed(&[ability])
    }

    /// Whether the actor may perform `ability` on `subject`, evaluated by
    /// the policy for `(actor, subject)` in this session.
    pub fn can_on(&self, ability: &str, subject: Option<Arc<dyn Subject>>) -> PolicyResult<bool> {
        self.policy_for(subject)?.allowed(&[ability])
    }

    /// True iff one of the prevent-all rules passes. Independent of any
    /// specific ability.
    pub fn banned(&self) -> PolicyResult<bool> {
        let steps = self
            .frame
            .descriptor
            .global_actions()
            .map(|(action, rule)| Step::new(self.id(), rule, action))
            .collect();
        Runner::new(steps).any_pass(self.session)
    }

    /// Re-run `ability` with tracing. Diagnostic only.
    pub fn debug(&self, ability: &str) -> PolicyResult<DebugTrace> {
        let runner = self.runner(ability)?;
        let (allowed, steps) = runner.trace(self.session)?;
        Ok(DebugTrace {
            ability: ability.to_string(),
            allowed,
            steps,
        })
    }

    /// The policy instance for the same actor and another subject.
    pub fn policy_for(&self, subject: Option<Arc<dyn Subject>>) -> PolicyResult<Policy<'s>> {
        self.session.policy(self.frame.actor.clone(), subject)
    }

    // ── Delegation ────────────────────────────────────────────────────────────

    /// Delegated policy instances in declaration order, resolved once.
    /// Delegations that resolve to no subject are skipped.
    pub fn delegated_policies(&self) -> PolicyResult<Vec<(String, Policy<'s>)>> {
        let resolved = self.resolve_delegates()?;
        Ok(resolved
            .iter()
            .map(|(name, id)| (name.clone(), self.session.policy_by_id(*id)))
            .collect())
    }

    /// The delegated policy registered as `name`, if it resolved to a subject.
    pub fn delegated_policy(&self, name: &str) -> PolicyResult<Option<Policy<'s>>> {
        let resolved = self.resolve_delegates()?;
        Ok(resolved
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| self.session.policy_by_id(*id)))
    }

    /// Like `delegated_policy`, but never runs a delegation function:
    /// `None` while delegates are still unresolved.
    pub(crate) fn peek_delegated_policy(&self, name: &str) -> Option<Option<Policy<'s>>> {
        let delegates = self.frame.delegates.borrow();
        let resolved = delegates.as_ref()?;
        Some(
            resolved
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, id)| self.session.policy_by_id(*id)),
        )
    }

    fn resolve_delegates(&self) -> PolicyResult<Rc<[(String, PolicyId)]>> {
        if let Some(resolved) = self.frame.delegates.borrow().as_ref() {
            return Ok(Rc::clone(resolved));
        }

        let mut resolved = Vec::new();
        for (name, delegation) in self.frame.descriptor.delegations() {
            match delegation(self)? {
                Some(subject) => resolved.push((name.clone(), self.policy_for(Some(subject))?.id())),
                None => debug!(
                    policy = %self,
                    delegate = %name,
                    "delegation resolved to no subject, skipping"
                ),
            }
        }

        let resolved: Rc<[(String, PolicyId)]> = resolved.into();
        *self.frame.delegates.borrow_mut() = Some(Rc::clone(&resolved));
        Ok(resolved)
    }

    // ── Memoized building blocks ──────────────────────────────────────────────

    /// The manifest of condition `name` for this instance.
    pub fn condition(&self, name: &str) -> PolicyResult<Rc<ManifestCondition>> {
        if let Some(manifest) = self.frame.conditions.borrow().get(name) {
            return Ok(Rc::clone(manifest));
        }

        let def = self.frame.descriptor.condition(name).ok_or_else(|| {
            PolicyError::UnknownCondition {
                policy: self.frame.descriptor.name().to_string(),
                condition: name.to_string(),
            }
        })?;
        let manifest = Rc::new(ManifestCondition::new(Arc::clone(def), self));
        self.frame
            .conditions
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&manifest));
        Ok(manifest)
    }

    /// The runner for `ability`: this policy's own steps, merged with the
    /// runners of delegated policies unless the ability is overridden.
    pub fn runner(&self, ability: &str) -> PolicyResult<Rc<Runner>> {
        if let Some(runner) = self.frame.runners.borrow().get(ability) {
            return Ok(Rc::clone(runner));
        }

        if !self.frame.building.borrow_mut().insert(ability.to_string()) {
            return Err(PolicyError::DelegationCycle {
                policy: self.to_string(),
                ability: ability.to_string(),
            });
        }
        let built = self.build_runner(ability);
        self.frame.building.borrow_mut().remove(ability);

        let runner = Rc::new(built?);
        self.frame
            .runners
            .borrow_mut()
            .insert(ability.to_string(), Rc::clone(&runner));
        Ok(runner)
    }

    fn build_runner(&self, ability: &str) -> PolicyResult<Runner> {
        let own = Runner::new(self.own_steps(ability));
        if self.frame.descriptor.overrides(ability) {
            return Ok(own);
        }

        let mut runner = own;
        for (_, delegate) in self.delegated_policies()? {
            let other = delegate.runner(ability)?;
            runner = runner.merge(&other);
        }
        Ok(runner)
    }

    fn own_steps(&self, ability: &str) -> Vec<Step> {
        self.frame
            .descriptor
            .configuration_for(ability)
            .into_iter()
            .map(|(action, rule)| Step::new(self.id(), rule, action))
            .collect()
    }
}

impl PartialEq for Policy<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.session, other.session) && self.id() == other.id()
    }
}

impl fmt::Display for Policy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} : {})", self.frame.actor_key, self.frame.subject_key)
    }
}

impl fmt::Debug for Policy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("id", &self.frame.id)
            .field("policy", &self.frame.descriptor.name())
            .field("actor", &self.frame.actor_key)
            .field("subject", &self.frame.subject_key)
            .finish()
    }
}
