//! Policy descriptors and the registration API.
//!
//! A `PolicyBuilder` collects what one policy type declares on its own:
//! conditions, enable/prevent rules per ability, prevent-all rules,
//! delegations, and overrides. `PolicyDescriptor::compose` merges those
//! declarations onto the parent type's descriptor, producing an immutable
//! descriptor that is never modified afterwards.
//!
//! Composition order:
//!
//! 1. Conditions: the subtype's definition replaces a same-named parent one.
//! 2. Ability rules: parent rules first, then the subtype's, per ability.
//! 3. Prevent-all rules: parent's, then the subtype's.
//! 4. Delegations: parent's, then the subtype's; a subtype delegation with
//!    a parent's name replaces it in place.
//! 5. Overrides: union of parent and subtype.
//!
//! Declaration order only decides membership. The runner decides execution
//! order by cost.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use decree_contracts::{action::Action, error::PolicyResult, identity::Subject};

use crate::condition::ConditionDef;
use crate::rule::Rule;
use crate::session::Policy;

/// A caller-supplied delegation: the subject whose policy should contribute
/// to this one's decisions, or `None` to skip the delegation.
pub type Delegation =
    Arc<dyn for<'a, 's> Fn(&'a Policy<'s>) -> PolicyResult<Option<Arc<dyn Subject>>> + Send + Sync>;

/// The composed, immutable rule set of one policy type.
#[derive(Clone, Default)]
pub struct PolicyDescriptor {
    name: String,
    conditions: HashMap<String, Arc<ConditionDef>>,
    ability_map: HashMap<String, Vec<(Action, Rule)>>,
    global_prevents: Vec<Rule>,
    delegations: Vec<(String, Delegation)>,
    overrides: BTreeSet<String>,
}

impl PolicyDescriptor {
    /// A descriptor with no rules: every ability is denied.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Merge `own` onto `parent` (or onto nothing for a root type).
    pub fn compose(parent: Option<&PolicyDescriptor>, own: PolicyBuilder) -> PolicyDescriptor {
        let mut descriptor = match parent {
            Some(parent) => PolicyDescriptor {
                name: own.name.clone(),
                ..parent.clone()
            },
            None => PolicyDescriptor::empty(own.name.clone()),
        };

        for def in own.conditions {
            let def = def.owned_by(&own.name);
            descriptor
                .conditions
                .insert(def.name().to_string(), Arc::new(def));
        }

        for (ability, action, rule) in own.rules {
            descriptor
                .ability_map
                .entry(ability)
                .or_default()
                .push((action, rule));
        }

        descriptor.global_prevents.extend(own.global_prevents);

        // A redefined delegate keeps the parent's position.
        for (name, delegation) in own.delegations {
            match descriptor.delegations.iter_mut().find(|(n, _)| *n == name) {
                Some(existing) => existing.1 = delegation,
                None => descriptor.delegations.push((name, delegation)),
            }
        }

        descriptor.overrides.extend(own.overrides);
        descriptor
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn condition(&self, name: &str) -> Option<&Arc<ConditionDef>> {
        self.conditions.get(name)
    }

    /// Every (action, rule) obligation for `ability`: its own rules followed
    /// by the prevent-all rules.
    pub fn configuration_for(&self, ability: &str) -> Vec<(Action, Rule)> {
        let mut configuration = self.ability_map.get(ability).cloned().unwrap_or_default();
        configuration.extend(self.global_actions());
        configuration
    }

    /// The prevent-all rules, each as a prevent obligation.
    pub fn global_actions(&self) -> impl Iterator<Item = (Action, Rule)> + '_ {
        self.global_prevents
            .iter()
            .map(|rule| (Action::Prevent, rule.clone()))
    }

    pub fn delegations(&self) -> &[(String, Delegation)] {
        &self.delegations
    }

    /// Whether `ability` is resolved from this policy's own rules only.
    pub fn overrides(&self, ability: &str) -> bool {
        self.overrides.contains(ability)
    }

    /// Abilities with at least one rule, sorted.
    pub fn abilities(&self) -> Vec<&str> {
        let mut abilities: Vec<&str> = self.ability_map.keys().map(String::as_str).collect();
        abilities.sort_unstable();
        abilities
    }
}

impl fmt::Debug for PolicyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyDescriptor")
            .field("name", &self.name)
            .field("conditions", &self.conditions.len())
            .field("abilities", &self.abilities())
            .field("global_prevents", &self.global_prevents.len())
            .field(
                "delegations",
                &self.delegations.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field("overrides", &self.overrides)
            .finish()
    }
}

/// Declarations of one policy type, before composition with its parent.
///
/// ```rust,ignore
/// use decree_core::{condition, ConditionDef, PolicyBuilder};
///
/// let project = PolicyBuilder::new("project")
///     .condition(ConditionDef::new("owner", |p| Ok(is_owner(p))))
///     .condition(ConditionDef::new("banned", |p| Ok(is_banned(p))).with_scope(Scope::User))
///     .enable(["edit", "read"], condition("owner"))
///     .prevent_all(condition("banned"));
/// ```
pub struct PolicyBuilder {
    name: String,
    parent: Option<String>,
    conditions: Vec<ConditionDef>,
    rules: Vec<(String, Action, Rule)>,
    global_prevents: Vec<Rule>,
    delegations: Vec<(String, Delegation)>,
    overrides: Vec<String>,
}

impl PolicyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            conditions: Vec::new(),
            rules: Vec::new(),
            global_prevents: Vec::new(),
            delegations: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Inherit every declaration of the already-registered policy `parent`.
    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn condition(mut self, def: ConditionDef) -> Self {
        self.conditions.push(def);
        self
    }

    /// Grant each of `abilities` when `rule` passes.
    pub fn enable<I, S>(self, abilities: I, rule: Rule) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attach(Action::Enable, abilities, rule)
    }

    /// Deny each of `abilities` when `rule` passes, whatever else is enabled.
    pub fn prevent<I, S>(self, abilities: I, rule: Rule) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attach(Action::Prevent, abilities, rule)
    }

    /// Attach `rule` to `abilities` with the given action. The rule is
    /// simplified once here.
    pub fn attach<I, S>(mut self, action: Action, abilities: I, rule: Rule) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rule = rule.simplify();
        for ability in abilities {
            self.rules.push((ability.into(), action, rule.clone()));
        }
        self
    }

    /// Deny every ability of this policy type when `rule` passes.
    pub fn prevent_all(mut self, rule: Rule) -> Self {
        self.global_prevents.push(rule.simplify());
        self
    }

    /// Let the policy of the subject returned by `f` contribute its rules
    /// for every ability that is not overridden.
    pub fn delegate<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Policy<'_>) -> PolicyResult<Option<Arc<dyn Subject>>> + Send + Sync + 'static,
    {
        self.delegations.push((name.into(), Arc::new(f)));
        self
    }

    /// Resolve `abilities` from this policy's own rules only, never merging
    /// the rules of delegated policies.
    pub fn overrides<I, S>(mut self, abilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides.extend(abilities.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}
