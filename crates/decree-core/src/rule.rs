//! The rule algebra.
//!
//! A `Rule` is a boolean expression over named conditions, abilities of the
//! same policy, and conditions of delegated policies. Rules are plain values:
//! they are built once when a policy is declared and evaluated against any
//! number of policy instances afterwards.
//!
//! Each variant answers three questions about a policy instance:
//!
//! - `pass`: the actual truth value (may run predicates).
//! - `cached_pass`: the truth value if it is already known from cached
//!   condition results and resolved runners, without running anything new.
//! - `cost`: an estimate of how expensive `pass` would be right now.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use serde::{Deserialize, Serialize};

use decree_contracts::error::PolicyResult;

use crate::session::Policy;

/// A boolean expression attached to abilities as an enable or prevent rule.
///
/// The serde form is externally tagged, which is what rule files use:
/// ```toml
/// rule = { all = [{ condition = "owner" }, { not = { condition = "archived" } }] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// A named condition of the evaluating policy.
    Condition(String),
    /// Another ability of the evaluating policy (`can?(name)`).
    Ability(String),
    /// A condition of the policy reached through a named delegation.
    Delegated { delegate: String, condition: String },
    #[serde(rename = "all")]
    And(Vec<Rule>),
    #[serde(rename = "any")]
    Or(Vec<Rule>),
    Not(Box<Rule>),
}

// ── Builders ──────────────────────────────────────────────────────────────────

pub fn condition(name: impl Into<String>) -> Rule {
    Rule::Condition(name.into())
}

pub fn ability(name: impl Into<String>) -> Rule {
    Rule::Ability(name.into())
}

pub fn delegated(delegate: impl Into<String>, condition: impl Into<String>) -> Rule {
    Rule::Delegated {
        delegate: delegate.into(),
        condition: condition.into(),
    }
}

pub fn all(rules: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::And(rules.into_iter().collect())
}

pub fn any(rules: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::Or(rules.into_iter().collect())
}

/// True when none of `rules` pass.
pub fn none(rules: impl IntoIterator<Item = Rule>) -> Rule {
    !any(rules)
}

impl BitAnd for Rule {
    type Output = Rule;

    fn bitand(self, rhs: Rule) -> Rule {
        Rule::And(vec![self, rhs])
    }
}

impl BitOr for Rule {
    type Output = Rule;

    fn bitor(self, rhs: Rule) -> Rule {
        Rule::Or(vec![self, rhs])
    }
}

impl Not for Rule {
    type Output = Rule;

    fn not(self) -> Rule {
        Rule::Not(Box::new(self))
    }
}

// ── Rewriting ─────────────────────────────────────────────────────────────────

impl Rule {
    /// Normalize the expression.
    ///
    /// `Not` is pushed inward with De Morgan's laws, double negation is
    /// removed, and nested `And`/`Or` children are spliced into a parent of
    /// the same kind. The result is a fixed point: simplifying it again
    /// returns an equal rule.
    pub fn simplify(&self) -> Rule {
        match self {
            Rule::And(rules) => {
                let mut flat = Vec::with_capacity(rules.len());
                for rule in rules {
                    match rule.simplify() {
                        Rule::And(children) => flat.extend(children),
                        other => flat.push(other),
                    }
                }
                Rule::And(flat)
            }
            Rule::Or(rules) => {
                let mut flat = Vec::with_capacity(rules.len());
                for rule in rules {
                    match rule.simplify() {
                        Rule::Or(children) => flat.extend(children),
                        other => flat.push(other),
                    }
                }
                Rule::Or(flat)
            }
            Rule::Not(inner) => match inner.as_ref() {
                Rule::And(rules) => Rule::Or(rules.iter().cloned().map(Rule::negate).collect()).simplify(),
                Rule::Or(rules) => Rule::And(rules.iter().cloned().map(Rule::negate).collect()).simplify(),
                Rule::Not(rule) => rule.simplify(),
                other => Rule::Not(Box::new(other.simplify())),
            },
            leaf => leaf.clone(),
        }
    }

    fn negate(self) -> Rule {
        Rule::Not(Box::new(self))
    }
}

// ── Evaluation ────────────────────────────────────────────────────────────────

impl Rule {
    /// Evaluate the rule against `policy`.
    ///
    /// Children of `And`/`Or` are evaluated in declaration order and stop at
    /// the first deciding child. Cost-based ordering happens one level up,
    /// between steps, never inside a rule.
    pub fn pass(&self, policy: &Policy<'_>) -> PolicyResult<bool> {
        match self {
            Rule::Condition(name) => policy.condition(name)?.pass(policy.session()),
            Rule::Ability(name) => policy.runner(name)?.pass(policy.session()),
            Rule::Delegated { delegate, condition } => match policy.delegated_policy(delegate)? {
                Some(target) => target.condition(condition)?.pass(policy.session()),
                None => Ok(false),
            },
            Rule::And(rules) => {
                for rule in rules {
                    if !rule.pass(policy)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Rule::Or(rules) => {
                for rule in rules {
                    if rule.pass(policy)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Rule::Not(rule) => Ok(!rule.pass(policy)?),
        }
    }

    /// The already-known truth value, or `None` if finding out would require
    /// running a predicate or an unresolved runner.
    pub fn cached_pass(&self, policy: &Policy<'_>) -> PolicyResult<Option<bool>> {
        match self {
            Rule::Condition(name) => Ok(policy.condition(name)?.cached_pass(policy.session())),
            Rule::Ability(name) => Ok(policy.runner(name)?.cached_pass()),
            Rule::Delegated { delegate, condition } => match policy.peek_delegated_policy(delegate) {
                Some(Some(target)) => Ok(target.condition(condition)?.cached_pass(policy.session())),
                Some(None) => Ok(Some(false)),
                None => Ok(None),
            },
            Rule::And(rules) => {
                let mut known = true;
                for rule in rules {
                    match rule.cached_pass(policy)? {
                        Some(false) => return Ok(Some(false)),
                        Some(true) => {}
                        None => known = false,
                    }
                }
                Ok(known.then_some(true))
            }
            Rule::Or(rules) => {
                let mut known = true;
                for rule in rules {
                    match rule.cached_pass(policy)? {
                        Some(true) => return Ok(Some(true)),
                        Some(false) => {}
                        None => known = false,
                    }
                }
                Ok(known.then_some(false))
            }
            Rule::Not(rule) => Ok(rule.cached_pass(policy)?.map(|pass| !pass)),
        }
    }

    /// Estimated cost of calling `pass` right now. Known results cost 0.
    pub fn cost(&self, policy: &Policy<'_>) -> PolicyResult<f64> {
        match self {
            Rule::Condition(name) => Ok(policy.condition(name)?.cost(policy.session())),
            Rule::Ability(name) => policy.runner(name)?.cost(policy.session()),
            Rule::Delegated { delegate, condition } => match policy.delegated_policy(delegate)? {
                Some(target) => Ok(target.condition(condition)?.cost(policy.session())),
                None => Ok(0.0),
            },
            Rule::And(rules) => Self::junction_cost(rules, false, policy),
            Rule::Or(rules) => Self::junction_cost(rules, true, policy),
            Rule::Not(rule) => rule.cost(policy),
        }
    }

    /// Sum the cost of unknown children, stopping at the first child whose
    /// cached value already decides the junction.
    fn junction_cost(rules: &[Rule], deciding: bool, policy: &Policy<'_>) -> PolicyResult<f64> {
        let mut total = 0.0;
        for rule in rules {
            match rule.cached_pass(policy)? {
                Some(value) if value == deciding => return Ok(0.0),
                Some(_) => {}
                None => total += rule.cost(policy)?,
            }
        }
        Ok(total)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Condition(name) => f.write_str(name),
            Rule::Ability(name) => write!(f, "can?({})", name),
            Rule::Delegated { delegate, condition } => write!(f, "{}.{}", delegate, condition),
            Rule::And(rules) => write!(f, "all?({})", join(rules)),
            Rule::Or(rules) => write!(f, "any?({})", join(rules)),
            Rule::Not(rule) => write!(f, "~{}", rule),
        }
    }
}

fn join(rules: &[Rule]) -> String {
    rules.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
}
