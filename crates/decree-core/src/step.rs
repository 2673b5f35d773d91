//! Steps: single (policy, rule, action) obligations scheduled by a runner.

use decree_contracts::{action::Action, error::PolicyResult, trace::TraceEntry};

use crate::rule::Rule;
use crate::session::{PolicyId, Session};

/// Prevent steps are scored slightly cheaper so that, at equal cost, a
/// denial is found before time is spent on enabling rules.
const PREVENT_COST_FACTOR: f64 = 7.0 / 8.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Step {
    context: PolicyId,
    rule: Rule,
    action: Action,
}

impl Step {
    pub fn new(context: PolicyId, rule: Rule, action: Action) -> Self {
        Self {
            context,
            rule,
            action,
        }
    }

    pub fn context(&self) -> PolicyId {
        self.context
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn with_action(&self, action: Action) -> Self {
        Self {
            action,
            ..self.clone()
        }
    }

    pub fn cost(&self, session: &Session) -> PolicyResult<f64> {
        let cost = self.rule.cost(&session.policy_by_id(self.context))?;
        Ok(match self.action {
            Action::Prevent => cost * PREVENT_COST_FACTOR,
            Action::Enable => cost,
        })
    }

    pub fn pass(&self, session: &Session) -> PolicyResult<bool> {
        self.rule.pass(&session.policy_by_id(self.context))
    }

    /// Replace this step by primitive steps where that is safe, so the
    /// runner can schedule conditions instead of opaque sub-abilities.
    ///
    /// - An `Or` step becomes one step per child with the same action.
    /// - An ability step is replaced by the steps of that ability's runner
    ///   (minus those already in `roots`) when all of them are enable steps.
    ///   Inlined into a prevent step, each becomes a prevent step. A prevent
    ///   step is only inlined when none of the referenced steps overlap
    ///   `roots`, since dropping an overlapping step would drop a denial.
    /// - Anything else stays as it is.
    ///
    /// `unfolding` holds the (policy, ability) pairs being inlined on the
    /// current path; a reference back into one of them is kept unflattened.
    pub fn flattened(
        &self,
        session: &Session,
        roots: &[Step],
        unfolding: &mut Vec<(PolicyId, String)>,
    ) -> PolicyResult<Vec<Step>> {
        match &self.rule {
            Rule::Or(rules) => {
                let mut steps = Vec::new();
                for rule in rules {
                    let child = Step::new(self.context, rule.clone(), self.action);
                    steps.extend(child.flattened(session, roots, unfolding)?);
                }
                Ok(steps)
            }
            Rule::Ability(ability) => {
                let key = (self.context, ability.clone());
                if unfolding.contains(&key) {
                    return Ok(vec![self.clone()]);
                }

                let runner = session.policy_by_id(self.context).runner(ability)?;
                let referenced = runner.steps();
                let inner: Vec<&Step> = referenced.iter().filter(|s| !roots.contains(s)).collect();

                let overlaps_roots = inner.len() != referenced.len();
                let unsafe_prevent = self.action.is_prevent() && overlaps_roots;
                if unsafe_prevent || !inner.iter().all(|s| s.action.is_enable()) {
                    return Ok(vec![self.clone()]);
                }

                unfolding.push(key);
                let result = inner
                    .into_iter()
                    .map(|s| s.with_action(self.action).flattened(session, roots, unfolding))
                    .collect::<PolicyResult<Vec<_>>>();
                unfolding.pop();

                Ok(result?.into_iter().flatten().collect())
            }
            _ => Ok(vec![self.clone()]),
        }
    }

    pub fn trace_entry(&self, session: &Session, cost: f64, outcome: Option<bool>) -> TraceEntry {
        TraceEntry {
            action: self.action,
            rule: self.rule.to_string(),
            context: session.policy_by_id(self.context).to_string(),
            cost,
            outcome,
        }
    }
}
