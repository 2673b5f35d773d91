//! The runner: resolves every step for one ability into a verdict.
//!
//! Scheduling algorithm (adaptive path):
//!
//! 1. Flatten the step list (see `Step::flattened`).
//! 2. Until no steps remain:
//!    a. Once enabled, only prevent steps can still change the outcome;
//!       enable steps are dropped.
//!    b. If not enabled and only prevent steps remain, nothing can grant
//!       the ability: mark it prevented and stop.
//!    c. Otherwise re-score every remaining step and execute the cheapest.
//!       Scores are recomputed each round because every executed step can
//!       warm the cache for others.
//! 3. Verdict = enabled and not prevented.
//!
//! Re-scoring is quadratic in the number of steps. Above
//! `EngineConfig::static_sort_threshold` steps the runner instead sorts once
//! by initial cost and executes in that fixed order, logging a warning.

use std::cell::{Cell, RefCell};

use tracing::{debug, warn};

use decree_contracts::{action::Action, error::PolicyResult, trace::TraceEntry};

use crate::session::Session;
use crate::step::Step;

/// Outcome of a run. Terminal once the runner has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    pub enabled: bool,
    pub prevented: bool,
}

impl RunState {
    pub fn pass(&self) -> bool {
        self.enabled && !self.prevented
    }
}

#[derive(Debug)]
pub struct Runner {
    steps: Vec<Step>,
    /// `None` until the first run starts. While running it holds the
    /// partial state, which is what a re-entrant read observes.
    state: RefCell<Option<RunState>>,
    /// Set while `cost` is summing this runner's steps, so that abilities
    /// referencing each other are not scored forever.
    scoring: Cell<bool>,
}

impl Runner {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            state: RefCell::new(None),
            scoring: Cell::new(false),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// A new, unresolved runner over both step lists.
    pub fn merge(&self, other: &Runner) -> Runner {
        Runner::new(self.steps.iter().chain(other.steps.iter()).cloned().collect())
    }

    pub fn state(&self) -> Option<RunState> {
        *self.state.borrow()
    }

    pub fn cached_pass(&self) -> Option<bool> {
        self.state().map(|state| state.pass())
    }

    /// Zero once resolved (or while already being scored), else the sum of
    /// every step's current cost.
    pub fn cost(&self, session: &Session) -> PolicyResult<f64> {
        if self.state().is_some() || self.scoring.replace(true) {
            return Ok(0.0);
        }
        let total = self
            .steps
            .iter()
            .map(|step| step.cost(session))
            .sum::<PolicyResult<f64>>();
        self.scoring.set(false);
        total
    }

    pub fn pass(&self, session: &Session) -> PolicyResult<bool> {
        if let Some(state) = self.state() {
            return Ok(state.pass());
        }
        Ok(self.run(session, None)?.pass())
    }

    /// Run again while recording every selected step. The verdict equals
    /// the memoized one.
    pub fn trace(&self, session: &Session) -> PolicyResult<(bool, Vec<TraceEntry>)> {
        let mut entries = Vec::new();
        let state = self.run(session, Some(&mut entries))?;
        Ok((state.pass(), entries))
    }

    /// True as soon as one step passes, trying the cheapest first. Used for
    /// prevent-only step sets, where "nothing enabled" is not a finding.
    pub fn any_pass(&self, session: &Session) -> PolicyResult<bool> {
        let mut remaining = self.steps.clone();
        while !remaining.is_empty() {
            let (index, _) = Self::cheapest(session, &remaining)?;
            if remaining.remove(index).pass(session)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn run(&self, session: &Session, mut trace: Option<&mut Vec<TraceEntry>>) -> PolicyResult<RunState> {
        *self.state.borrow_mut() = Some(RunState::default());

        match self.execute(session, &mut trace) {
            Ok(state) => {
                *self.state.borrow_mut() = Some(state);
                debug!(
                    steps = self.steps.len(),
                    enabled = state.enabled,
                    prevented = state.prevented,
                    "runner resolved"
                );
                Ok(state)
            }
            Err(err) => {
                *self.state.borrow_mut() = None;
                Err(err)
            }
        }
    }

    fn execute(&self, session: &Session, trace: &mut Option<&mut Vec<TraceEntry>>) -> PolicyResult<RunState> {
        let mut unfolding = Vec::new();
        let mut steps = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            steps.extend(step.flattened(session, &self.steps, &mut unfolding)?);
        }

        let threshold = session.config().static_sort_threshold;
        if steps.len() > threshold {
            warn!(
                steps = steps.len(),
                threshold,
                "large number of steps, falling back to static sort"
            );
            self.execute_static(session, steps, trace)?;
        } else {
            self.execute_adaptive(session, steps, trace)?;
        }

        Ok(self.current())
    }

    fn execute_adaptive(
        &self,
        session: &Session,
        mut remaining: Vec<Step>,
        trace: &mut Option<&mut Vec<TraceEntry>>,
    ) -> PolicyResult<()> {
        loop {
            if self.current().enabled {
                remaining.retain(|step| step.action().is_prevent());
            } else if remaining.iter().all(|step| step.action().is_prevent()) {
                self.update(|state| state.prevented = true);
                return Ok(());
            }

            if remaining.is_empty() {
                return Ok(());
            }

            let (index, cost) = Self::cheapest(session, &remaining)?;
            let step = remaining.remove(index);
            self.execute_step(session, &step, cost, trace)?;

            if self.current().prevented && trace.is_none() {
                return Ok(());
            }
        }
    }

    fn execute_static(
        &self,
        session: &Session,
        steps: Vec<Step>,
        trace: &mut Option<&mut Vec<TraceEntry>>,
    ) -> PolicyResult<()> {
        let mut scored = Vec::with_capacity(steps.len());
        for step in steps {
            scored.push((step.cost(session)?, step));
        }
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (cost, step) in scored {
            if self.current().prevented && trace.is_none() {
                break;
            }
            self.execute_step(session, &step, cost, trace)?;
        }
        Ok(())
    }

    /// Index and cost of the cheapest step; ties go to the earliest.
    fn cheapest(session: &Session, steps: &[Step]) -> PolicyResult<(usize, f64)> {
        let mut best = (0, f64::INFINITY);
        for (index, step) in steps.iter().enumerate() {
            let cost = step.cost(session)?;
            if cost < best.1 {
                best = (index, cost);
            }
            if best.1 == 0.0 {
                break;
            }
        }
        Ok(best)
    }

    fn execute_step(
        &self,
        session: &Session,
        step: &Step,
        cost: f64,
        trace: &mut Option<&mut Vec<TraceEntry>>,
    ) -> PolicyResult<()> {
        let state = self.current();
        let outcome = match step.action() {
            // Enable steps only matter while nothing has enabled or prevented.
            Action::Enable if !state.enabled && !state.prevented => {
                let passed = step.pass(session)?;
                if passed {
                    self.update(|state| state.enabled = true);
                }
                Some(passed)
            }
            Action::Prevent if !state.prevented => {
                let passed = step.pass(session)?;
                if passed {
                    self.update(|state| state.prevented = true);
                }
                Some(passed)
            }
            _ => None,
        };

        if let Some(entries) = trace.as_deref_mut() {
            entries.push(step.trace_entry(session, cost, outcome));
        }
        Ok(())
    }

    fn current(&self) -> RunState {
        self.state().unwrap_or_default()
    }

    fn update(&self, f: impl FnOnce(&mut RunState)) {
        if let Some(state) = self.state.borrow_mut().as_mut() {
            f(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use decree_contracts::{config::EngineConfig, identity::Subject};

    use super::*;
    use crate::condition::ConditionDef;
    use crate::descriptor::PolicyBuilder;
    use crate::registry::PolicyRegistry;
    use crate::rule::{all, condition};

    #[derive(Debug)]
    struct Page;

    impl Subject for Page {
        fn policy_name(&self) -> &str {
            "page"
        }

        fn subject_key(&self) -> String {
            "page:1".to_string()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn counted(name: &str, value: bool, cost: u32, calls: &Arc<AtomicUsize>) -> ConditionDef {
        let calls = Arc::clone(calls);
        ConditionDef::new(name, move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        })
        .with_cost(cost)
    }

    fn session(policy: PolicyBuilder, threshold: usize) -> Session {
        let registry = PolicyRegistry::builder().register(policy).unwrap().build().unwrap();
        Session::new(
            Arc::new(registry),
            EngineConfig::default().with_static_sort_threshold(threshold),
        )
    }

    /// `read` has three failing enable steps declared as
    /// `all?(a, b)` [10], `c` [8], `a` [5].
    fn warming_policy(calls: &Arc<AtomicUsize>) -> PolicyBuilder {
        PolicyBuilder::new("page")
            .condition(counted("a", false, 5, calls))
            .condition(counted("b", false, 5, calls))
            .condition(counted("c", false, 8, calls))
            .enable(["read"], all([condition("a"), condition("b")]))
            .enable(["read"], condition("c"))
            .enable(["read"], condition("a"))
    }

    fn traced(session: &Session) -> (bool, Vec<(String, f64)>) {
        let policy = session.policy(None, Some(Arc::new(Page))).unwrap();
        let trace = policy.debug("read").unwrap();
        let steps = trace.steps.iter().map(|s| (s.rule.clone(), s.cost)).collect();
        (trace.allowed, steps)
    }

    #[test]
    fn adaptive_path_rescores_after_each_step() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = session(warming_policy(&calls), 50);

        let (allowed, steps) = traced(&session);
        assert!(!allowed);
        assert_eq!(
            steps,
            vec![
                ("a".to_string(), 5.0),
                ("all?(a, b)".to_string(), 0.0),
                ("c".to_string(), 8.0),
            ]
        );
        // `b` is never needed once `a` is known to fail.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn static_path_keeps_initial_order_above_threshold() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = session(warming_policy(&calls), 2);

        let (allowed, steps) = traced(&session);
        assert!(!allowed);
        assert_eq!(
            steps,
            vec![
                ("a".to_string(), 5.0),
                ("c".to_string(), 8.0),
                ("all?(a, b)".to_string(), 10.0),
            ]
        );
    }

    /// `warming_policy` with the `c` step replaced by `fillers` failing
    /// 7-cost steps, declared between the junction and `a`.
    fn padded_policy(fillers: usize, calls: &Arc<AtomicUsize>) -> PolicyBuilder {
        let mut policy = PolicyBuilder::new("page")
            .condition(counted("a", false, 5, calls))
            .condition(counted("b", false, 5, calls))
            .enable(["read"], all([condition("a"), condition("b")]));
        for i in 0..fillers {
            let name = format!("f{i}");
            policy = policy
                .condition(counted(&name, false, 7, calls))
                .enable(["read"], condition(name));
        }
        policy.enable(["read"], condition("a"))
    }

    #[test]
    fn default_threshold_is_strict() {
        let threshold = EngineConfig::default().static_sort_threshold;
        assert_eq!(threshold, 50);

        let first_two = |steps: usize| {
            let calls = Arc::new(AtomicUsize::new(0));
            let session = session(padded_policy(steps - 2, &calls), threshold);
            let (allowed, traced) = traced(&session);
            assert!(!allowed);
            assert_eq!(traced.len(), steps);
            traced.into_iter().take(2).map(|(rule, _)| rule).collect::<Vec<_>>()
        };

        // At the threshold the junction is re-scored to 0 once `a` fails.
        assert_eq!(first_two(threshold), vec!["a", "all?(a, b)"]);
        // One step more and the initial order (a, fillers, junction) holds.
        assert_eq!(first_two(threshold + 1), vec!["a", "f0"]);
    }

    #[test]
    fn both_paths_agree_on_verdicts() {
        for threshold in [0, 50] {
            let calls = Arc::new(AtomicUsize::new(0));
            let policy = PolicyBuilder::new("page")
                .condition(counted("granted", true, 3, &calls))
                .condition(counted("denied", false, 1, &calls))
                .condition(counted("blocked", true, 9, &calls))
                .enable(["read", "edit"], condition("granted"))
                .enable(["read"], condition("denied"))
                .prevent(["edit"], condition("blocked"));
            let session = session(policy, threshold);
            let page = session.policy(None, Some(Arc::new(Page))).unwrap();

            assert!(page.can("read").unwrap(), "threshold {threshold}");
            assert!(!page.can("edit").unwrap(), "threshold {threshold}");
        }
    }

    #[test]
    fn passing_prevent_skips_remaining_steps() {
        let calls = Arc::new(AtomicUsize::new(0));
        let slow = Arc::new(AtomicUsize::new(0));
        let policy = PolicyBuilder::new("page")
            .condition(counted("locked", true, 1, &calls))
            .condition(counted("owner", true, 16, &slow))
            .enable(["edit"], condition("owner"))
            .prevent(["edit"], condition("locked"));
        let session = session(policy, 50);
        let page = session.policy(None, Some(Arc::new(Page))).unwrap();

        assert!(!page.can("edit").unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(slow.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn passing_enable_drops_other_enable_steps() {
        let calls = Arc::new(AtomicUsize::new(0));
        let slow = Arc::new(AtomicUsize::new(0));
        let policy = PolicyBuilder::new("page")
            .condition(counted("public", true, 2, &calls))
            .condition(counted("owner", true, 16, &slow))
            .enable(["read"], condition("owner"))
            .enable(["read"], condition("public"));
        let session = session(policy, 50);
        let page = session.policy(None, Some(Arc::new(Page))).unwrap();

        assert!(page.can("read").unwrap());
        assert_eq!(slow.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn prevent_only_ability_is_denied_without_evaluation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = PolicyBuilder::new("page")
            .condition(counted("locked", false, 1, &calls))
            .prevent(["destroy"], condition("locked"));
        let session = session(policy, 50);
        let page = session.policy(None, Some(Arc::new(Page))).unwrap();

        assert!(!page.can("destroy").unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let runner = page.runner("destroy").unwrap();
        assert_eq!(
            runner.state(),
            Some(RunState {
                enabled: false,
                prevented: true
            })
        );
    }

    #[test]
    fn merged_runner_is_unresolved() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = PolicyBuilder::new("page")
            .condition(counted("public", true, 2, &calls))
            .enable(["read"], condition("public"))
            .enable(["list"], condition("public"));
        let session = session(policy, 50);
        let page = session.policy(None, Some(Arc::new(Page))).unwrap();

        let read = page.runner("read").unwrap();
        assert!(read.pass(&session).unwrap());

        let merged = read.merge(&page.runner("list").unwrap());
        assert_eq!(merged.steps().len(), 2);
        assert_eq!(merged.cached_pass(), None);
        assert_eq!(merged.cost(&session).unwrap(), 0.0);
    }
}
