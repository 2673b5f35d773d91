//! Debug traces produced by `Policy::debug`.
//!
//! A trace is purely diagnostic. Producing one never changes the verdict of
//! the ability it describes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// One step selected by the runner, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub action: Action,
    /// Textual form of the step's rule, e.g. `all?(owner, ~archived)`.
    pub rule: String,
    /// `(actor : subject)` of the policy instance the step belongs to.
    pub context: String,
    /// The step's cost at the moment it was selected.
    pub cost: f64,
    /// `None` when the step was skipped because it could not change the verdict.
    pub outcome: Option<bool>,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self.outcome {
            Some(true) => '+',
            Some(false) => '-',
            None => ' ',
        };
        write!(
            f,
            "{} [{}] {} when {} {}",
            symbol, self.cost as u64, self.action, self.rule, self.context
        )
    }
}

/// The full trace for one ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugTrace {
    pub ability: String,
    pub allowed: bool,
    pub steps: Vec<TraceEntry>,
}

impl fmt::Display for DebugTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "- ability: {}", self.ability)?;
        for step in &self.steps {
            writeln!(f, "{}", step)?;
        }
        write!(f, "=> {}", if self.allowed { "allowed" } else { "denied" })
    }
}
