//! The two things a rule can do to an ability.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Whether a passing rule grants or blocks the ability it is attached to.
///
/// A single passing `Prevent` always wins over any number of passing
/// `Enable`s for the same ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Enable,
    Prevent,
}

impl Action {
    pub fn is_enable(&self) -> bool {
        matches!(self, Action::Enable)
    }

    pub fn is_prevent(&self) -> bool {
        matches!(self, Action::Prevent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Enable => "enable",
            Action::Prevent => "prevent",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enable" => Ok(Action::Enable),
            "prevent" => Ok(Action::Prevent),
            other => Err(PolicyError::InvalidAction {
                action: other.to_string(),
            }),
        }
    }
}
