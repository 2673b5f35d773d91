//! Cache scopes for condition results.
//!
//! A condition's scope decides which parts of the evaluation context its
//! cached result is keyed on, and therefore how widely the result is shared
//! between policy instances that use the same session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// The cache-sharing granularity of a condition.
///
/// Expressed as a lowercase string in configuration files:
/// ```toml
/// preferred_scope = "user"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scope {
    /// Depends on neither actor nor subject. Keyed on the condition alone.
    Global,
    /// Depends only on the actor.
    User,
    /// Depends only on the subject.
    Subject,
    /// Depends on the (actor, subject) pair.
    #[default]
    Normal,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::User => "user",
            Scope::Subject => "subject",
            Scope::Normal => "normal",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Scope::Global),
            "user" => Ok(Scope::User),
            "subject" => Ok(Scope::Subject),
            "normal" => Ok(Scope::Normal),
            other => Err(PolicyError::InvalidScope {
                scope: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Scope {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.as_str().to_string()
    }
}
