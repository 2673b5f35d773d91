//! The registry of composed policy descriptors, keyed by policy name.
//!
//! Built once at startup with `RegistryBuilder` and immutable afterwards;
//! share it across threads behind an `Arc` and open one `Session` per
//! authorization decision.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use decree_contracts::{
    error::{PolicyError, PolicyResult},
    identity::Subject,
};

use crate::descriptor::{PolicyBuilder, PolicyDescriptor};

/// Name of the descriptor used for an absent subject when no global policy
/// is configured. It has no rules, so every ability is denied.
pub const NIL_POLICY: &str = "nil";

#[derive(Debug)]
pub struct PolicyRegistry {
    descriptors: HashMap<String, Arc<PolicyDescriptor>>,
    global: Option<Arc<PolicyDescriptor>>,
    nil: Arc<PolicyDescriptor>,
}

impl PolicyRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn descriptor(&self, name: &str) -> PolicyResult<Arc<PolicyDescriptor>> {
        self.descriptors
            .get(name)
            .cloned()
            .ok_or_else(|| PolicyError::UnknownPolicy {
                name: name.to_string(),
            })
    }

    /// The descriptor governing `subject`: the one named by its
    /// `policy_name`, or the global (else nil) policy for an absent subject.
    pub fn descriptor_for(&self, subject: Option<&dyn Subject>) -> PolicyResult<Arc<PolicyDescriptor>> {
        match subject {
            Some(subject) => self.descriptor(subject.policy_name()),
            None => Ok(self.global.clone().unwrap_or_else(|| Arc::clone(&self.nil))),
        }
    }

    pub fn policy_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.descriptors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    descriptors: HashMap<String, Arc<PolicyDescriptor>>,
    global: Option<String>,
}

impl RegistryBuilder {
    /// Compose `policy` onto its parent and register it under its name.
    /// Parents must be registered before their subtypes.
    pub fn register(mut self, policy: PolicyBuilder) -> PolicyResult<Self> {
        let name = policy.name().to_string();
        if self.descriptors.contains_key(&name) {
            return Err(PolicyError::DuplicatePolicy { name });
        }

        let parent = match policy.parent() {
            Some(parent) => Some(self.descriptors.get(parent).cloned().ok_or_else(|| {
                PolicyError::UnknownPolicy {
                    name: parent.to_string(),
                }
            })?),
            None => None,
        };

        let descriptor = PolicyDescriptor::compose(parent.as_deref(), policy);
        info!(
            policy = %name,
            parent = ?parent.as_ref().map(|p| p.name().to_string()),
            abilities = descriptor.abilities().len(),
            "registered policy"
        );
        self.descriptors.insert(name, Arc::new(descriptor));
        Ok(self)
    }

    /// Use the registered policy `name` for decisions with no subject.
    pub fn global(mut self, name: impl Into<String>) -> Self {
        self.global = Some(name.into());
        self
    }

    pub fn build(self) -> PolicyResult<PolicyRegistry> {
        let global = match self.global {
            Some(name) => Some(self.descriptors.get(&name).cloned().ok_or(
                PolicyError::UnknownPolicy { name },
            )?),
            None => None,
        };

        Ok(PolicyRegistry {
            descriptors: self.descriptors,
            global,
            nil: Arc::new(PolicyDescriptor::empty(NIL_POLICY)),
        })
    }
}
