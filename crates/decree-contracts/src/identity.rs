//! Identity traits for the two parties of every authorization decision.
//!
//! The engine never inspects actors or subjects beyond these traits. Domain
//! predicates recover the concrete type with `as_any().downcast_ref()`.

use std::any::Any;
use std::fmt;

/// Fingerprint used for an absent (anonymous) actor.
pub const ANONYMOUS_ACTOR_KEY: &str = "<anonymous>";

/// Fingerprint used for an absent subject.
pub const NIL_SUBJECT_KEY: &str = "<nil>";

/// The party requesting an ability (usually a user).
pub trait Actor: Any + fmt::Debug {
    /// A stable fingerprint, unique among actors of the host application.
    ///
    /// Must be identical for two values representing the same actor, since
    /// it is the cache key for `user` and `normal` scoped conditions.
    fn actor_key(&self) -> String;

    fn as_any(&self) -> &dyn Any;
}

/// The resource an ability is requested on.
pub trait Subject: Any + fmt::Debug {
    /// The registry name of the policy type that governs this subject.
    fn policy_name(&self) -> &str;

    /// A stable fingerprint, unique among subjects of the host application.
    fn subject_key(&self) -> String;

    fn as_any(&self) -> &dyn Any;
}

/// Fingerprint of an optional actor.
pub fn actor_key(actor: Option<&dyn Actor>) -> String {
    actor
        .map(|a| a.actor_key())
        .unwrap_or_else(|| ANONYMOUS_ACTOR_KEY.to_string())
}

/// Fingerprint of an optional subject.
pub fn subject_key(subject: Option<&dyn Subject>) -> String {
    subject
        .map(|s| s.subject_key())
        .unwrap_or_else(|| NIL_SUBJECT_KEY.to_string())
}
