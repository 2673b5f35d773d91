//! Policy declarations for the reference project tracker.
//!
//! ```text
//! base ─┬─ global      (absent subject)
//!       ├─ project     (rules from policies/project.toml)
//!       └─ issuable ── issue ··· delegates to its project
//! ```
//!
//! `base` holds the user-scoped conditions and the ban every other policy
//! inherits. Issues delegate to their project, so project rules for
//! `read_issue`, `update_issue` and friends apply to every issue as well.

use std::sync::Arc;

use tracing::info;

use decree_contracts::{
    config::EngineConfig,
    error::PolicyResult,
    identity::Subject,
    scope::Scope,
};
use decree_core::{
    ability, any, condition, delegated, none, ConditionDef, Policy, PolicyBuilder, PolicyRegistry,
};
use decree_policy::{load_engine_config, TomlRuleLoader};

use crate::mock_data::{AccessLevel, Issue, Project, User, Visibility};

const ENGINE_CONFIG: &str = include_str!("../policies/engine.toml");
const PROJECT_RULES: &str = include_str!("../policies/project.toml");

pub fn engine_config() -> PolicyResult<EngineConfig> {
    load_engine_config(ENGINE_CONFIG)
}

/// Compose every reference policy. Parents are registered first.
pub fn registry() -> PolicyResult<PolicyRegistry> {
    let registry = PolicyRegistry::builder()
        .register(base_policy())?
        .register(global_policy())?
        .register(project_policy()?)?
        .register(issuable_policy())?
        .register(issue_policy())?
        .global("global")
        .build()?;
    info!(policies = ?registry.policy_names(), "reference registry ready");
    Ok(registry)
}

// ── Predicates ────────────────────────────────────────────────────────────────

fn user<'p>(p: &'p Policy<'_>) -> Option<&'p User> {
    p.actor_as::<User>()
}

fn project<'p>(p: &'p Policy<'_>) -> Option<&'p Project> {
    p.subject_as::<Project>()
}

fn issue<'p>(p: &'p Policy<'_>) -> Option<&'p Issue> {
    p.subject_as::<Issue>()
}

/// Holds for members at `level` or above.
fn member_at_least(level: AccessLevel) -> impl Fn(&Policy<'_>) -> PolicyResult<bool> + Send + Sync + 'static {
    move |p| {
        Ok(match (user(p), project(p)) {
            (Some(user), Some(project)) => project.access_level(user.id).is_some_and(|l| l >= level),
            _ => false,
        })
    }
}

/// Whether the actor may read the project of this issue. Evaluated by the
/// delegated project policy, so its result is shared with project rules.
fn can_read_project(p: &Policy<'_>) -> PolicyResult<bool> {
    match p.delegated_policy("project")? {
        Some(project) => project.can("read_project"),
        None => Ok(false),
    }
}

// ── Policies ──────────────────────────────────────────────────────────────────

fn base_policy() -> PolicyBuilder {
    PolicyBuilder::new("base")
        .condition(
            ConditionDef::new("admin", |p| Ok(user(p).is_some_and(|u| u.admin)))
                .with_scope(Scope::User)
                .with_description("instance administrator"),
        )
        .condition(
            ConditionDef::new("blocked", |p| Ok(user(p).is_some_and(|u| u.blocked)))
                .with_scope(Scope::User)
                .with_description("account blocked by an administrator"),
        )
        .condition(ConditionDef::new("anonymous", |p| Ok(p.actor().is_none())).with_scope(Scope::User))
        .prevent_all(condition("blocked"))
}

fn global_policy() -> PolicyBuilder {
    PolicyBuilder::new("global")
        .inherits("base")
        .enable(["create_project"], !condition("anonymous"))
        .enable(["read_admin_area"], condition("admin"))
}

fn project_policy() -> PolicyResult<PolicyBuilder> {
    let builder = PolicyBuilder::new("project")
        .inherits("base")
        .condition(
            ConditionDef::new("public", |p| {
                Ok(project(p).is_some_and(|pr| pr.visibility == Visibility::Public))
            })
            .with_scope(Scope::Subject),
        )
        .condition(
            ConditionDef::new("archived", |p| Ok(project(p).is_some_and(|pr| pr.archived)))
                .with_scope(Scope::Subject),
        )
        .condition(
            ConditionDef::new("issues_enabled", |p| Ok(project(p).is_some_and(|pr| pr.issues_enabled)))
                .with_scope(Scope::Subject),
        )
        .condition(ConditionDef::new("guest", member_at_least(AccessLevel::Guest)))
        .condition(ConditionDef::new("reporter", member_at_least(AccessLevel::Reporter)))
        .condition(ConditionDef::new("developer", member_at_least(AccessLevel::Developer)))
        .condition(ConditionDef::new("maintainer", member_at_least(AccessLevel::Maintainer)));

    TomlRuleLoader::from_toml_str(PROJECT_RULES)?.apply(builder)
}

/// Rules shared by every kind of issuable.
fn issuable_policy() -> PolicyBuilder {
    PolicyBuilder::new("issuable")
        .inherits("base")
        .condition(ConditionDef::new("author", |p| {
            Ok(match (user(p), issue(p)) {
                (Some(user), Some(issue)) => issue.author_id == user.id,
                _ => false,
            })
        }))
        .condition(ConditionDef::new("assignee", |p| {
            Ok(match (user(p), issue(p)) {
                (Some(user), Some(issue)) => issue.assignee_ids.contains(&user.id),
                _ => false,
            })
        }))
        // Issuables in general cannot be locked; subtypes that can say so.
        .condition(ConditionDef::new("locked", |_| Ok(false)).with_scope(Scope::Global))
        .enable(["read_issue", "update_issue"], condition("author") | condition("assignee"))
        .enable(["create_note"], ability("read_issue"))
        .prevent(["create_note"], condition("locked"))
}

fn issue_policy() -> PolicyBuilder {
    PolicyBuilder::new("issue")
        .inherits("issuable")
        .condition(
            ConditionDef::new("locked", |p| Ok(issue(p).is_some_and(|i| i.discussion_locked)))
                .with_scope(Scope::Subject),
        )
        .condition(
            ConditionDef::new("confidential", |p| Ok(issue(p).is_some_and(|i| i.confidential)))
                .with_scope(Scope::Subject),
        )
        .condition(ConditionDef::new("can_read_project", can_read_project))
        .delegate("project", |p| {
            Ok(issue(p).map(|i| Arc::clone(&i.project) as Arc<dyn Subject>))
        })
        .prevent(
            ["read_issue"],
            condition("confidential")
                & none([
                    condition("author"),
                    condition("assignee"),
                    delegated("project", "reporter"),
                    condition("admin"),
                ]),
        )
        .prevent(
            ["read_issue", "update_issue", "create_note"],
            !any([condition("can_read_project"), condition("admin")]),
        )
}

#[cfg(test)]
mod tests {
    use decree_contracts::action::Action;

    use super::*;

    #[test]
    fn registry_composes_every_reference_policy() {
        let registry = registry().unwrap();
        assert_eq!(
            registry.policy_names(),
            vec!["base", "global", "issuable", "issue", "project"]
        );
    }

    #[test]
    fn engine_config_prefers_user_scope() {
        let config = engine_config().unwrap();
        assert_eq!(config.preferred_scope, Some(Scope::User));
        assert_eq!(config.static_sort_threshold, 50);
    }

    #[test]
    fn issue_inherits_issuable_rules_and_base_ban() {
        let registry = registry().unwrap();
        let issue = registry.descriptor("issue").unwrap();
        let update = issue.configuration_for("update_issue");

        assert_eq!(update[0], (Action::Enable, condition("author") | condition("assignee")));
        assert_eq!(update.last(), Some(&(Action::Prevent, condition("blocked"))));
        assert_eq!(issue.condition("locked").unwrap().scope(), Scope::Subject);
    }

    #[test]
    fn project_rules_come_from_the_rule_file() {
        let registry = registry().unwrap();
        let project = registry.descriptor("project").unwrap();
        assert_eq!(
            project.configuration_for("admin_project"),
            vec![
                (Action::Enable, condition("maintainer") | condition("admin")),
                (Action::Prevent, condition("blocked")),
            ]
        );
    }
}
