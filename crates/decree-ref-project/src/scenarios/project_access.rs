//! Scenario 1: Project access by membership level
//!
//! Walks a public and a private project with users at every membership
//! level, an outsider, an administrator and an anonymous visitor. All
//! project rules come from `policies/project.toml`.
//!
//! What to look for in the output:
//!   1. Public projects are readable by everyone, including anonymous visitors.
//!   2. Private projects are readable by members and administrators only.
//!   3. `update_issue` needs reporter access; `admin_project` needs maintainer.

use decree_contracts::error::PolicyResult;

use crate::mock_data::{alice, billing, bob, carol, dave, root, website};
use crate::scenarios::{as_actor, as_subject, check, new_session, print_checks, Check};

pub const TITLE: &str = "Scenario 1: Project access by membership level";

pub fn checks() -> PolicyResult<Vec<Check>> {
    let session = new_session()?;
    let website = as_subject(website());
    let billing = as_subject(billing());

    let table = [
        (as_actor(alice()), &website, "read_project", true),
        (as_actor(alice()), &website, "create_issue", true),
        (as_actor(alice()), &website, "admin_project", true),
        (as_actor(dave()), &website, "read_project", true),
        (as_actor(dave()), &website, "read_issue", true),
        (as_actor(dave()), &website, "create_issue", false),
        (None, &website, "read_project", true),
        (None, &website, "create_issue", false),
        (as_actor(dave()), &billing, "read_project", false),
        (as_actor(dave()), &billing, "read_issue", false),
        (as_actor(carol()), &billing, "read_project", true),
        (as_actor(carol()), &billing, "create_issue", true),
        (as_actor(carol()), &billing, "update_issue", false),
        (as_actor(bob()), &billing, "update_issue", true),
        (as_actor(bob()), &billing, "admin_project", false),
        (as_actor(root()), &billing, "read_issue", true),
        (as_actor(root()), &billing, "admin_project", true),
    ];

    table
        .into_iter()
        .map(|(actor, subject, ability, expected)| check(&session, actor, subject.clone(), ability, expected))
        .collect()
}

pub fn run_scenario() -> PolicyResult<()> {
    print_checks(TITLE, &checks()?);
    Ok(())
}
