//! Scenario 4: Archived projects and locked discussions
//!
//! acme/legacy is archived: the project rule file prevents every write
//! ability there, and issues inherit the prevention through delegation.
//! Its only issue has a locked discussion. Issuables in general are never
//! locked; the issue policy redefines the `locked` condition for issues.

use decree_contracts::error::PolicyResult;

use crate::mock_data::{alice, dave, legacy, legacy_migration, website_bug};
use crate::scenarios::{as_actor, as_subject, check, new_session, print_checks, Check};

pub const TITLE: &str = "Scenario 4: Archived projects and locked discussions";

pub fn checks() -> PolicyResult<Vec<Check>> {
    let session = new_session()?;
    let legacy = as_subject(legacy());
    let migration = as_subject(legacy_migration());
    let bug = as_subject(website_bug());

    let table = [
        (as_actor(alice()), &legacy, "read_project", true),
        (as_actor(alice()), &legacy, "create_issue", false),
        (as_actor(alice()), &legacy, "admin_project", true),
        (as_actor(alice()), &migration, "read_issue", true),
        (as_actor(alice()), &migration, "update_issue", false),
        (as_actor(alice()), &migration, "create_note", false),
        (as_actor(dave()), &migration, "read_issue", true),
        (as_actor(dave()), &migration, "create_note", false),
        (as_actor(alice()), &bug, "create_note", true),
        (as_actor(dave()), &bug, "update_issue", true),
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
