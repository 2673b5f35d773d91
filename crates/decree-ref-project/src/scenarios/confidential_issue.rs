//! Scenario 2: Confidential issues in a private project
//!
//! Issues delegate to their project, so project membership rules apply to
//! them. A confidential issue is further restricted to its author, its
//! assignees, project reporters and administrators.
//!
//! What to look for in the output:
//!   1. carol is a guest: she may read the project's issues, but not the
//!      confidential one, and so may not comment on it either.
//!   2. dave opened acme/billing#2 but is no longer a member, so authorship
//!      alone does not let him read it.

use decree_contracts::error::PolicyResult;

use crate::mock_data::{alice, billing_incident, billing_request, bob, carol, dave, root};
use crate::scenarios::{as_actor, as_subject, check, new_session, print_checks, Check};

pub const TITLE: &str = "Scenario 2: Confidential issues in a private project";

pub fn checks() -> PolicyResult<Vec<Check>> {
    let session = new_session()?;
    let incident = as_subject(billing_incident());
    let request = as_subject(billing_request());

    let table = [
        (as_actor(bob()), &incident, "read_issue", true),
        (as_actor(bob()), &incident, "create_note", true),
        (as_actor(alice()), &incident, "update_issue", true),
        (as_actor(carol()), &incident, "read_issue", false),
        (as_actor(carol()), &incident, "create_note", false),
        (as_actor(dave()), &incident, "read_issue", false),
        (as_actor(root()), &incident, "read_issue", true),
        (as_actor(carol()), &request, "read_issue", true),
        (as_actor(carol()), &request, "update_issue", true),
        (as_actor(dave()), &request, "read_issue", false),
        (as_actor(dave()), &request, "update_issue", false),
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
