//! Scenario 3: Blocked accounts
//!
//! Every reference policy inherits `prevent_all when blocked` from the base
//! policy. mallory is a developer on acme/website, but her account is
//! blocked, so no ability survives: not on projects, not on issues, not on
//! the global policy used when there is no subject at all.

use decree_contracts::error::PolicyResult;

use crate::mock_data::{alice, mallory, root, website, website_bug};
use crate::scenarios::{as_actor, as_subject, check, new_session, print_checks, Check};

pub const TITLE: &str = "Scenario 3: Blocked accounts";

pub fn checks() -> PolicyResult<Vec<Check>> {
    let session = new_session()?;
    let website = as_subject(website());
    let bug = as_subject(website_bug());

    let table = [
        (as_actor(mallory()), &website, "read_project", false),
        (as_actor(mallory()), &website, "create_issue", false),
        (as_actor(mallory()), &bug, "read_issue", false),
        (as_actor(mallory()), &None, "create_project", false),
        (as_actor(alice()), &None, "create_project", true),
        (as_actor(alice()), &None, "read_admin_area", false),
        (as_actor(root()), &None, "read_admin_area", true),
        (None, &None, "create_project", false),
    ];

    table
        .into_iter()
        .map(|(actor, subject, ability, expected)| check(&session, actor, subject.clone(), ability, expected))
        .collect()
}

/// Whether `banned` holds for mallory and for alice on acme/website.
pub fn bans() -> PolicyResult<(bool, bool)> {
    let session = new_session()?;
    let mallory = session.policy(as_actor(mallory()), as_subject(website()))?.banned()?;
    let alice = session.policy(as_actor(alice()), as_subject(website()))?.banned()?;
    Ok((mallory, alice))
}

pub fn run_scenario() -> PolicyResult<()> {
    print_checks(TITLE, &checks()?);

    let (mallory, alice) = bans()?;
    println!("  banned on acme/website: mallory={} alice={}", mallory, alice);
    println!();
    Ok(())
}
