//! Simulated project-tracker data for the DECREE reference domain.
//!
//! All data in this module is hardcoded and fictional. It stands in for the
//! user, project and issue tables of a real host application.
//!
//! | user    | acme/website (public) | acme/billing (private) | acme/legacy (public, archived) |
//! |---------|-----------------------|------------------------|--------------------------------|
//! | alice   | maintainer            | maintainer             | maintainer                     |
//! | bob     |                       | developer              |                                |
//! | carol   |                       | guest                  |                                |
//! | dave    |                       |                        |                                |
//! | mallory | developer (blocked)   |                        |                                |
//! | root    | admin                 | admin                  | admin                          |

use std::any::Any;
use std::sync::Arc;

use decree_contracts::identity::{Actor, Subject};

// ── Users ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u32,
    pub username: String,
    pub admin: bool,
    pub blocked: bool,
}

impl User {
    fn new(id: u32, username: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            admin: false,
            blocked: false,
        }
    }
}

impl Actor for User {
    fn actor_key(&self) -> String {
        format!("user:{}", self.username)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn alice() -> Arc<User> {
    Arc::new(User::new(1, "alice"))
}

pub fn bob() -> Arc<User> {
    Arc::new(User::new(2, "bob"))
}

pub fn carol() -> Arc<User> {
    Arc::new(User::new(3, "carol"))
}

pub fn dave() -> Arc<User> {
    Arc::new(User::new(4, "dave"))
}

pub fn mallory() -> Arc<User> {
    Arc::new(User {
        blocked: true,
        ..User::new(5, "mallory")
    })
}

pub fn root() -> Arc<User> {
    Arc::new(User {
        admin: true,
        ..User::new(6, "root")
    })
}

pub fn user_by_name(username: &str) -> Option<Arc<User>> {
    [alice(), bob(), carol(), dave(), mallory(), root()]
        .into_iter()
        .find(|user| user.username == username)
}

// ── Projects ──────────────────────────────────────────────────────────────────

/// Membership levels, each including the permissions of those below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessLevel {
    Guest,
    Reporter,
    Developer,
    Maintainer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub id: u32,
    pub path: String,
    pub visibility: Visibility,
    pub archived: bool,
    pub issues_enabled: bool,
    pub members: Vec<(u32, AccessLevel)>,
}

impl Project {
    pub fn access_level(&self, user_id: u32) -> Option<AccessLevel> {
        self.members
            .iter()
            .find(|(id, _)| *id == user_id)
            .map(|(_, level)| *level)
    }
}

impl Subject for Project {
    fn policy_name(&self) -> &str {
        "project"
    }

    fn subject_key(&self) -> String {
        format!("project:{}", self.path)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn website() -> Arc<Project> {
    Arc::new(Project {
        id: 10,
        path: "acme/website".to_string(),
        visibility: Visibility::Public,
        archived: false,
        issues_enabled: true,
        members: vec![(1, AccessLevel::Maintainer), (5, AccessLevel::Developer)],
    })
}

pub fn billing() -> Arc<Project> {
    Arc::new(Project {
        id: 11,
        path: "acme/billing".to_string(),
        visibility: Visibility::Private,
        archived: false,
        issues_enabled: true,
        members: vec![
            (1, AccessLevel::Maintainer),
            (2, AccessLevel::Developer),
            (3, AccessLevel::Guest),
        ],
    })
}

pub fn legacy() -> Arc<Project> {
    Arc::new(Project {
        id: 12,
        path: "acme/legacy".to_string(),
        visibility: Visibility::Public,
        archived: true,
        issues_enabled: true,
        members: vec![(1, AccessLevel::Maintainer)],
    })
}

// ── Issues ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Issue {
    pub iid: u32,
    pub project: Arc<Project>,
    pub author_id: u32,
    pub assignee_ids: Vec<u32>,
    pub confidential: bool,
    pub discussion_locked: bool,
}

impl Issue {
    fn new(project: Arc<Project>, iid: u32, author_id: u32) -> Self {
        Self {
            iid,
            project,
            author_id,
            assignee_ids: Vec::new(),
            confidential: false,
            discussion_locked: false,
        }
    }
}

impl Subject for Issue {
    fn policy_name(&self) -> &str {
        "issue"
    }

    fn subject_key(&self) -> String {
        format!("issue:{}#{}", self.project.path, self.iid)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// acme/website#1, opened by dave.
pub fn website_bug() -> Arc<Issue> {
    Arc::new(Issue::new(website(), 1, 4))
}

/// acme/billing#1, a confidential issue opened by bob.
pub fn billing_incident() -> Arc<Issue> {
    Arc::new(Issue {
        confidential: true,
        ..Issue::new(billing(), 1, 2)
    })
}

/// acme/billing#2, opened by dave before he lost access to the project.
pub fn billing_request() -> Arc<Issue> {
    Arc::new(Issue {
        assignee_ids: vec![3],
        ..Issue::new(billing(), 2, 4)
    })
}

/// acme/legacy#1, opened by alice, discussion locked.
pub fn legacy_migration() -> Arc<Issue> {
    Arc::new(Issue {
        discussion_locked: true,
        ..Issue::new(legacy(), 1, 1)
    })
}

/// Look up a subject by reference: `acme/billing` for a project,
/// `acme/billing#1` for an issue.
pub fn subject_by_ref(reference: &str) -> Option<Arc<dyn Subject>> {
    if let Some((path, iid)) = reference.split_once('#') {
        let iid: u32 = iid.parse().ok()?;
        return [website_bug(), billing_incident(), billing_request(), legacy_migration()]
            .into_iter()
            .find(|issue| issue.project.path == path && issue.iid == iid)
            .map(|issue| issue as Arc<dyn Subject>);
    }

    [website(), billing(), legacy()]
        .into_iter()
        .find(|project| project.path == reference)
        .map(|project| project as Arc<dyn Subject>)
}
