//! DECREE Project-Tracker Reference Demo CLI
//!
//! Runs one or all of the four reference scenarios, or explains a single
//! decision step by step.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- project-access
//!   cargo run -p demo -- explain --user carol --subject acme/billing#1 --ability read_issue
//!   cargo run -p demo -- explain --subject acme/website --ability read_project --json

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use decree_contracts::{
    error::{PolicyError, PolicyResult},
    identity::Actor,
};
use decree_policy::load_engine_config_file;
use decree_ref_project::{
    mock_data::{subject_by_ref, user_by_name},
    policies,
    scenarios::{archived_project, blocked_user, confidential_issue, explain, project_access},
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// DECREE: declarative, lazily evaluated authorization policies.
///
/// Each scenario subcommand evaluates a table of (user, subject, ability)
/// questions against the reference project-tracker policies.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "DECREE project-tracker reference demo",
    long_about = "Runs DECREE reference scenarios showing inherited policies, delegation,\n\
                  prevent rules, and lazily evaluated, cached conditions."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four scenarios in sequence.
    RunAll,
    /// Scenario 1: Project access by membership level.
    ProjectAccess,
    /// Scenario 2: Confidential issues in a private project.
    ConfidentialIssue,
    /// Scenario 3: Blocked accounts.
    BlockedUser,
    /// Scenario 4: Archived projects and locked discussions.
    ArchivedProject,
    /// Trace the evaluation of one ability.
    Explain {
        /// Username (alice, bob, carol, dave, mallory, root). Omit for anonymous.
        #[arg(long)]
        user: Option<String>,
        /// Project path (acme/billing) or issue reference (acme/billing#1).
        /// Omit to use the global policy.
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        ability: String,
        /// Engine config TOML overriding the reference one.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print the trace as JSON.
        #[arg(long)]
        json: bool,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::RunAll => {
            print_banner();
            run_all()
        }
        Command::ProjectAccess => project_access::run_scenario(),
        Command::ConfidentialIssue => confidential_issue::run_scenario(),
        Command::BlockedUser => blocked_user::run_scenario(),
        Command::ArchivedProject => archived_project::run_scenario(),
        Command::Explain {
            user,
            subject,
            ability,
            config,
            json,
        } => run_explain(user, subject, &ability, config, json),
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

fn run_all() -> PolicyResult<()> {
    project_access::run_scenario()?;
    confidential_issue::run_scenario()?;
    blocked_user::run_scenario()?;
    archived_project::run_scenario()?;
    Ok(())
}

fn run_explain(
    user: Option<String>,
    subject: Option<String>,
    ability: &str,
    config: Option<PathBuf>,
    json: bool,
) -> PolicyResult<()> {
    let actor = match user.as_deref() {
        Some(name) => Some(user_by_name(name).ok_or_else(|| unknown_reference("user", name))?),
        None => None,
    };
    let subject = match subject.as_deref() {
        Some(reference) => {
            Some(subject_by_ref(reference).ok_or_else(|| unknown_reference("subject", reference))?)
        }
        None => None,
    };
    let config = match config {
        Some(path) => load_engine_config_file(&path)?,
        None => policies::engine_config()?,
    };
    debug!(?config, "explaining decision");

    let trace = explain(config, actor.map(|a| a as Arc<dyn Actor>), subject, ability)?;
    if json {
        let rendered = serde_json::to_string_pretty(&trace).map_err(|e| PolicyError::ConfigError {
            reason: format!("failed to render trace as JSON: {}", e),
        })?;
        println!("{}", rendered);
    } else {
        println!("{}", trace);
    }
    Ok(())
}

fn unknown_reference(kind: &str, name: &str) -> PolicyError {
    PolicyError::ConfigError {
        reason: format!("no reference {} named '{}'", kind, name),
    }
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("DECREE: Declarative Authorization Policies");
    println!("Project-Tracker Reference Demo");
    println!("==========================================");
    println!();
    println!("Evaluation per ability:");
    println!("  [1] Collect enable/prevent steps from the policy, its parents and its delegates");
    println!("  [2] Inline ability references where safe; split `any` rules into steps");
    println!("  [3] Run the cheapest step first; cached conditions cost nothing");
    println!("  [4] Stop once a prevent passes, or once nothing left can change the verdict");
    println!();
}
