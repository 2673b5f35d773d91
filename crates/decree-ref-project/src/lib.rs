//! # decree-ref-project
//!
//! Project-tracker reference domain for the DECREE policy engine.
//!
//! Demonstrates four access scenarios using mock data:
//!
//! 1. **Project access**: membership levels, public and private projects,
//!    rules loaded from a TOML rule file.
//! 2. **Confidential issues**: issues delegating to their project, plus a
//!    prevent rule reading a condition of the delegated project policy.
//! 3. **Blocked accounts**: an inherited `prevent_all` rule.
//! 4. **Archived projects**: prevention inherited through delegation, and a
//!    subtype redefining a parent's condition.
//!
//! All data is hardcoded and fictional.

pub mod mock_data;
pub mod policies;
pub mod scenarios;
