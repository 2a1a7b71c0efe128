//! Domain models for docgen.
//!
//! # Core Concepts
//!
//! - [`User`]: An account that owns projects. Only referenced by projects, never owned.
//! - [`Project`]: A document generation project, either a written report or a slide deck.
//! - [`Section`]: One entry of a project's outline. Sections are owned by their project
//!   and deleted with it.
//!
//! ## Section lifecycle
//!
//! Sections are created with placeholder content and resolved by the content pipeline:
//!
//! ```text
//! Pending ("Generating...") ──► Generated (sanitized text)
//!                          └──► Failed ("Error generating.")
//! ```
//!
//! Refine may later overwrite a resolved section with new generated text.

mod project;
mod section;
mod user;

pub use project::*;
pub use section::*;
pub use user::*;
