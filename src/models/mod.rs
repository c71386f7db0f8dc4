//! Domain models for ideaflow.
//!
//! # Core Concepts
//!
//! ## Client-owned
//!
//! - [`AgentKind`]: One backend capability that produces a report for an idea.
//! - [`Outcome`]: Lifecycle of one stored agent result.
//! - [`ResultKey`]: Identity of a stored result. One per (idea, kind), except
//!   legal documents, which are keyed by document type as well.
//! - [`AgentResult`]: A stored result plus its decoded status.
//!
//! ## Backend-owned
//!
//! Everything else mirrors the backend's JSON contract. Ideas are referenced
//! only by id; report bodies stay as JSON with typed views where the client
//! reads specific fields.

mod agent;
mod idea;
mod report;
mod user;

pub use agent::*;
pub use idea::*;
pub use report::*;
pub use user::*;
