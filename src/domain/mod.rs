//! Shared data model layer (structs/constants only).
//!
//! ## Purpose
//! - Keep the removal targets, run state and report structs in one place.
//! - Avoid cyclic imports and duplicated type definitions.
//! - Make JSON output schema changes explicit and reviewable.
//!
//! ## Files
//! - `models.rs` — targets, run context, backup records, summary structs.
//! - `catalog.rs` — the declarative list of removal targets per scope.
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem/registry side effects.

pub mod catalog;
pub mod models;
