//! Service layer containing the engine's behavior and side-effect helpers.
//!
//! ## Service map
//! - `engine.rs` — scope sequencing for one run.
//! - `executor.rs` — backup-then-remove for one target + abort policy.
//! - `backup.rs` — timestamped, restorable copies before any destruction.
//! - `ops.rs` — every mutating primitive, dry-run gated in one place.
//! - `registry.rs` — registry trait, `reg.exe` adapter, in-memory fake.
//! - `profiles.rs` — loaded user-hive enumeration.
//! - `unenroll.rs` — optional MDM unenrollment step.
//! - `reconcile.rs` — policy refresh + run summary assembly.
//! - `runlog.rs` — ordered, leveled operator log.
//! - `logging.rs` — diagnostic file log (tracing).
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - Every component takes the `RunContext` by reference; no ambient state.
//! - Failures are handled at the lowest level and become a log entry plus a
//!   continue/abort signal; no error crosses a scope boundary.

pub mod backup;
pub mod engine;
pub mod executor;
pub mod logging;
pub mod ops;
pub mod output;
pub mod profiles;
pub mod reconcile;
pub mod registry;
pub mod runlog;
pub mod unenroll;
