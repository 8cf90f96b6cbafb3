//! Command handler layer.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate engine behavior to `services/*`.
//! - Keep behavior and output schema stable.

pub mod run;

pub use run::{handle_catalog, handle_run};
