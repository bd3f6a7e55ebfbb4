//! Execution engine for localfile
//!
//! The engine orchestrates:
//! 1. Planning - Build file resources from manifest and state
//! 2. Diffing - Compute current vs desired state
//! 3. Executing - Remove, then materialize, with progress and confirmation

pub mod differ;
pub mod executor;
pub mod planner;

pub use differ::write_diff;
pub use executor::execute;
pub use planner::{apply_plan, destroy_plan};
