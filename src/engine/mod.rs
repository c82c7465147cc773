//! Check engine.
//!
//! Provides the run context, check registration, orchestration, and result
//! aggregation.

pub mod context;
pub mod orchestrator;
pub mod registry;
pub mod result;
