//! Turn orchestration for Heatline.
//!
//! The [`TurnOrchestrator`] drives one turn end to end: retrieve
//! knowledge, consult the model, dispatch any requested tools, aggregate
//! the answer, and hand the finalized turn to the audit sink. Its
//! collaborators — retrieval, completion, tools, audit — are trait
//! objects injected at construction.

pub mod directive;
pub mod orchestrator;

pub use directive::{Persona, build_directive};
pub use orchestrator::TurnOrchestrator;
