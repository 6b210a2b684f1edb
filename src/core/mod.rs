//! Core contracts and the consultation orchestrator.

pub mod error;
pub mod oracle;
pub mod orchestrator;
