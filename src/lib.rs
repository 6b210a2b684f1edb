//! MCP gateway that lets a calling agent ask the Gemini CLI for a second opinion.
//!
//! The interesting part lives in [`core::orchestrator`]: rate limiting, prompt
//! composition, bounded process invocation, failure classification and the
//! consultation log. Everything under [`tools`] and [`infra`] is transport and
//! boot plumbing around it.

pub mod cli;
pub mod clients;
pub mod core;
pub mod domain;
pub mod infra;
pub mod tools;
