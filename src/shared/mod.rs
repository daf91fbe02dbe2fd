//! Shared utilities used across multiple subsystems
//!
//! The relay, the enrichment fan-out and the edge proxy all call dependent
//! services with per-operation time budgets; the common plumbing lives here.

pub mod http;
