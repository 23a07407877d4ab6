//! Data-agent integration and report orchestration.
//!
//! This crate owns everything between an HTTP handler asking for a report
//! and the hosted data agent that ultimately answers:
//!
//! 1. **Transport** (`client`) - `DataAgentClient` trait plus the reqwest
//!    implementation against the hosted agent endpoint.
//! 2. **Prompts** (`prompts`) - the question shapes each report sends.
//! 3. **Orchestration** (`reports`) - `ReportService`, the cache-or-fetch
//!    loop that normalizes, aggregates, and caches agent responses.
//!
//! # Degradation principle
//!
//! The agent is an unreliable dependency. Every failure mode, whether
//! transport, status, or malformed rows, resolves to "report unavailable"
//! (`None`), never to a panic or a propagated error.

pub mod client;
pub mod prompts;
pub mod reports;

pub use client::{DataAgentClient, HttpDataAgentClient};
pub use reports::ReportService;
