//! Durable storage for the caseview backend: the file-backed TTL response
//! cache for agent results, and the read-only local JSON case store.

pub mod cache;
pub mod cases;

pub use cache::{CacheError, CacheRecord, ResponseCache};
pub use cases::{extract_state_code, CaseProperty, CaseStore};
