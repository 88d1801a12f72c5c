//! Storage-independent rules of the enrichment pipeline.
//!
//! Everything here is pure: callers pass `now` explicitly so the same rules drive the SQL layer,
//! the worker, and the tests.

pub mod analysis;
pub mod debounce;
pub mod enrichment;
pub mod quote;
pub mod retry;
