//! Fan-out/merge across every configured endpoint.
//!
//! Requests go out concurrently, one per endpoint, through the `Gateway`.
//! Any endpoint failing aborts the whole call: a fleet total that silently
//! drops a server is never produced.

pub mod engine;
pub mod merge;

pub use engine::Aggregator;
pub use merge::{merge_history, merge_summaries};
