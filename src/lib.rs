//! pmguard: a shadow-state crash-consistency checker for persistent-memory
//! programs.
//!
//! The engine replays an externally captured, globally ordered trace of PM
//! operations (writes, cache-line flushes, fences, transactional adds, reads)
//! and detects bugs that only surface if the process crashes at that point
//! and PM state is later recovered.
//!
//! # Determinism Guarantees
//! - No wall-clock time: ordering comes from an explicit logical clock
//! - No randomness, no background work
//! - Same trace => same shadow state => same [`digest::state_digest`]

pub mod config;
pub mod digest;
pub mod engine;
pub mod error;
pub mod interval;
pub mod report;
pub mod state;
pub mod trace;

pub use engine::ShadowEngine;
pub use error::{EngineError, Result};

#[cfg(test)]
pub mod tests;
