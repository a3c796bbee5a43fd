//! Test utilities for richflow pipelines
//!
//! This crate provides instrumented sources, recording sinks and builders
//! for testing richflow functionality.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{FlowBuilder, streaming_pair};
pub use mocks::{CountingSource, MutableSource, Recorder};
