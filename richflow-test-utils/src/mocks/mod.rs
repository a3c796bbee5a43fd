//! Mock sources and sinks for testing

mod recorder;
mod sources;

pub use recorder::Recorder;
pub use sources::{CountingSource, MutableSource};
