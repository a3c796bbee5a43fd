//! Richflow Core Library
//!
//! Lazy sequence pipelines over one or more merged sources. A pipeline is
//! built by chaining operators on a root and is evaluated either by pulling
//! (terminal operations) or by pushing values from the root into a sink.
//! Finite pipelines record their outputs so they can be replayed without
//! re-reading their sources; streaming pipelines are driven by
//! [`Streamer`]s.

pub mod config;
pub mod error;
pub mod flow;
pub mod scheduler;
pub mod source;
pub mod stage;
pub mod streamer;
pub mod window;

// Re-export main types
pub use config::FlowConfig;
pub use error::{Error, Result};
pub use flow::{Flow, Iter, Numeric, Order, SourceFlow, Summary};
pub use scheduler::{Clock, ManualClock, SystemClock, TaskQueue};
pub use source::{IterSource, LineSource, OnceSource, Pair, Source, VecSource};
pub use stage::{Downstream, FnSink, Partition, Stage, Upstream};
pub use streamer::{
    Listener, ListenerId, OutFlow, RecordingStore, StreamStore, Streamer, StreamerSource,
};
pub use window::{Boundary, BoundaryPredicate, DiscreteFlow, Row, Window};
