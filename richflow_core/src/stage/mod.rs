//! Pipeline stage protocol
//!
//! Every stage serves both evaluation modes through two hooks. In pull mode
//! the consumer asks the stage for its next output and the stage requests as
//! many inputs from its [`Upstream`] as it needs. In push mode the root hands
//! each value to the stage, which emits zero or more outputs to its wired
//! [`Downstream`].
//!
//! Custom stages implement [`Stage`] and are attached with
//! [`Flow::chain`](crate::Flow::chain).

use std::ops::ControlFlow;

mod discretizer;
mod expand;
mod latch;
mod map;
mod order;
mod range;

pub use discretizer::DiscretizerStage;
pub use expand::ExpandStage;
pub use latch::{LatchMode, LatchStage};
pub use map::{FilterStage, MapStage};
pub use order::{OrderByStage, Partition, PartitionStage};
pub use range::RangeStage;

/// Input side of a pull traversal
pub trait Upstream<T> {
    /// Next input, `None` once upstream has ended its pass
    fn request(&mut self) -> Option<T>;

    /// Abandon the upstream pass; the next request starts from the beginning
    fn rewind(&mut self);
}

/// Output side of a push traversal
pub trait Downstream<T> {
    /// Deliver one value. `Break` asks a finite push run to stop.
    fn emit(&mut self, value: T) -> ControlFlow<()>;

    /// The push run is over
    fn finish(&mut self) {}
}

/// A single processing step in a flow
pub trait Stage<In, Out> {
    /// Name of this stage for debugging
    fn name(&self) -> &str;

    /// Produce the next output, requesting inputs from `upstream` as needed
    fn pull(&mut self, upstream: &mut dyn Upstream<In>) -> Option<Out>;

    /// Handle one pushed input
    fn push(&mut self, input: In, downstream: &mut dyn Downstream<Out>) -> ControlFlow<()>;

    /// Called once when a finite push run ends
    fn finish(&mut self, downstream: &mut dyn Downstream<Out>) {
        self.reset();
        downstream.finish();
    }

    /// Drop any per-pass state
    fn reset(&mut self) {}
}

/// Push sink backed by a closure
pub struct FnSink<F>(pub F);

impl<T, F> Downstream<T> for FnSink<F>
where
    F: FnMut(T),
{
    fn emit(&mut self, value: T) -> ControlFlow<()> {
        (self.0)(value);
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Drive stages directly without building a flow

    use super::*;
    use std::collections::VecDeque;

    pub(crate) struct Feed<T> {
        items: Vec<T>,
        pending: VecDeque<T>,
        pub(crate) requests: usize,
        pub(crate) rewinds: usize,
    }

    impl<T: Clone> Feed<T> {
        pub(crate) fn new(items: Vec<T>) -> Self {
            let pending = items.iter().cloned().collect();
            Self {
                items,
                pending,
                requests: 0,
                rewinds: 0,
            }
        }
    }

    impl<T: Clone> Upstream<T> for Feed<T> {
        fn request(&mut self) -> Option<T> {
            self.requests += 1;
            let next = self.pending.pop_front();
            if next.is_none() {
                self.pending = self.items.iter().cloned().collect();
            }
            next
        }

        fn rewind(&mut self) {
            self.rewinds += 1;
            self.pending = self.items.iter().cloned().collect();
        }
    }

    pub(crate) struct Collect<T> {
        pub(crate) values: Vec<T>,
        pub(crate) finished: bool,
    }

    impl<T> Downstream<T> for Collect<T> {
        fn emit(&mut self, value: T) -> ControlFlow<()> {
            self.values.push(value);
            ControlFlow::Continue(())
        }

        fn finish(&mut self) {
            self.finished = true;
        }
    }

    /// Pull a stage until it ends
    pub(crate) fn pull_all<In, Out, S>(stage: &mut S, feed: &mut Feed<In>) -> Vec<Out>
    where
        S: Stage<In, Out>,
        In: Clone,
    {
        let mut out = Vec::new();
        while let Some(value) = stage.pull(feed) {
            out.push(value);
        }
        out
    }

    /// Push inputs through a stage as a finite run would
    pub(crate) fn push_all<In, Out, S>(stage: &mut S, inputs: Vec<In>) -> Collect<Out>
    where
        S: Stage<In, Out>,
    {
        let mut sink = Collect {
            values: Vec::new(),
            finished: false,
        };
        for input in inputs {
            if stage.push(input, &mut sink).is_break() {
                break;
            }
        }
        stage.finish(&mut sink);
        sink
    }
}
