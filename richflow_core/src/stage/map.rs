//! Stateless per-value stages

use super::{Downstream, Stage, Upstream};
use std::ops::ControlFlow;

/// Applies a transform to every value
pub struct MapStage<F> {
    transform: F,
}

impl<F> MapStage<F> {
    pub fn new(transform: F) -> Self {
        Self { transform }
    }
}

impl<In, Out, F> Stage<In, Out> for MapStage<F>
where
    F: FnMut(In) -> Out,
{
    fn name(&self) -> &str {
        "Map"
    }

    fn pull(&mut self, upstream: &mut dyn Upstream<In>) -> Option<Out> {
        upstream.request().map(&mut self.transform)
    }

    fn push(&mut self, input: In, downstream: &mut dyn Downstream<Out>) -> ControlFlow<()> {
        downstream.emit((self.transform)(input))
    }
}

/// Keeps values matching a predicate
pub struct FilterStage<P> {
    predicate: P,
}

impl<P> FilterStage<P> {
    pub fn new(predicate: P) -> Self {
        Self { predicate }
    }
}

impl<T, P> Stage<T, T> for FilterStage<P>
where
    P: FnMut(&T) -> bool,
{
    fn name(&self) -> &str {
        "Filter"
    }

    fn pull(&mut self, upstream: &mut dyn Upstream<T>) -> Option<T> {
        while let Some(value) = upstream.request() {
            if (self.predicate)(&value) {
                return Some(value);
            }
        }
        None
    }

    fn push(&mut self, input: T, downstream: &mut dyn Downstream<T>) -> ControlFlow<()> {
        if (self.predicate)(&input) {
            downstream.emit(input)
        } else {
            ControlFlow::Continue(())
        }
    }
}
