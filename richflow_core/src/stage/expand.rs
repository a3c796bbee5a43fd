//! One-to-many expansion

use super::{Downstream, Stage, Upstream};
use std::ops::ControlFlow;

/// Maps each input to a nested sequence and yields its elements in order
pub struct ExpandStage<F, I: IntoIterator> {
    expand: F,
    current: Option<I::IntoIter>,
}

impl<F, I: IntoIterator> ExpandStage<F, I> {
    pub fn new<T>(expand: F) -> Self
    where
        F: FnMut(T) -> I,
    {
        Self {
            expand,
            current: None,
        }
    }
}

impl<T, F, I> Stage<T, I::Item> for ExpandStage<F, I>
where
    F: FnMut(T) -> I,
    I: IntoIterator,
{
    fn name(&self) -> &str {
        "Expand"
    }

    fn pull(&mut self, upstream: &mut dyn Upstream<T>) -> Option<I::Item> {
        loop {
            if let Some(item) = self.current.as_mut().and_then(Iterator::next) {
                return Some(item);
            }
            self.current = None;

            let value = upstream.request()?;
            self.current = Some((self.expand)(value).into_iter());
        }
    }

    fn push(&mut self, input: T, downstream: &mut dyn Downstream<I::Item>) -> ControlFlow<()> {
        for item in (self.expand)(input) {
            downstream.emit(item)?;
        }
        ControlFlow::Continue(())
    }

    fn reset(&mut self) {
        self.current = None;
    }
}
