//! Recording push sink

use richflow_core::Downstream;
use std::cell::{Cell, RefCell};
use std::ops::ControlFlow;
use std::rc::Rc;

/// Push sink that records every value it receives
///
/// Clones share the recording. A recorder built with [`Recorder::stop_after`]
/// breaks the run once it holds that many values.
pub struct Recorder<T> {
    values: Rc<RefCell<Vec<T>>>,
    finished: Rc<Cell<usize>>,
    stop_after: Option<usize>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            values: Rc::clone(&self.values),
            finished: Rc::clone(&self.finished),
            stop_after: self.stop_after,
        }
    }
}

impl<T: Clone> Recorder<T> {
    /// Create a new recorder
    pub fn new() -> Self {
        Self {
            values: Rc::new(RefCell::new(Vec::new())),
            finished: Rc::new(Cell::new(0)),
            stop_after: None,
        }
    }

    pub fn stop_after(count: usize) -> Self {
        Self {
            stop_after: Some(count),
            ..Self::new()
        }
    }

    /// Values received so far
    pub fn values(&self) -> Vec<T> {
        self.values.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    /// Whether the end of a finite run was signalled
    pub fn is_finished(&self) -> bool {
        self.finished.get() > 0
    }

    /// Number of end signals received
    pub fn finish_count(&self) -> usize {
        self.finished.get()
    }

    pub fn clear(&self) {
        self.values.borrow_mut().clear();
        self.finished.set(0);
    }
}

impl<T: Clone> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Downstream<T> for Recorder<T> {
    fn emit(&mut self, value: T) -> ControlFlow<()> {
        let mut values = self.values.borrow_mut();
        values.push(value);
        match self.stop_after {
            Some(limit) if values.len() >= limit => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    }

    fn finish(&mut self) {
        self.finished.set(self.finished.get() + 1);
    }
}
