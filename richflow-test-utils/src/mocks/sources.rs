//! Instrumented sources

use richflow_core::Source;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Source over a fixed list that counts how often it is read
///
/// Clones share the counters, so a test can keep a handle after moving the
/// source into a flow.
#[derive(Clone)]
pub struct CountingSource<T> {
    items: Rc<Vec<T>>,
    pos: usize,
    reads: Rc<Cell<usize>>,
    passes: Rc<Cell<usize>>,
}

impl<T: Clone> CountingSource<T> {
    /// Create a new counting source
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Rc::new(items),
            pos: 0,
            reads: Rc::new(Cell::new(0)),
            passes: Rc::new(Cell::new(0)),
        }
    }

    /// Number of values read so far, across all clones
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    /// Number of passes read to the end
    pub fn passes(&self) -> usize {
        self.passes.get()
    }
}

impl<T: Clone> Source<T> for CountingSource<T> {
    fn next(&mut self) -> Option<T> {
        match self.items.get(self.pos) {
            Some(item) => {
                self.pos += 1;
                self.reads.set(self.reads.get() + 1);
                Some(item.clone())
            }
            None => {
                self.pos = 0;
                self.passes.set(self.passes.get() + 1);
                None
            }
        }
    }

    fn reset(&mut self) {
        self.pos = 0;
    }
}

/// Source whose contents can be changed between passes
#[derive(Clone)]
pub struct MutableSource<T> {
    items: Rc<RefCell<Vec<T>>>,
    pos: usize,
}

impl<T: Clone> MutableSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
            pos: 0,
        }
    }

    /// Replace the contents seen by the next pass
    pub fn set(&self, items: Vec<T>) {
        *self.items.borrow_mut() = items;
    }

    pub fn append(&self, item: T) {
        self.items.borrow_mut().push(item);
    }
}

impl<T: Clone> Source<T> for MutableSource<T> {
    fn next(&mut self) -> Option<T> {
        let next = self.items.borrow().get(self.pos).cloned();
        match next {
            Some(item) => {
                self.pos += 1;
                Some(item)
            }
            None => {
                self.pos = 0;
                None
            }
        }
    }

    fn reset(&mut self) {
        self.pos = 0;
    }
}
