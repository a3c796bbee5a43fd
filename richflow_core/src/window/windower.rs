//! Block accumulation shared by every window producer

use super::{Boundary, DiscreteFlow, Window};
use crate::{FlowConfig, Result};
use log::{trace, warn};
use std::mem;

pub(crate) struct Windower<E> {
    boundary: Boundary<E>,
    spawn: bool,
    span: usize,
    items: Vec<E>,
    config: FlowConfig,
}

impl<E: Clone + 'static> Windower<E> {
    pub(crate) fn new(
        boundary: Boundary<E>,
        spawn: bool,
        span: usize,
        config: FlowConfig,
    ) -> Result<Self> {
        boundary.validate()?;
        Ok(Self {
            boundary,
            spawn,
            span,
            items: Vec::new(),
            config,
        })
    }

    /// Append an element; returns the block if the boundary fired on it
    pub(crate) fn offer(&mut self, element: E) -> Option<Window<E>> {
        self.items.push(element);
        let len = self.items.len();
        if self.boundary.fires(&self.items[len - 1], len) {
            Some(self.emit())
        } else {
            None
        }
    }

    /// Close a partial block by appending fillers until the boundary fires
    pub(crate) fn pad<F>(&mut self, filler: F) -> Option<Window<E>>
    where
        F: Fn() -> E,
    {
        if self.items.is_empty() {
            return None;
        }

        for _ in 0..self.config.max_padding {
            if let Some(window) = self.offer(filler()) {
                return Some(window);
            }
        }

        warn!(
            "Window boundary did not fire within {} padding element(s); emitting a block of {}",
            self.config.max_padding,
            self.items.len()
        );
        Some(self.emit())
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.boundary.reset();
    }

    fn emit(&mut self) -> Window<E> {
        let items = mem::take(&mut self.items);
        self.boundary.reset();
        trace!("Emitting window of {} element(s)", items.len());

        if self.spawn {
            Window::Flow(DiscreteFlow::new(items, self.span, self.config.clone()))
        } else {
            Window::Data(items)
        }
    }
}
