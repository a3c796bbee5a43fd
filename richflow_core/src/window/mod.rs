//! Discretization: grouping values into blocks
//!
//! A discretized flow yields [`Window`]s. Single-source windows hold
//! `Option<T>` elements (`None` marks padding after a source ended);
//! multi-source windows hold [`Row`]s, one slot per interleaved source.

mod boundary;
mod producer;
mod root;
mod windower;

pub use boundary::{Boundary, BoundaryPredicate};

pub(crate) use producer::{RoundRobinProducer, SequentialProducer};
pub(crate) use windower::Windower;

use crate::FlowConfig;
use crate::flow::SourceFlow;
use crate::source::VecSource;
use std::fmt;
use std::ops::Deref;

/// One value from each interleaved source; `None` where a source had ended
pub type Row<T> = Vec<Option<T>>;

/// A completed block
#[derive(Clone)]
pub enum Window<E> {
    /// The block's elements
    Data(Vec<E>),
    /// The block re-exposed as a flow of its own
    Flow(DiscreteFlow<E>),
}

impl<E: Clone + 'static> Window<E> {
    /// Number of elements (rows for multi-source windows)
    pub fn len(&self) -> usize {
        match self {
            Window::Data(items) => items.len(),
            Window::Flow(flow) => flow.element_size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_size(&self) -> usize {
        self.len()
    }

    /// Number of sources interleaved into each element
    pub fn stream_size(&self) -> usize {
        match self {
            Window::Data(_) => 1,
            Window::Flow(flow) => flow.stream_size(),
        }
    }

    pub fn to_vec(&self) -> Vec<E> {
        match self {
            Window::Data(items) => items.clone(),
            Window::Flow(flow) => flow.to_vec(),
        }
    }

    pub fn into_vec(self) -> Vec<E> {
        match self {
            Window::Data(items) => items,
            Window::Flow(flow) => flow.to_vec(),
        }
    }

    /// The block as a flow, building one for data windows
    pub fn into_flow(self) -> SourceFlow<E> {
        match self {
            Window::Data(items) => SourceFlow::new(VecSource::new(items)),
            Window::Flow(flow) => flow.flow,
        }
    }
}

impl<E: fmt::Debug + Clone + 'static> fmt::Debug for Window<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Data(items) => f.debug_tuple("Data").field(items).finish(),
            Window::Flow(flow) => f.debug_tuple("Flow").field(flow).finish(),
        }
    }
}

/// A completed block exposed as a flow
#[derive(Clone)]
pub struct DiscreteFlow<E> {
    flow: SourceFlow<E>,
    len: usize,
    span: usize,
}

impl<E: Clone + 'static> DiscreteFlow<E> {
    pub(crate) fn new(items: Vec<E>, span: usize, config: FlowConfig) -> Self {
        let len = items.len();
        Self {
            flow: SourceFlow::with_config(VecSource::new(items), config),
            len,
            span,
        }
    }

    pub fn element_size(&self) -> usize {
        self.len
    }

    pub fn stream_size(&self) -> usize {
        self.span
    }
}

impl<E> Deref for DiscreteFlow<E> {
    type Target = SourceFlow<E>;

    fn deref(&self) -> &Self::Target {
        &self.flow
    }
}

impl<E: fmt::Debug + Clone + 'static> fmt::Debug for DiscreteFlow<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscreteFlow")
            .field("elements", &self.to_vec())
            .field("span", &self.span)
            .finish()
    }
}
