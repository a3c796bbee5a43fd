//! Flows: lazy chains of stages over a root
//!
//! A [`Flow`] is a handle on one node of a chain. Every operator call
//! (`map`, `filter`, ...) creates a new node whose upstream is the node it
//! was called on, so any flow can serve as the base of several divergent
//! chains.
//!
//! Evaluation runs in one of two modes:
//! - pull: a terminal operation (or [`Flow::iter`]) requests values from the
//!   last node; each node requests from its upstream until the root reads its
//!   sources. A node records its outputs so that a finite chain can be
//!   replayed without re-reading the root.
//! - push: [`Flow::start_push`] wires the path from the root to this node into
//!   a sink and starts the root, which then delivers each value forward.

use crate::stage::{Downstream, FnSink, Stage, Upstream};
use std::cell::RefCell;
use std::fmt;
use std::ops::ControlFlow;
use std::rc::Rc;

mod ops;
mod replay;
mod root;
mod terminal;

pub use ops::Order;
pub use root::SourceFlow;
pub use terminal::{Iter, Numeric, Summary};

pub(crate) use root::{PushState, RootControl, RootCore, RunGuard};

use replay::ReplayBuffer;

/// One node of a chain as seen from downstream
pub(crate) trait Node<T> {
    /// Next output of the current pass, `None` at its end
    fn request(&mut self) -> Option<T>;

    /// Abandon the current pass along the whole upstream path
    fn rewind(&mut self);

    /// Drop replay recordings along the whole upstream path
    fn invalidate(&mut self);

    fn describe(&self) -> String;
}

pub(crate) type NodeRef<T> = Rc<RefCell<dyn Node<T>>>;

/// Installs a push entry point on the root, wrapped by every stage on the way
pub(crate) type Wire<T> = Rc<dyn Fn(Box<dyn Downstream<T>>)>;

/// A lazily evaluated chain of stages
pub struct Flow<T> {
    pub(crate) node: NodeRef<T>,
    pub(crate) wire: Wire<T>,
    pub(crate) root: Rc<dyn RootControl>,
}

impl<T> Clone for Flow<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
            wire: Rc::clone(&self.wire),
            root: Rc::clone(&self.root),
        }
    }
}

impl<T: Clone + 'static> Flow<T> {
    pub(crate) fn from_parts(node: NodeRef<T>, wire: Wire<T>, root: Rc<dyn RootControl>) -> Self {
        Self { node, wire, root }
    }

    /// Attach a stage, returning the flow of its outputs
    pub fn chain<U, S>(&self, stage: S) -> Flow<U>
    where
        U: Clone + 'static,
        S: Stage<T, U> + 'static,
    {
        let node = Rc::new(RefCell::new(StageNode {
            upstream: Rc::clone(&self.node),
            stage,
            replay: ReplayBuffer::new(),
            root: Rc::clone(&self.root),
        }));

        let upstream_wire = Rc::clone(&self.wire);
        let wired = Rc::clone(&node);
        let wire: Wire<U> = Rc::new(move |downstream: Box<dyn Downstream<U>>| {
            wired.borrow_mut().stage.reset();
            upstream_wire(Box::new(StagePush {
                node: Rc::clone(&wired),
                downstream,
            }));
        });

        Flow {
            node,
            wire,
            root: Rc::clone(&self.root),
        }
    }

    /// Wire the path from the root to this flow into `sink` and start the root
    ///
    /// A finite root delivers all of its values before this returns. A
    /// streaming root subscribes to its streamers and delivers values as they
    /// are sent, until [`stop_push`](Self::stop_push). Starting another path
    /// on the same root replaces this one.
    pub fn start_push<D>(&self, sink: D)
    where
        D: Downstream<T> + 'static,
    {
        (self.wire)(Box::new(sink));
        Rc::clone(&self.root).start();
    }

    /// [`start_push`](Self::start_push) with a closure sink
    pub fn start_push_with<F>(&self, sink: F)
    where
        F: FnMut(T) + 'static,
    {
        self.start_push(FnSink(sink));
    }

    /// Stop the root's push run and unsubscribe from its streamers
    pub fn stop_push(&self) {
        self.root.stop();
    }

    pub fn is_listening(&self) -> bool {
        self.root.is_listening()
    }

    /// Drop every replay recording between this flow and its root
    pub fn invalidate(&self) {
        self.node.borrow_mut().invalidate();
    }

    /// Abandon a partially consumed pass
    pub fn rewind(&self) {
        self.node.borrow_mut().rewind();
    }

    /// Stage names from the root to this flow
    pub fn describe(&self) -> String {
        match self.node.try_borrow() {
            Ok(node) => node.describe(),
            Err(_) => "<busy>".to_string(),
        }
    }
}

impl<T: Clone + 'static> fmt::Debug for Flow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("stages", &self.describe())
            .field("listening", &self.is_listening())
            .finish()
    }
}

/// Pull access to an upstream node
struct Link<'a, T>(&'a NodeRef<T>);

impl<T> Upstream<T> for Link<'_, T> {
    fn request(&mut self) -> Option<T> {
        self.0.borrow_mut().request()
    }

    fn rewind(&mut self) {
        self.0.borrow_mut().rewind()
    }
}

struct StageNode<In, Out, S> {
    upstream: NodeRef<In>,
    stage: S,
    replay: ReplayBuffer<Out>,
    root: Rc<dyn RootControl>,
}

impl<In, Out, S> Node<Out> for StageNode<In, Out, S>
where
    Out: Clone,
    S: Stage<In, Out>,
{
    fn request(&mut self) -> Option<Out> {
        if self.replay.is_complete() {
            return self.replay.next();
        }

        let value = self.stage.pull(&mut Link(&self.upstream));
        if self.root.caching() {
            self.replay.record(value.as_ref());
        } else {
            self.replay.skip(value.is_none());
        }
        value
    }

    fn rewind(&mut self) {
        if self.replay.is_complete() {
            self.replay.rewind();
        } else {
            self.replay.clear();
        }
        self.stage.reset();
        self.upstream.borrow_mut().rewind();
    }

    fn invalidate(&mut self) {
        self.replay.clear();
        self.stage.reset();
        self.upstream.borrow_mut().invalidate();
    }

    fn describe(&self) -> String {
        match self.upstream.try_borrow() {
            Ok(upstream) => format!("{} -> {}", upstream.describe(), self.stage.name()),
            Err(_) => format!("... -> {}", self.stage.name()),
        }
    }
}

/// A stage's place on a wired push path
struct StagePush<In, Out, S> {
    node: Rc<RefCell<StageNode<In, Out, S>>>,
    downstream: Box<dyn Downstream<Out>>,
}

impl<In, Out, S> Downstream<In> for StagePush<In, Out, S>
where
    S: Stage<In, Out>,
{
    fn emit(&mut self, value: In) -> ControlFlow<()> {
        self.node
            .borrow_mut()
            .stage
            .push(value, self.downstream.as_mut())
    }

    fn finish(&mut self) {
        self.node
            .borrow_mut()
            .stage
            .finish(self.downstream.as_mut())
    }
}
