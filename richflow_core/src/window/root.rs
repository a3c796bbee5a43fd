//! Windowed roots: discretization applied directly to a root's sources

use super::producer::WindowProducer;
use super::{Boundary, RoundRobinProducer, Row, SequentialProducer, Window, Windower};
use crate::error::ValidationError;
use crate::flow::{
    Flow, Node, NodeRef, PushState, RootControl, RootCore, RunGuard, SourceFlow, Wire,
};
use crate::stage::Downstream;
use crate::{FlowConfig, Result};
use log::debug;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Root of a discretized flow
///
/// Shares the sources of the root it was created from but has its own push
/// state, so a windowed push run and a plain one never share a sink.
pub(crate) struct WindowRoot<T, P: WindowProducer<T>> {
    core: Rc<RootCore<T>>,
    producer: RefCell<P>,
    push: PushState<Window<P::Element>>,
    /// A reconciliation pass is waiting on the queue
    pass_pending: Cell<bool>,
    first_pass_done: Cell<bool>,
}

impl<T, P> WindowRoot<T, P>
where
    T: Clone + 'static,
    P: WindowProducer<T> + 'static,
{
    pub(crate) fn new(core: Rc<RootCore<T>>, producer: P) -> Rc<Self> {
        Rc::new(Self {
            core,
            producer: RefCell::new(producer),
            push: PushState::new(),
            pass_pending: Cell::new(false),
            first_pass_done: Cell::new(false),
        })
    }

    fn next_window(&self) -> Option<Window<P::Element>> {
        let mut sources = self.core.sources.borrow_mut();
        self.producer.borrow_mut().next_window(&mut sources)
    }

    fn rewind(&self) {
        self.producer.borrow_mut().reset();
        self.core.sources.borrow_mut().rewind();
    }

    fn run_finite(&self) {
        let _run = RunGuard(|| {
            self.push.stop();
            if let Ok(mut producer) = self.producer.try_borrow_mut() {
                producer.reset();
            }
            if let Ok(mut sources) = self.core.sources.try_borrow_mut() {
                sources.rewind();
            }
        });

        let mut delivered = 0usize;
        loop {
            if !self.push.is_listening() {
                break;
            }

            let Some(window) = self.next_window() else {
                break;
            };

            delivered += 1;
            if self.push.deliver(window).is_break() {
                break;
            }
        }

        if self.push.is_listening() {
            self.push.finish();
        }
        debug!("Windowed push run delivered {delivered} window(s)");
    }

    fn listen(root: &Rc<Self>) {
        let span = root.producer.borrow().span();
        let streamers = root.core.sources.borrow().streamers();
        debug!(
            "Windowed push run subscribing to {} of {} streamer(s)",
            span.min(streamers.len()),
            streamers.len()
        );

        for (index, streamer) in streamers.into_iter().take(span).enumerate() {
            let weak = Rc::downgrade(root);
            let id = streamer.subscribe(move |value: &T| {
                if let Some(root) = weak.upgrade() {
                    Self::on_arrival(&root, index, value.clone());
                }
            });
            root.push.add_subscription(move || {
                streamer.unsubscribe(id);
            });
        }
    }

    fn on_arrival(root: &Rc<Self>, index: usize, value: T) {
        if !root.push.is_listening() {
            return;
        }

        let window = root.producer.borrow_mut().arrive(index, value);
        if let Some(window) = window {
            let _ = root.push.deliver(window);
        }

        if !root.producer.borrow().is_synchronous() {
            Self::schedule(root);
        }
    }

    /// Queue a reconciliation pass unless one is already waiting
    fn schedule(root: &Rc<Self>) {
        if root.pass_pending.replace(true) {
            return;
        }

        let config = root.core.config();
        let delay = if root.first_pass_done.get() {
            config.reconcile_delay()
        } else {
            config.first_reconcile_delay()
        };

        let weak = Rc::downgrade(root);
        root.core.queue.borrow().defer(delay, move || {
            if let Some(root) = weak.upgrade() {
                root.reconcile();
            }
        });
    }

    fn reconcile(&self) {
        self.pass_pending.set(false);
        self.first_pass_done.set(true);
        if !self.push.is_listening() {
            return;
        }

        let windows = self.producer.borrow_mut().reconcile();
        for window in windows {
            if self.push.deliver(window).is_break() {
                break;
            }
        }
    }
}

impl<T, P> RootControl for WindowRoot<T, P>
where
    T: Clone + 'static,
    P: WindowProducer<T> + 'static,
{
    fn config(&self) -> FlowConfig {
        self.core.config()
    }

    fn caching(&self) -> bool {
        self.core.caching()
    }

    fn start(self: Rc<Self>) {
        self.producer.borrow_mut().reset();
        self.pass_pending.set(false);
        self.first_pass_done.set(false);
        self.push.begin();

        if self.core.streaming.get() {
            Self::listen(&self);
        } else {
            self.run_finite();
        }
    }

    fn stop(&self) {
        if self.push.is_listening() {
            debug!("Stopping windowed push run");
        }
        self.push.stop();
        self.producer.borrow_mut().reset();
    }

    fn is_listening(&self) -> bool {
        self.push.is_listening()
    }
}

struct WindowNode<T, P: WindowProducer<T>> {
    root: Rc<WindowRoot<T, P>>,
}

impl<T, P> Node<Window<P::Element>> for WindowNode<T, P>
where
    T: Clone + 'static,
    P: WindowProducer<T> + 'static,
{
    fn request(&mut self) -> Option<Window<P::Element>> {
        self.root.next_window()
    }

    fn rewind(&mut self) {
        self.root.rewind();
    }

    fn invalidate(&mut self) {
        self.root.rewind();
    }

    fn describe(&self) -> String {
        format!(
            "Source[{}] -> Discretize[{}]",
            self.root.core.sources.borrow().len(),
            self.root.producer.borrow().span()
        )
    }
}

fn windowed<T, P>(core: &Rc<RootCore<T>>, producer: P) -> Flow<Window<P::Element>>
where
    T: Clone + 'static,
    P: WindowProducer<T> + 'static,
{
    let root = WindowRoot::new(Rc::clone(core), producer);
    let node: NodeRef<Window<P::Element>> = Rc::new(RefCell::new(WindowNode {
        root: Rc::clone(&root),
    }));
    let wired = Rc::clone(&root);
    let wire: Wire<Window<P::Element>> =
        Rc::new(move |entry: Box<dyn Downstream<Window<P::Element>>>| wired.push.install(entry));
    Flow::from_parts(node, wire, root)
}

impl<T: Clone + 'static> SourceFlow<T> {
    /// Group each source's values into blocks
    ///
    /// Blocks never straddle two merged sources: when a source ends, its
    /// partial block is padded with `None` until `boundary` fires.
    pub fn discretize(
        &self,
        boundary: Boundary<Option<T>>,
        spawn_flows: bool,
    ) -> Result<Flow<Window<Option<T>>>> {
        let windower = Windower::new(boundary, spawn_flows, 1, self.core.config())?;
        debug!(
            "Discretizing {} source(s) into per-source blocks",
            self.source_count()
        );
        Ok(windowed(
            &self.core,
            SequentialProducer::new(windower, |value| value),
        ))
    }

    /// Interleave the first `span` sources into rows and group the rows into blocks
    ///
    /// Each row holds one value per source, `None` once a source has ended;
    /// a pass ends when every source has. `span` is clamped to the number of
    /// merged sources. In push mode rows are reconciled on the root's
    /// [`TaskQueue`](crate::scheduler::TaskQueue): arrivals are queued per
    /// source and a row is formed once every source has contributed a value.
    pub fn discretize_span(
        &self,
        span: usize,
        boundary: Boundary<Row<T>>,
        spawn_flows: bool,
    ) -> Result<Flow<Window<Row<T>>>> {
        if span == 0 {
            return Err(ValidationError::non_positive("span", span).into());
        }

        let span = span.min(self.source_count()).max(1);
        let config = self.core.config();
        let windower = Windower::new(boundary, spawn_flows, span, config)?;
        debug!(
            "Discretizing {} source(s) with span {span}",
            self.source_count()
        );

        if span == 1 {
            return Ok(windowed(
                &self.core,
                SequentialProducer::new(windower, |value| vec![value]),
            ));
        }
        Ok(windowed(&self.core, RoundRobinProducer::new(windower, span)))
    }
}
