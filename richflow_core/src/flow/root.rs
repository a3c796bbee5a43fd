//! Source roots and the push lifecycle shared by every root kind

use super::{Flow, Node, NodeRef, Wire};
use crate::error::ValidationError;
use crate::scheduler::TaskQueue;
use crate::source::{IterSource, LineSource, OnceSource, Pair, Source, SourceSet, VecSource};
use crate::stage::Downstream;
use crate::streamer::{Streamer, StreamerSource};
use crate::{FlowConfig, Result};
use log::debug;
use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::ops::{ControlFlow, Deref};
use std::path::Path;
use std::rc::Rc;

/// Lifecycle hooks of a chain's root
pub(crate) trait RootControl {
    fn config(&self) -> FlowConfig;

    /// Whether stages on this root record replays
    fn caching(&self) -> bool;

    fn start(self: Rc<Self>);

    fn stop(&self);

    fn is_listening(&self) -> bool;
}

/// Push entry point, listening flag and streamer subscriptions of a root
pub(crate) struct PushState<X> {
    listening: Cell<bool>,
    entry: RefCell<Option<Box<dyn Downstream<X>>>>,
    /// Bumped whenever the entry is replaced or detached
    generation: Cell<u64>,
    pending: RefCell<VecDeque<X>>,
    delivering: Cell<bool>,
    subscriptions: RefCell<Vec<Box<dyn FnOnce()>>>,
}

struct DeliveryGuard<'a>(&'a Cell<bool>);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Runs its closure when a push run exits, normally or by unwinding
pub(crate) struct RunGuard<F: FnMut()>(pub(crate) F);

impl<F: FnMut()> Drop for RunGuard<F> {
    fn drop(&mut self) {
        (self.0)();
    }
}

impl<X> PushState<X> {
    pub(crate) fn new() -> Self {
        Self {
            listening: Cell::new(false),
            entry: RefCell::new(None),
            generation: Cell::new(0),
            pending: RefCell::new(VecDeque::new()),
            delivering: Cell::new(false),
            subscriptions: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn is_listening(&self) -> bool {
        self.listening.get()
    }

    pub(crate) fn install(&self, entry: Box<dyn Downstream<X>>) {
        self.generation.set(self.generation.get() + 1);
        *self.entry.borrow_mut() = Some(entry);
    }

    /// Start listening, dropping subscriptions left over from an earlier run
    pub(crate) fn begin(&self) {
        self.unsubscribe_all();
        self.pending.borrow_mut().clear();
        self.listening.set(true);
    }

    pub(crate) fn add_subscription<F>(&self, unsubscribe: F)
    where
        F: FnOnce() + 'static,
    {
        self.subscriptions.borrow_mut().push(Box::new(unsubscribe));
    }

    fn unsubscribe_all(&self) {
        let subscriptions: Vec<_> = self.subscriptions.borrow_mut().drain(..).collect();
        for unsubscribe in subscriptions {
            unsubscribe();
        }
    }

    /// Deliver a value to the wired path
    ///
    /// Values delivered while another delivery is in progress are queued and
    /// drained in order by the outer call.
    pub(crate) fn deliver(&self, value: X) -> ControlFlow<()> {
        if self.delivering.get() {
            self.pending.borrow_mut().push_back(value);
            return ControlFlow::Continue(());
        }

        self.delivering.set(true);
        let _guard = DeliveryGuard(&self.delivering);

        let mut flow = self.deliver_one(value);
        while flow.is_continue() {
            let next = self.pending.borrow_mut().pop_front();
            let Some(next) = next else {
                break;
            };
            flow = self.deliver_one(next);
        }

        if flow.is_break() {
            self.pending.borrow_mut().clear();
        }
        flow
    }

    fn deliver_one(&self, value: X) -> ControlFlow<()> {
        if !self.listening.get() {
            return ControlFlow::Break(());
        }

        // The entry is taken out for the call so the sink may stop or re-wire
        // this root without a double borrow
        let generation = self.generation.get();
        let taken = self.entry.borrow_mut().take();
        let Some(mut entry) = taken else {
            return ControlFlow::Continue(());
        };

        let flow = entry.emit(value);
        if self.generation.get() == generation {
            *self.entry.borrow_mut() = Some(entry);
        }
        flow
    }

    /// Signal the end of a finite run down the wired path
    pub(crate) fn finish(&self) {
        let generation = self.generation.get();
        let taken = self.entry.borrow_mut().take();
        if let Some(mut entry) = taken {
            entry.finish();
            if self.generation.get() == generation {
                *self.entry.borrow_mut() = Some(entry);
            }
        }
    }

    /// Stop listening and release the wired path
    pub(crate) fn stop(&self) {
        self.listening.set(false);
        self.unsubscribe_all();
        self.pending.borrow_mut().clear();
        self.generation.set(self.generation.get() + 1);
        self.entry.borrow_mut().take();
    }
}

/// Shared state of a source root
pub(crate) struct RootCore<T> {
    pub(crate) sources: RefCell<SourceSet<T>>,
    pub(crate) config: RefCell<FlowConfig>,
    pub(crate) streaming: Cell<bool>,
    pub(crate) queue: RefCell<TaskQueue>,
    push: PushState<T>,
}

impl<T: Clone + 'static> RootCore<T> {
    fn run_finite(&self) {
        debug!(
            "Starting finite push run over {} source(s)",
            self.sources.borrow().len()
        );

        // A panicking sink still leaves the root stopped and rewound
        let _run = RunGuard(|| {
            self.push.stop();
            if let Ok(mut sources) = self.sources.try_borrow_mut() {
                sources.rewind();
            }
        });

        let mut delivered = 0usize;
        loop {
            if !self.push.is_listening() {
                break;
            }

            let next = self.sources.borrow_mut().next();
            let Some(value) = next else {
                break;
            };

            delivered += 1;
            if self.push.deliver(value).is_break() {
                break;
            }
        }

        if self.push.is_listening() {
            self.push.finish();
        }
        debug!("Finite push run delivered {delivered} value(s)");
    }

    fn listen(core: &Rc<Self>) {
        let streamers = core.sources.borrow().streamers();
        debug!("Push run subscribing to {} streamer(s)", streamers.len());

        for streamer in streamers {
            let weak = Rc::downgrade(core);
            let id = streamer.subscribe(move |value: &T| {
                if let Some(core) = weak.upgrade() {
                    let _ = core.push.deliver(value.clone());
                }
            });
            core.push.add_subscription(move || {
                streamer.unsubscribe(id);
            });
        }
    }
}

impl<T: Clone + 'static> RootControl for RootCore<T> {
    fn config(&self) -> FlowConfig {
        self.config.borrow().clone()
    }

    fn caching(&self) -> bool {
        self.config.borrow().cache && !self.streaming.get()
    }

    fn start(self: Rc<Self>) {
        self.push.begin();
        if self.streaming.get() {
            Self::listen(&self);
        } else {
            self.run_finite();
        }
    }

    fn stop(&self) {
        if self.push.is_listening() {
            debug!("Stopping push run");
        }
        self.push.stop();
    }

    fn is_listening(&self) -> bool {
        self.push.is_listening()
    }
}

struct SourceNode<T> {
    core: Rc<RootCore<T>>,
}

impl<T> Node<T> for SourceNode<T> {
    fn request(&mut self) -> Option<T> {
        self.core.sources.borrow_mut().next()
    }

    fn rewind(&mut self) {
        self.core.sources.borrow_mut().rewind();
    }

    fn invalidate(&mut self) {
        self.rewind();
    }

    fn describe(&self) -> String {
        format!("Source[{}]", self.core.sources.borrow().len())
    }
}

/// Root of a chain: one or more merged sources
///
/// Dereferences to [`Flow`], so every operator and terminal is available
/// directly on the root.
pub struct SourceFlow<T> {
    flow: Flow<T>,
    pub(crate) core: Rc<RootCore<T>>,
}

impl<T> Clone for SourceFlow<T> {
    fn clone(&self) -> Self {
        Self {
            flow: self.flow.clone(),
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: Clone + 'static> SourceFlow<T> {
    pub fn new<S>(source: S) -> Self
    where
        S: Source<T> + 'static,
    {
        Self::with_config(source, FlowConfig::default())
    }

    pub fn with_config<S>(source: S, config: FlowConfig) -> Self
    where
        S: Source<T> + 'static,
    {
        let streaming = source.streamer().is_some();
        let mut sources = SourceSet::new();
        sources.push(Box::new(source));

        let core = Rc::new(RootCore {
            sources: RefCell::new(sources),
            config: RefCell::new(config),
            streaming: Cell::new(streaming),
            queue: RefCell::new(TaskQueue::current()),
            push: PushState::new(),
        });

        let node: NodeRef<T> = Rc::new(RefCell::new(SourceNode {
            core: Rc::clone(&core),
        }));
        let wired = Rc::clone(&core);
        let wire: Wire<T> = Rc::new(move |entry: Box<dyn Downstream<T>>| wired.push.install(entry));
        let root: Rc<dyn RootControl> = core.clone();

        Self {
            flow: Flow::from_parts(node, wire, root),
            core,
        }
    }

    /// Append a source; values of merged sources follow in merge order
    pub fn merge<S>(&self, source: S) -> Result<&Self>
    where
        S: Source<T> + 'static,
    {
        let streaming = source.streamer().is_some();
        let mut sources = self.core.sources.borrow_mut();
        if sources.len() > 0 && streaming != self.core.streaming.get() {
            return Err(ValidationError::streaming_mismatch().into());
        }

        sources.push(Box::new(source));
        self.core.streaming.set(streaming);
        debug!("Merged source #{} into root", sources.len());
        Ok(self)
    }

    pub fn source_count(&self) -> usize {
        self.core.sources.borrow().len()
    }

    /// Whether this root is driven by streamers
    pub fn is_stream(&self) -> bool {
        self.core.streaming.get()
    }

    pub fn config(&self) -> FlowConfig {
        self.core.config.borrow().clone()
    }

    /// Switch replay recording on or off for every chain on this root
    pub fn set_caching(&self, enabled: bool) {
        self.core.config.borrow_mut().cache = enabled;
    }

    /// Run deferred work (multi-source push reconciliation) on `queue`
    pub fn with_scheduler(self, queue: TaskQueue) -> Self {
        *self.core.queue.borrow_mut() = queue;
        self
    }

    pub fn scheduler(&self) -> TaskQueue {
        self.core.queue.borrow().clone()
    }

    pub fn as_flow(&self) -> &Flow<T> {
        &self.flow
    }

    pub fn into_flow(self) -> Flow<T> {
        self.flow
    }
}

impl<T> Deref for SourceFlow<T> {
    type Target = Flow<T>;

    fn deref(&self) -> &Self::Target {
        &self.flow
    }
}

impl<T: Clone + 'static> fmt::Debug for SourceFlow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFlow")
            .field("sources", &self.source_count())
            .field("streaming", &self.is_stream())
            .field("listening", &self.is_listening())
            .finish()
    }
}

impl<T: Clone + 'static> FromIterator<T> for SourceFlow<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(VecSource::new(iter.into_iter().collect()))
    }
}

impl<T: Clone + 'static> Flow<T> {
    pub fn from_source<S>(source: S) -> SourceFlow<T>
    where
        S: Source<T> + 'static,
    {
        SourceFlow::new(source)
    }

    pub fn from_vec(items: Vec<T>) -> SourceFlow<T> {
        SourceFlow::new(VecSource::new(items))
    }

    pub fn of(items: &[T]) -> SourceFlow<T> {
        Self::from_vec(items.to_vec())
    }

    pub fn once(value: T) -> SourceFlow<T> {
        SourceFlow::new(OnceSource::new(value))
    }

    /// Flow over a generator; `factory` is called at the start of every pass
    pub fn from_fn<F, I>(factory: F) -> SourceFlow<T>
    where
        F: FnMut() -> I + 'static,
        I: Iterator<Item = T> + 'static,
    {
        SourceFlow::new(IterSource::new(factory))
    }

    pub fn from_set(set: HashSet<T>) -> SourceFlow<T>
    where
        T: Eq + Hash,
    {
        Self::from_vec(set.into_iter().collect())
    }

    /// Streaming root driven by `streamer`
    pub fn from_streamer(streamer: &Streamer<T>) -> SourceFlow<T> {
        SourceFlow::new(StreamerSource::new(streamer.clone()))
    }
}

impl<K, V> Flow<Pair<K, V>>
where
    K: Clone + 'static,
    V: Clone + 'static,
{
    /// Flow over map entries in the map's iteration order
    pub fn from_map<M>(map: M) -> SourceFlow<Pair<K, V>>
    where
        M: IntoIterator<Item = (K, V)>,
    {
        Self::from_vec(map.into_iter().map(Pair::from).collect())
    }
}

impl Flow<i64> {
    /// Integers from `start` to `end`, inclusive
    pub fn from_range(start: i64, end: i64) -> SourceFlow<i64> {
        SourceFlow::new(IterSource::new(move || start..=end))
    }
}

impl Flow<String> {
    /// Lines of a text file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SourceFlow<String>> {
        Ok(SourceFlow::new(LineSource::open(path.as_ref())?))
    }
}
