//! Publish/subscribe channels
//!
//! A [`Streamer`] connects flows to the outside world in both directions:
//! an [`OutFlow`] pushes a chain's results into a streamer's receiver, and a
//! streaming root ([`Flow::from_streamer`](crate::Flow::from_streamer))
//! subscribes to a streamer and is driven by every value sent through it.

use crate::flow::Flow;
use crate::source::Source;
use log::{debug, warn};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Receives values sent through a [`Streamer`]
pub trait Listener<T> {
    fn notify(&self, value: &T);
}

impl<T, F> Listener<T> for F
where
    F: Fn(&T),
{
    fn notify(&self, value: &T) {
        self(value)
    }
}

/// Handle returned by [`Streamer::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Backing storage giving a streamer pull access
///
/// `get` returning `None` for an index below `size` is a gap; pull readers
/// skip it.
pub trait StreamStore<T> {
    fn size(&self) -> usize;

    fn get(&self, index: usize) -> Option<T>;

    /// Called for every value sent through the streamer
    fn record(&mut self, value: &T) {
        let _ = value;
    }
}

/// Store that keeps every value sent through its streamer
#[derive(Debug, Clone, Default)]
pub struct RecordingStore<T> {
    values: Vec<T>,
}

impl<T> RecordingStore<T> {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Store pre-seeded with values
    pub fn with_values(values: Vec<T>) -> Self {
        Self { values }
    }
}

impl<T: Clone> StreamStore<T> for RecordingStore<T> {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn get(&self, index: usize) -> Option<T> {
        self.values.get(index).cloned()
    }

    fn record(&mut self, value: &T) {
        self.values.push(value.clone());
    }
}

type Receiver<T> = Box<dyn FnMut(T, &str)>;

struct StreamerInner<T> {
    key: String,
    listeners: RefCell<Vec<(ListenerId, Rc<dyn Listener<T>>)>>,
    next_id: Cell<u64>,
    receiver: RefCell<Option<Receiver<T>>>,
    /// Values pushed from inside the receiver, handed over once it returns
    pending: RefCell<VecDeque<(T, String)>>,
    receiving: Cell<bool>,
    store: RefCell<Option<Box<dyn StreamStore<T>>>>,
    relay: Cell<bool>,
}

/// Puts a taken receiver back when its call returns or unwinds
struct ReceiverSlot<'a, T> {
    inner: &'a StreamerInner<T>,
    receiver: Option<Receiver<T>>,
}

impl<T> Drop for ReceiverSlot<'_, T> {
    fn drop(&mut self) {
        self.inner.receiving.set(false);
        if let Ok(mut pending) = self.inner.pending.try_borrow_mut() {
            pending.clear();
        }
        if let Ok(mut slot) = self.inner.receiver.try_borrow_mut() {
            *slot = self.receiver.take();
        }
    }
}

/// Publish/subscribe channel
///
/// Cloning a streamer yields another handle to the same channel.
pub struct Streamer<T> {
    inner: Rc<StreamerInner<T>>,
}

impl<T> Clone for Streamer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Streamer<T> {
    /// Create a streamer with a random key
    pub fn new() -> Self {
        Self::with_key(&Uuid::new_v4().to_string())
    }

    pub fn with_key(key: &str) -> Self {
        Self {
            inner: Rc::new(StreamerInner {
                key: key.to_string(),
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                receiver: RefCell::new(None),
                pending: RefCell::new(VecDeque::new()),
                receiving: Cell::new(false),
                store: RefCell::new(None),
                relay: Cell::new(false),
            }),
        }
    }

    /// Streamer whose pushed values are sent straight on to its listeners
    pub fn relaying() -> Self {
        let streamer = Self::new();
        streamer.inner.relay.set(true);
        streamer
    }

    /// Streamer that records everything it sends for later pull access
    pub fn recording() -> Self
    where
        T: Clone,
    {
        Self::new().with_store(RecordingStore::new())
    }

    /// Attach a receiver for values pushed by out-flows
    pub fn with_receiver<F>(self, receiver: F) -> Self
    where
        F: FnMut(T, &str) + 'static,
    {
        *self.inner.receiver.borrow_mut() = Some(Box::new(receiver));
        self
    }

    /// Attach a backing store for pull access
    pub fn with_store<S>(self, store: S) -> Self
    where
        S: StreamStore<T> + 'static,
    {
        *self.inner.store.borrow_mut() = Some(Box::new(store));
        self
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn subscribe<L>(&self, listener: L) -> ListenerId
    where
        L: Listener<T> + 'static,
    {
        let id = ListenerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        debug!("Streamer {} gained listener {:?}", self.inner.key, id);
        id
    }

    /// Remove a listener; returns whether it was subscribed
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        let removed = listeners.len() != before;
        if removed {
            debug!("Streamer {} dropped listener {:?}", self.inner.key, id);
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Value produced at the end of an out-flow, tagged with the out-flow's key
    pub fn push(&self, value: T, origin_key: &str) {
        if self.inner.relay.get() {
            self.send(value);
            return;
        }

        if self.inner.receiving.get() {
            self.inner
                .pending
                .borrow_mut()
                .push_back((value, origin_key.to_string()));
            return;
        }

        // The receiver is taken out for the call so it may push into this
        // streamer again
        let taken = self.inner.receiver.borrow_mut().take();
        let Some(receiver) = taken else {
            return;
        };
        let mut slot = ReceiverSlot {
            inner: &self.inner,
            receiver: Some(receiver),
        };
        self.inner.receiving.set(true);

        let mut next = Some((value, origin_key.to_string()));
        while let Some((value, key)) = next {
            if let Some(receiver) = slot.receiver.as_mut() {
                receiver(value, &key);
            }
            next = self.inner.pending.borrow_mut().pop_front();
        }
    }

    /// Notify every listener of a new value
    pub fn send(&self, value: T) {
        if let Some(store) = self.inner.store.borrow_mut().as_mut() {
            store.record(&value);
        }

        // Snapshot so listeners may subscribe or unsubscribe while notified
        let listeners: Vec<Rc<dyn Listener<T>>> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in listeners {
            listener.notify(&value);
        }
    }

    /// Number of values available for pull access
    pub fn size(&self) -> usize {
        self.inner
            .store
            .borrow()
            .as_ref()
            .map_or(0, |store| store.size())
    }

    /// Value at `index` for pull access
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner
            .store
            .borrow()
            .as_ref()
            .and_then(|store| store.get(index))
    }
}

impl<T: 'static> Default for Streamer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Streamer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streamer")
            .field("key", &self.inner.key)
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

/// Pull-mode reader over a streamer's store
///
/// Marks its root as streaming. A pass covers the values stored when the
/// pass began.
pub struct StreamerSource<T> {
    streamer: Streamer<T>,
    pos: usize,
    /// Store size captured by the first read of a pass
    length: Option<usize>,
}

impl<T: 'static> StreamerSource<T> {
    pub fn new(streamer: Streamer<T>) -> Self {
        Self {
            streamer,
            pos: 0,
            length: None,
        }
    }
}

impl<T: 'static> Source<T> for StreamerSource<T> {
    fn next(&mut self) -> Option<T> {
        let length = *self.length.get_or_insert_with(|| self.streamer.size());
        loop {
            if self.pos >= length {
                self.reset();
                return None;
            }

            let index = self.pos;
            self.pos += 1;
            match self.streamer.get(index) {
                Some(value) => return Some(value),
                None => warn!(
                    "Streamer {} has no stored value at index {index}, skipping",
                    self.streamer.key()
                ),
            }
        }
    }

    fn reset(&mut self) {
        self.pos = 0;
        self.length = None;
    }

    fn streamer(&self) -> Option<Streamer<T>> {
        Some(self.streamer.clone())
    }
}

/// A flow whose push output is forwarded into a streamer
pub struct OutFlow<T> {
    flow: Flow<T>,
    streamer: Streamer<T>,
    key: String,
}

impl<T: Clone + 'static> OutFlow<T> {
    /// Attach `flow` to `streamer` under a random key
    pub fn new(flow: &Flow<T>, streamer: &Streamer<T>) -> Self {
        Self::with_key(flow, streamer, &Uuid::new_v4().to_string())
    }

    pub fn with_key(flow: &Flow<T>, streamer: &Streamer<T>, key: &str) -> Self {
        Self {
            flow: flow.clone(),
            streamer: streamer.clone(),
            key: key.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn streamer(&self) -> &Streamer<T> {
        &self.streamer
    }

    /// Wire the flow into the streamer and start its root
    pub fn start(&self) {
        debug!("Starting out-flow {} into streamer {}", self.key, self.streamer.key());
        let streamer = self.streamer.clone();
        let key = self.key.clone();
        self.flow
            .start_push_with(move |value: T| streamer.push(value, &key));
    }

    pub fn stop(&self) {
        self.flow.stop_push();
    }

    pub fn is_listening(&self) -> bool {
        self.flow.is_listening()
    }
}

impl<T> fmt::Debug for OutFlow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutFlow")
            .field("key", &self.key)
            .field("streamer", &self.streamer)
            .finish()
    }
}
