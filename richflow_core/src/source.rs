//! Data sources that feed a root flow
//!
//! A [`Source`] is a resettable, possibly infinite, ordered sequence. The end
//! of a pass is signalled by `None`; a source that has returned `None`
//! restarts from its beginning on the next call so the same source can be
//! replayed by later passes.

use crate::error::IoError;
use crate::streamer::Streamer;
use crate::Result;
use log::debug;
use std::fs;
use std::path::Path;

/// A restartable sequence of values
pub trait Source<T> {
    /// Next value of the current pass, `None` once the pass is over
    fn next(&mut self) -> Option<T>;

    /// Abandon the current pass and start again from the beginning
    fn reset(&mut self);

    /// The streamer backing this source, if it is a streaming source
    fn streamer(&self) -> Option<Streamer<T>> {
        None
    }
}

impl<T> Source<T> for Box<dyn Source<T>> {
    fn next(&mut self) -> Option<T> {
        (**self).next()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn streamer(&self) -> Option<Streamer<T>> {
        (**self).streamer()
    }
}

/// Source over an owned vector
#[derive(Debug, Clone)]
pub struct VecSource<T> {
    items: Vec<T>,
    pos: usize,
}

impl<T> VecSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Clone> Source<T> for VecSource<T> {
    fn next(&mut self) -> Option<T> {
        match self.items.get(self.pos) {
            Some(item) => {
                self.pos += 1;
                Some(item.clone())
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

/// Source built from an iterator factory
///
/// The factory is called at the start of every pass, so generators restart
/// cleanly after they end or are reset.
pub struct IterSource<F, I>
where
    F: FnMut() -> I,
    I: Iterator,
{
    factory: F,
    current: Option<I>,
}

impl<F, I> IterSource<F, I>
where
    F: FnMut() -> I,
    I: Iterator,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            current: None,
        }
    }
}

impl<T, F, I> Source<T> for IterSource<F, I>
where
    F: FnMut() -> I,
    I: Iterator<Item = T>,
{
    fn next(&mut self) -> Option<T> {
        let factory = &mut self.factory;
        let iter = self.current.get_or_insert_with(factory);
        let next = iter.next();
        if next.is_none() {
            self.current = None;
        }
        next
    }

    fn reset(&mut self) {
        self.current = None;
    }
}

/// Source yielding a single value per pass
#[derive(Debug, Clone)]
pub struct OnceSource<T> {
    value: T,
    emitted: bool,
}

impl<T> OnceSource<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            emitted: false,
        }
    }
}

impl<T: Clone> Source<T> for OnceSource<T> {
    fn next(&mut self) -> Option<T> {
        if self.emitted {
            self.emitted = false;
            None
        } else {
            self.emitted = true;
            Some(self.value.clone())
        }
    }

    fn reset(&mut self) {
        self.emitted = false;
    }
}

/// Source over the lines of a text file
///
/// The file is read when the source is opened; later passes replay the
/// same lines.
#[derive(Debug, Clone)]
pub struct LineSource {
    lines: VecSource<String>,
}

impl LineSource {
    /// Read every line of `path`
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| IoError::from_std(e).with_path(path))?;
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        debug!("Opened {} with {} line(s)", path.display(), lines.len());
        Ok(Self {
            lines: VecSource::new(lines),
        })
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl Source<String> for LineSource {
    fn next(&mut self) -> Option<String> {
        self.lines.next()
    }

    fn reset(&mut self) {
        self.lines.reset()
    }
}

/// Key/value entry produced by map-backed flows
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pair<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Pair<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

impl<K, V> From<(K, V)> for Pair<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self { key, value }
    }
}

/// Outcome of one step through a [`SourceSet`]
#[derive(Debug, PartialEq)]
pub(crate) enum Step<T> {
    Value(T),
    /// The source at this index finished its pass; the cursor moved on
    SourceEnded(usize),
    /// Every source finished; the cursor is back at the first source
    Exhausted,
}

/// Ordered collection of merged sources with a cursor
pub(crate) struct SourceSet<T> {
    sources: Vec<Box<dyn Source<T>>>,
    pos: usize,
}

impl<T> SourceSet<T> {
    pub(crate) fn new() -> Self {
        Self {
            sources: Vec::new(),
            pos: 0,
        }
    }

    pub(crate) fn push(&mut self, source: Box<dyn Source<T>>) {
        self.sources.push(source);
    }

    pub(crate) fn len(&self) -> usize {
        self.sources.len()
    }

    pub(crate) fn streamers(&self) -> Vec<Streamer<T>> {
        self.sources
            .iter()
            .filter_map(|source| source.streamer())
            .collect()
    }

    pub(crate) fn source_mut(&mut self, index: usize) -> Option<&mut Box<dyn Source<T>>> {
        self.sources.get_mut(index)
    }

    pub(crate) fn step(&mut self) -> Step<T> {
        let Some(source) = self.sources.get_mut(self.pos) else {
            self.pos = 0;
            return Step::Exhausted;
        };

        match source.next() {
            Some(value) => Step::Value(value),
            None => {
                let ended = self.pos;
                self.pos += 1;
                Step::SourceEnded(ended)
            }
        }
    }

    /// Next value across all sources in merge order
    pub(crate) fn next(&mut self) -> Option<T> {
        loop {
            match self.step() {
                Step::Value(value) => return Some(value),
                Step::SourceEnded(_) => continue,
                Step::Exhausted => return None,
            }
        }
    }

    pub(crate) fn rewind(&mut self) {
        self.pos = 0;
        for source in &mut self.sources {
            source.reset();
        }
    }
}
