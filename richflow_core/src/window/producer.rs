//! Root-level window producers
//!
//! A producer turns the merged sources of a root into windows, both when
//! pulled (reading the sources directly) and when pushed (fed with values
//! arriving from streamers).

use super::{Row, Window, Windower};
use crate::source::{SourceSet, Step};
use log::trace;
use std::collections::VecDeque;

pub(crate) trait WindowProducer<T> {
    type Element: Clone + 'static;

    /// Number of sources this producer reads
    fn span(&self) -> usize;

    /// Whether streaming arrivals are windowed as they come, without a
    /// deferred reconciliation pass
    fn is_synchronous(&self) -> bool;

    /// Next window of a pull pass, `None` at the end of the pass
    fn next_window(&mut self, sources: &mut SourceSet<T>) -> Option<Window<Self::Element>>;

    /// A value arrived from the streaming source at `source`
    fn arrive(&mut self, source: usize, value: T) -> Option<Window<Self::Element>>;

    /// Windows that can be completed from queued arrivals
    fn reconcile(&mut self) -> Vec<Window<Self::Element>>;

    fn reset(&mut self);
}

/// Per-source blocks: a block never straddles two sources
pub(crate) struct SequentialProducer<T, E> {
    windower: Windower<E>,
    wrap: fn(Option<T>) -> E,
}

impl<T, E: Clone + 'static> SequentialProducer<T, E> {
    pub(crate) fn new(windower: Windower<E>, wrap: fn(Option<T>) -> E) -> Self {
        Self { windower, wrap }
    }
}

impl<T, E: Clone + 'static> WindowProducer<T> for SequentialProducer<T, E> {
    type Element = E;

    fn span(&self) -> usize {
        1
    }

    fn is_synchronous(&self) -> bool {
        true
    }

    fn next_window(&mut self, sources: &mut SourceSet<T>) -> Option<Window<E>> {
        let wrap = self.wrap;
        loop {
            match sources.step() {
                Step::Value(value) => {
                    if let Some(window) = self.windower.offer(wrap(Some(value))) {
                        return Some(window);
                    }
                }
                Step::SourceEnded(index) => {
                    if let Some(window) = self.windower.pad(|| wrap(None)) {
                        trace!("Source #{index} ended with a padded block");
                        return Some(window);
                    }
                }
                Step::Exhausted => {
                    self.windower.clear();
                    return None;
                }
            }
        }
    }

    fn arrive(&mut self, _source: usize, value: T) -> Option<Window<E>> {
        self.windower.offer((self.wrap)(Some(value)))
    }

    fn reconcile(&mut self) -> Vec<Window<E>> {
        Vec::new()
    }

    fn reset(&mut self) {
        self.windower.clear();
    }
}

/// Round-robin rows: one value from each of the first `span` sources
pub(crate) struct RoundRobinProducer<T> {
    windower: Windower<Row<T>>,
    span: usize,
    /// Sources that finished the current pull pass
    ended: Vec<bool>,
    /// The padded tail was returned; the next pull reports the end
    finished: bool,
    /// Streaming arrivals per source, aligned by position
    queues: Vec<VecDeque<T>>,
}

impl<T: Clone + 'static> RoundRobinProducer<T> {
    /// `span` must already be clamped to the number of sources
    pub(crate) fn new(windower: Windower<Row<T>>, span: usize) -> Self {
        Self {
            windower,
            span,
            ended: vec![false; span],
            finished: false,
            queues: (0..span).map(|_| VecDeque::new()).collect(),
        }
    }

    fn next_row(&mut self, sources: &mut SourceSet<T>) -> Row<T> {
        let mut row = Vec::with_capacity(self.span);
        for index in 0..self.span {
            if self.ended[index] {
                row.push(None);
                continue;
            }

            let value = sources.source_mut(index).and_then(|source| source.next());
            if value.is_none() {
                self.ended[index] = true;
            }
            row.push(value);
        }
        row
    }

    pub(crate) fn queued(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }
}

impl<T: Clone + 'static> WindowProducer<T> for RoundRobinProducer<T> {
    type Element = Row<T>;

    fn span(&self) -> usize {
        self.span
    }

    fn is_synchronous(&self) -> bool {
        false
    }

    fn next_window(&mut self, sources: &mut SourceSet<T>) -> Option<Window<Row<T>>> {
        if self.finished || self.span == 0 {
            self.finished = false;
            return None;
        }

        loop {
            let row = self.next_row(sources);
            if self.ended.iter().all(|ended| *ended) {
                // Every source has restarted itself; the all-None row is not data
                self.ended.fill(false);
                let span = self.span;
                let tail = self.windower.pad(|| vec![None; span]);
                self.finished = tail.is_some();
                return tail;
            }

            if let Some(window) = self.windower.offer(row) {
                return Some(window);
            }
        }
    }

    fn arrive(&mut self, source: usize, value: T) -> Option<Window<Row<T>>> {
        if let Some(queue) = self.queues.get_mut(source) {
            queue.push_back(value);
        }
        None
    }

    fn reconcile(&mut self) -> Vec<Window<Row<T>>> {
        let mut windows = Vec::new();
        while self.span > 0 && self.queues.iter().all(|queue| !queue.is_empty()) {
            let row: Row<T> = self
                .queues
                .iter_mut()
                .map(|queue| queue.pop_front())
                .collect();
            if let Some(window) = self.windower.offer(row) {
                windows.push(window);
            }
        }
        trace!(
            "Reconciliation produced {} window(s), {} value(s) still queued",
            windows.len(),
            self.queued()
        );
        windows
    }

    fn reset(&mut self) {
        self.windower.clear();
        self.ended.fill(false);
        self.finished = false;
        for queue in &mut self.queues {
            queue.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlowConfig;
    use crate::source::VecSource;
    use crate::window::Boundary;

    fn sources(lists: Vec<Vec<i32>>) -> SourceSet<i32> {
        let mut set = SourceSet::new();
        for list in lists {
            set.push(Box::new(VecSource::new(list)));
        }
        set
    }

    fn drain<P: WindowProducer<i32>>(
        producer: &mut P,
        set: &mut SourceSet<i32>,
    ) -> Vec<Vec<P::Element>> {
        std::iter::from_fn(|| producer.next_window(set))
            .map(Window::into_vec)
            .collect()
    }

    #[test]
    fn test_sequential_blocks_stay_within_a_source() {
        let windower = Windower::new(Boundary::Count(2), false, 1, FlowConfig::test()).unwrap();
        let mut producer = SequentialProducer::new(windower, |value| value);
        let mut set = sources(vec![vec![1, 2, 3], vec![4, 5]]);

        assert_eq!(
            drain(&mut producer, &mut set),
            vec![
                vec![Some(1), Some(2)],
                vec![Some(3), None],
                vec![Some(4), Some(5)]
            ]
        );
        // a second pass starts over
        assert_eq!(drain(&mut producer, &mut set).len(), 3);
    }

    #[test]
    fn test_round_robin_rows() {
        let windower = Windower::new(Boundary::Count(3), false, 2, FlowConfig::test()).unwrap();
        let mut producer = RoundRobinProducer::new(windower, 2);
        let mut set = sources(vec![vec![1, 2, 3], vec![10, 20]]);

        assert_eq!(
            drain(&mut producer, &mut set),
            vec![vec![
                vec![Some(1), Some(10)],
                vec![Some(2), Some(20)],
                vec![Some(3), None]
            ]]
        );
    }

    #[test]
    fn test_round_robin_pads_with_empty_rows() {
        let windower = Windower::new(Boundary::Count(2), false, 2, FlowConfig::test()).unwrap();
        let mut producer = RoundRobinProducer::new(windower, 2);
        let mut set = sources(vec![vec![1, 2, 3], vec![10]]);

        assert_eq!(
            drain(&mut producer, &mut set),
            vec![
                vec![vec![Some(1), Some(10)], vec![Some(2), None]],
                vec![vec![Some(3), None], vec![None, None]]
            ]
        );
    }

    #[test]
    fn test_reconcile_aligns_by_position() {
        let windower = Windower::new(Boundary::Count(1), false, 2, FlowConfig::test()).unwrap();
        let mut producer = RoundRobinProducer::new(windower, 2);

        producer.arrive(0, 1);
        producer.arrive(0, 2);
        producer.arrive(1, 10);
        let windows: Vec<_> = producer.reconcile().into_iter().map(Window::into_vec).collect();

        assert_eq!(windows, vec![vec![vec![Some(1), Some(10)]]]);
        assert_eq!(producer.queued(), 1);
    }
}
