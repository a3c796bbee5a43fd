//! Chaining operators

use super::Flow;
use crate::Result;
use crate::stage::{
    DiscretizerStage, ExpandStage, FilterStage, LatchMode, LatchStage, MapStage, OrderByStage,
    Partition, PartitionStage, RangeStage,
};
use crate::streamer::{OutFlow, Streamer};
use crate::window::{Boundary, Window, Windower};
use std::cmp::Ordering;
use std::hash::Hash;

/// Preset sort orders for [`Flow::sort`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl<T: Clone + 'static> Flow<T> {
    pub fn map<U, F>(&self, transform: F) -> Flow<U>
    where
        U: Clone + 'static,
        F: FnMut(T) -> U + 'static,
    {
        self.chain(MapStage::new(transform))
    }

    /// Alias of [`map`](Self::map)
    pub fn select<U, F>(&self, transform: F) -> Flow<U>
    where
        U: Clone + 'static,
        F: FnMut(T) -> U + 'static,
    {
        self.map(transform)
    }

    pub fn filter<P>(&self, predicate: P) -> Flow<T>
    where
        P: FnMut(&T) -> bool + 'static,
    {
        self.chain(FilterStage::new(predicate))
    }

    /// Values at positions `start..end` of each pass
    pub fn range(&self, start: usize, end: usize) -> Result<Flow<T>> {
        Ok(self.chain(RangeStage::new(start, end)?))
    }

    pub fn limit(&self, count: usize) -> Result<Flow<T>> {
        Ok(self.chain(RangeStage::limit(count)?))
    }

    pub fn skip(&self, count: usize) -> Result<Flow<T>> {
        Ok(self.chain(RangeStage::skip(count)?))
    }

    pub fn skip_until<P>(&self, predicate: P) -> Flow<T>
    where
        P: FnMut(&T) -> bool + 'static,
    {
        self.chain(LatchStage::new(LatchMode::SkipUntil, predicate))
    }

    pub fn skip_while<P>(&self, predicate: P) -> Flow<T>
    where
        P: FnMut(&T) -> bool + 'static,
    {
        self.chain(LatchStage::new(LatchMode::SkipWhile, predicate))
    }

    pub fn take_until<P>(&self, predicate: P) -> Flow<T>
    where
        P: FnMut(&T) -> bool + 'static,
    {
        self.chain(LatchStage::new(LatchMode::TakeUntil, predicate))
    }

    pub fn take_while<P>(&self, predicate: P) -> Flow<T>
    where
        P: FnMut(&T) -> bool + 'static,
    {
        self.chain(LatchStage::new(LatchMode::TakeWhile, predicate))
    }

    /// Stable sort of each pass by `compare`
    pub fn order_by<C>(&self, compare: C) -> Flow<T>
    where
        C: FnMut(&T, &T) -> Ordering + 'static,
    {
        self.chain(OrderByStage::new(compare))
    }

    /// Stable sort by an extracted key
    pub fn order_by_key<K, F>(&self, mut key: F) -> Flow<T>
    where
        K: Ord + 'static,
        F: FnMut(&T) -> K + 'static,
    {
        self.order_by(move |a, b| key(a).cmp(&key(b)))
    }

    /// Stable sort in a preset order
    ///
    /// Values that do not compare equal to themselves, such as `NaN`, are
    /// placed after all other values in either order.
    pub fn sort(&self, order: Order) -> Flow<T>
    where
        T: PartialOrd,
    {
        self.order_by(move |a: &T, b: &T| match (unordered(a), unordered(b)) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ordering = a.partial_cmp(b).unwrap_or(Ordering::Equal);
                match order {
                    Order::Asc => ordering,
                    Order::Desc => ordering.reverse(),
                }
            }
        })
    }

    /// Group each pass by key, one [`Partition`] per key in first-appearance order
    pub fn partition_by<K, F>(&self, key: F) -> Flow<Partition<K, T>>
    where
        K: Eq + Hash + Clone + 'static,
        F: FnMut(&T) -> K + 'static,
    {
        self.chain(PartitionStage::new(key))
    }

    /// Map every value to a sequence and yield the sequences' elements
    pub fn select_expand<I, F>(&self, expand: F) -> Flow<I::Item>
    where
        I: IntoIterator + 'static,
        I::Item: Clone + 'static,
        I::IntoIter: 'static,
        F: FnMut(T) -> I + 'static,
    {
        self.chain(ExpandStage::new(expand))
    }

    /// Group consecutive values into windows
    ///
    /// A partial last window is padded with `None` until `boundary` fires.
    pub fn discretize(
        &self,
        boundary: Boundary<Option<T>>,
        spawn_flows: bool,
    ) -> Result<Flow<Window<Option<T>>>> {
        let windower = Windower::new(boundary, spawn_flows, 1, self.root.config())?;
        Ok(self.chain(DiscretizerStage::new(windower)))
    }

    /// Forward this flow's push output into `streamer` under a random key
    pub fn push_into(&self, streamer: &Streamer<T>) -> OutFlow<T> {
        OutFlow::new(self, streamer)
    }
}

impl<T> Flow<T>
where
    T: IntoIterator + Clone + 'static,
    T::Item: Clone + 'static,
    T::IntoIter: 'static,
{
    /// Yield the elements of every nested sequence
    pub fn flatten(&self) -> Flow<T::Item> {
        self.select_expand(|nested: T| nested)
    }
}

fn unordered<T: PartialOrd>(value: &T) -> bool {
    value.partial_cmp(value).is_none()
}
