//! Materializing stages: order-by and partition-by
//!
//! Both read their whole upstream pass before producing anything, so they
//! must not be pulled over an infinite source.

use super::{Downstream, Stage, Upstream};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::ControlFlow;
use std::vec;

/// Stable sort of each upstream pass
///
/// Push mode forwards values unsorted since a push run has no defined end
/// before which sorting could happen.
pub struct OrderByStage<T, C> {
    compare: C,
    sorted: Option<vec::IntoIter<T>>,
}

impl<T, C> OrderByStage<T, C>
where
    C: FnMut(&T, &T) -> Ordering,
{
    pub fn new(compare: C) -> Self {
        Self {
            compare,
            sorted: None,
        }
    }
}

impl<T, C> Stage<T, T> for OrderByStage<T, C>
where
    C: FnMut(&T, &T) -> Ordering,
{
    fn name(&self) -> &str {
        "OrderBy"
    }

    fn pull(&mut self, upstream: &mut dyn Upstream<T>) -> Option<T> {
        if self.sorted.is_none() {
            let mut items = Vec::new();
            while let Some(value) = upstream.request() {
                items.push(value);
            }
            items.sort_by(&mut self.compare);
            self.sorted = Some(items.into_iter());
        }

        let next = self.sorted.as_mut().and_then(Iterator::next);
        if next.is_none() {
            self.sorted = None;
        }
        next
    }

    fn push(&mut self, input: T, downstream: &mut dyn Downstream<T>) -> ControlFlow<()> {
        downstream.emit(input)
    }

    fn reset(&mut self) {
        self.sorted = None;
    }
}

/// One key's bucket from [`PartitionStage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<K, T> {
    pub key: K,
    pub values: Vec<T>,
}

/// Groups each upstream pass by key, in first-appearance key order
pub struct PartitionStage<K, T, F> {
    key_fn: F,
    buckets: Option<vec::IntoIter<Partition<K, T>>>,
}

impl<K, T, F> PartitionStage<K, T, F>
where
    K: Eq + Hash + Clone,
    F: FnMut(&T) -> K,
{
    pub fn new(key_fn: F) -> Self {
        Self {
            key_fn,
            buckets: None,
        }
    }

    fn materialize(&mut self, upstream: &mut dyn Upstream<T>) -> Vec<Partition<K, T>> {
        let mut index: HashMap<K, usize> = HashMap::new();
        let mut partitions: Vec<Partition<K, T>> = Vec::new();

        while let Some(value) = upstream.request() {
            let key = (self.key_fn)(&value);
            match index.get(&key) {
                Some(&slot) => partitions[slot].values.push(value),
                None => {
                    index.insert(key.clone(), partitions.len());
                    partitions.push(Partition {
                        key,
                        values: vec![value],
                    });
                }
            }
        }
        partitions
    }
}

impl<K, T, F> Stage<T, Partition<K, T>> for PartitionStage<K, T, F>
where
    K: Eq + Hash + Clone,
    F: FnMut(&T) -> K,
{
    fn name(&self) -> &str {
        "PartitionBy"
    }

    fn pull(&mut self, upstream: &mut dyn Upstream<T>) -> Option<Partition<K, T>> {
        if self.buckets.is_none() {
            let partitions = self.materialize(upstream);
            self.buckets = Some(partitions.into_iter());
        }

        let next = self.buckets.as_mut().and_then(Iterator::next);
        if next.is_none() {
            self.buckets = None;
        }
        next
    }

    fn push(
        &mut self,
        input: T,
        downstream: &mut dyn Downstream<Partition<K, T>>,
    ) -> ControlFlow<()> {
        let key = (self.key_fn)(&input);
        downstream.emit(Partition {
            key,
            values: vec![input],
        })
    }

    fn reset(&mut self) {
        self.buckets = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::testing::{Feed, pull_all, push_all};

    #[test]
    fn test_order_by_is_stable() {
        let mut stage = OrderByStage::new(|a: &(i32, char), b: &(i32, char)| a.0.cmp(&b.0));
        let mut feed = Feed::new(vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')]);

        assert_eq!(
            pull_all(&mut stage, &mut feed),
            vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]
        );
    }

    #[test]
    fn test_order_by_resorts_each_pass() {
        let mut stage = OrderByStage::new(|a: &i32, b: &i32| b.cmp(a));
        let mut feed = Feed::new(vec![3, 1, 2]);

        assert_eq!(pull_all(&mut stage, &mut feed), vec![3, 2, 1]);
        assert_eq!(feed.requests, 4);
        assert_eq!(pull_all(&mut stage, &mut feed), vec![3, 2, 1]);
        assert_eq!(feed.requests, 8);
    }

    #[test]
    fn test_order_by_push_passes_through() {
        let mut stage = OrderByStage::new(|a: &i32, b: &i32| a.cmp(b));
        assert_eq!(push_all(&mut stage, vec![3, 1, 2]).values, vec![3, 1, 2]);
    }

    #[test]
    fn test_partition_first_appearance_order() {
        let mut stage = PartitionStage::new(|x: &i32| x % 2);
        let mut feed = Feed::new(vec![1, 2, 3, 4]);

        let partitions = pull_all(&mut stage, &mut feed);
        assert_eq!(
            partitions,
            vec![
                Partition {
                    key: 1,
                    values: vec![1, 3]
                },
                Partition {
                    key: 0,
                    values: vec![2, 4]
                },
            ]
        );
    }

    #[test]
    fn test_partition_push_emits_singletons() {
        let mut stage = PartitionStage::new(|s: &&str| s.len());
        let sink = push_all(&mut stage, vec!["ab", "c"]);

        assert_eq!(
            sink.values,
            vec![
                Partition {
                    key: 2,
                    values: vec!["ab"]
                },
                Partition {
                    key: 1,
                    values: vec!["c"]
                },
            ]
        );
    }
}
