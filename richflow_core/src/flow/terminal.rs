//! Terminal operations
//!
//! Terminals drive a flow in pull mode until it ends. Short-circuiting
//! terminals rewind the chain when they stop early, so every terminal
//! starts from the beginning of a pass.

use super::{Flow, NodeRef};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;
use std::ops::ControlFlow;

/// Values that numeric terminals can aggregate
pub trait Numeric: Copy {
    fn to_f64(self) -> f64;
}

macro_rules! impl_numeric {
    ($($ty:ty),*) => {
        $(
            impl Numeric for $ty {
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_numeric!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Summary statistics of a numeric flow
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub sum: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub average: Option<f64>,
}

impl Summary {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |min| min.min(value)));
        self.max = Some(self.max.map_or(value, |max| max.max(value)));
    }

    fn finalize(mut self) -> Self {
        if self.count > 0 {
            self.average = Some(self.sum / self.count as f64);
        }
        self
    }
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: None,
            max: None,
            average: None,
        }
    }
}

/// Pull iterator over one pass of a flow
///
/// Dropping the iterator before the pass ends rewinds the chain, including
/// when a stage closure panics mid-pass.
pub struct Iter<T> {
    node: NodeRef<T>,
    done: bool,
}

impl<T> Iterator for Iter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.done {
            return None;
        }

        let next = self.node.borrow_mut().request();
        if next.is_none() {
            self.done = true;
        }
        next
    }
}

impl<T> Drop for Iter<T> {
    fn drop(&mut self) {
        if !self.done
            && let Ok(mut node) = self.node.try_borrow_mut()
        {
            node.rewind();
        }
    }
}

impl<T: Clone + 'static> Flow<T> {
    /// Pull values into `visit` until the pass ends or `visit` breaks
    ///
    /// The pass is held by an [`Iter`], so breaking early or unwinding out of
    /// a panicking closure rewinds the chain.
    fn drain<F>(&self, mut visit: F)
    where
        F: FnMut(T) -> ControlFlow<()>,
    {
        let mut pass = self.iter();
        for value in pass.by_ref() {
            if visit(value).is_break() {
                return;
            }
        }
    }

    /// Iterate over one pass
    pub fn iter(&self) -> Iter<T> {
        Iter {
            node: self.node.clone(),
            done: false,
        }
    }

    pub fn count(&self) -> usize {
        let mut count = 0;
        self.drain(|_| {
            count += 1;
            ControlFlow::Continue(())
        });
        count
    }

    pub fn to_vec(&self) -> Vec<T> {
        let mut values = Vec::new();
        self.drain(|value| {
            values.push(value);
            ControlFlow::Continue(())
        });
        values
    }

    /// Collect one pass into any collection
    pub fn collect<C>(&self) -> C
    where
        C: FromIterator<T>,
    {
        self.to_vec().into_iter().collect()
    }

    pub fn to_set(&self) -> HashSet<T>
    where
        T: Eq + Hash,
    {
        self.collect()
    }

    /// Collect into a map; later values overwrite earlier ones with the same key
    pub fn to_map<K, V, KF, VF>(&self, mut key: KF, mut value: VF) -> HashMap<K, V>
    where
        K: Eq + Hash,
        KF: FnMut(&T) -> K,
        VF: FnMut(&T) -> V,
    {
        let mut map = HashMap::new();
        self.drain(|item| {
            map.insert(key(&item), value(&item));
            ControlFlow::Continue(())
        });
        map
    }

    pub fn group_by<K, F>(&self, mut key: F) -> HashMap<K, Vec<T>>
    where
        K: Eq + Hash,
        F: FnMut(&T) -> K,
    {
        let mut groups: HashMap<K, Vec<T>> = HashMap::new();
        self.drain(|item| {
            groups.entry(key(&item)).or_default().push(item);
            ControlFlow::Continue(())
        });
        groups
    }

    pub fn reduce<A, F>(&self, seed: A, combine: F) -> A
    where
        F: FnMut(A, T) -> A,
    {
        self.iter().fold(seed, combine)
    }

    pub fn for_each<F>(&self, mut action: F)
    where
        F: FnMut(T),
    {
        self.drain(|item| {
            action(item);
            ControlFlow::Continue(())
        });
    }

    pub fn any_match<P>(&self, mut predicate: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        let mut found = false;
        self.drain(|item| {
            if predicate(&item) {
                found = true;
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        found
    }

    pub fn all_match<P>(&self, mut predicate: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        !self.any_match(|item| !predicate(item))
    }

    pub fn none_match<P>(&self, predicate: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        !self.any_match(predicate)
    }

    pub fn find_first(&self) -> Option<T> {
        let mut first = None;
        self.drain(|item| {
            first = Some(item);
            ControlFlow::Break(())
        });
        first
    }

    /// Same as [`find_first`](Self::find_first); evaluation is sequential
    pub fn find_any(&self) -> Option<T> {
        self.find_first()
    }

    pub fn find_last(&self) -> Option<T> {
        let mut last = None;
        self.drain(|item| {
            last = Some(item);
            ControlFlow::Continue(())
        });
        last
    }

    pub fn min(&self) -> Option<T>
    where
        T: PartialOrd,
    {
        self.reduce(None, |min: Option<T>, item| match min {
            Some(current) if current <= item => Some(current),
            _ => Some(item),
        })
    }

    pub fn max(&self) -> Option<T>
    where
        T: PartialOrd,
    {
        self.reduce(None, |max: Option<T>, item| match max {
            Some(current) if current >= item => Some(current),
            _ => Some(item),
        })
    }

    /// Join the display form of every value with `,`
    pub fn join(&self) -> String
    where
        T: Display,
    {
        self.join_with(",")
    }

    pub fn join_with(&self, delimiter: &str) -> String
    where
        T: Display,
    {
        let mut joined = String::new();
        let mut first = true;
        self.drain(|item| {
            if !first {
                joined.push_str(delimiter);
            }
            first = false;
            joined.push_str(&item.to_string());
            ControlFlow::Continue(())
        });
        joined
    }

    pub fn sum(&self) -> f64
    where
        T: Numeric,
    {
        self.reduce(0.0, |sum, item| sum + item.to_f64())
    }

    pub fn average(&self) -> Option<f64>
    where
        T: Numeric,
    {
        self.summarize().average
    }

    pub fn summarize(&self) -> Summary
    where
        T: Numeric,
    {
        self.reduce(Summary::default(), |mut summary, item| {
            summary.add(item.to_f64());
            summary
        })
        .finalize()
    }
}

impl<'a, T: Clone + 'static> IntoIterator for &'a Flow<T> {
    type Item = T;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Iter<T> {
        self.iter()
    }
}
