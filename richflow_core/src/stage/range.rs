//! Positional slicing (range, limit, skip)

use super::{Downstream, Stage, Upstream};
use crate::Result;
use crate::error::ValidationError;
use std::ops::ControlFlow;

/// Passes the values at positions `start..end` of each pass
#[derive(Debug, Clone)]
pub struct RangeStage {
    start: usize,
    end: usize,
    position: usize,
    done: bool,
}

impl RangeStage {
    /// Values at positions `start..end`
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start > end {
            return Err(ValidationError::invalid_range(start, end).into());
        }
        if end == 0 {
            return Err(ValidationError::non_positive("end", end).into());
        }
        Ok(Self {
            start,
            end,
            position: 0,
            done: false,
        })
    }

    /// The first `count` values
    pub fn limit(count: usize) -> Result<Self> {
        if count == 0 {
            return Err(ValidationError::non_positive("limit", count).into());
        }
        Self::new(0, count)
    }

    /// Everything after the first `count` values
    pub fn skip(count: usize) -> Result<Self> {
        if count == 0 {
            return Err(ValidationError::non_positive("skip", count).into());
        }
        Self::new(count, usize::MAX)
    }
}

impl<T> Stage<T, T> for RangeStage {
    fn name(&self) -> &str {
        "Range"
    }

    fn pull(&mut self, upstream: &mut dyn Upstream<T>) -> Option<T> {
        loop {
            if self.position >= self.end {
                self.position = 0;
                upstream.rewind();
                return None;
            }

            let Some(value) = upstream.request() else {
                self.position = 0;
                return None;
            };

            let index = self.position;
            self.position += 1;
            if index >= self.start {
                return Some(value);
            }
        }
    }

    fn push(&mut self, input: T, downstream: &mut dyn Downstream<T>) -> ControlFlow<()> {
        if self.done {
            return ControlFlow::Break(());
        }

        let index = self.position;
        if index >= self.end {
            self.done = true;
            return ControlFlow::Break(());
        }
        self.position += 1;
        if index < self.start {
            return ControlFlow::Continue(());
        }

        let flow = downstream.emit(input);
        if self.position >= self.end {
            self.done = true;
            return ControlFlow::Break(());
        }
        flow
    }

    fn reset(&mut self) {
        self.position = 0;
        self.done = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::testing::{Feed, pull_all, push_all};

    #[test]
    fn test_range_pull() {
        let mut stage = RangeStage::new(1, 3).unwrap();
        let mut feed = Feed::new(vec![10, 20, 30, 40]);

        assert_eq!(pull_all(&mut stage, &mut feed), vec![20, 30]);
        assert_eq!(feed.rewinds, 1);
        // counter is reset for the next pass
        assert_eq!(pull_all(&mut stage, &mut feed), vec![20, 30]);
    }

    #[test]
    fn test_range_past_upstream_end() {
        let mut stage = RangeStage::new(2, 10).unwrap();
        let mut feed = Feed::new(vec![1, 2, 3]);

        assert_eq!(pull_all(&mut stage, &mut feed), vec![3]);
        assert_eq!(feed.rewinds, 0);
        assert_eq!(pull_all(&mut stage, &mut feed), vec![3]);
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(RangeStage::new(3, 1).is_err());
        assert!(RangeStage::new(0, 0).is_err());
        assert!(RangeStage::limit(0).is_err());
        assert!(RangeStage::skip(0).is_err());
    }

    #[test]
    fn test_limit_and_skip() {
        let mut limit = RangeStage::limit(2).unwrap();
        let mut skip = RangeStage::skip(2).unwrap();

        assert_eq!(pull_all(&mut limit, &mut Feed::new(vec![1, 2, 3])), vec![1, 2]);
        assert_eq!(pull_all(&mut skip, &mut Feed::new(vec![1, 2, 3])), vec![3]);
    }

    #[test]
    fn test_range_push_breaks_at_end() {
        let mut stage = RangeStage::new(1, 3).unwrap();
        let sink = push_all(&mut stage, vec![10, 20, 30, 40, 50]);

        assert_eq!(sink.values, vec![20, 30]);
        assert!(sink.finished);

        // finish reset the stage for the next run
        let sink = push_all(&mut stage, vec![1, 2]);
        assert_eq!(sink.values, vec![2]);
    }

    #[test]
    fn test_empty_range_emits_nothing() {
        let mut stage = RangeStage::new(1, 1).unwrap();
        assert!(pull_all(&mut stage, &mut Feed::new(vec![10, 20, 30])).is_empty());

        let sink = push_all(&mut stage, vec![10, 20, 30]);
        assert!(sink.values.is_empty());
        assert!(sink.finished);
    }
}
