//! Predicate latches: skip/take until/while

use super::{Downstream, Stage, Upstream};
use std::ops::ControlFlow;

/// How a [`LatchStage`] reacts to its predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchMode {
    /// Drop values until the first match, then pass the match and everything after
    SkipUntil,
    /// Drop values while the predicate holds, then pass everything after
    SkipWhile,
    /// Pass values up to and including the first match, then end
    TakeUntil,
    /// Pass values while the predicate holds, then end
    TakeWhile,
}

impl LatchMode {
    fn name(self) -> &'static str {
        match self {
            LatchMode::SkipUntil => "SkipUntil",
            LatchMode::SkipWhile => "SkipWhile",
            LatchMode::TakeUntil => "TakeUntil",
            LatchMode::TakeWhile => "TakeWhile",
        }
    }
}

pub struct LatchStage<P> {
    mode: LatchMode,
    predicate: P,
    /// Skip modes: the latch opened and everything passes
    open: bool,
    /// Take modes: the pass is over
    ended: bool,
}

impl<P> LatchStage<P> {
    pub fn new(mode: LatchMode, predicate: P) -> Self {
        Self {
            mode,
            predicate,
            open: false,
            ended: false,
        }
    }

    pub fn mode(&self) -> LatchMode {
        self.mode
    }
}

impl<T, P> Stage<T, T> for LatchStage<P>
where
    P: FnMut(&T) -> bool,
{
    fn name(&self) -> &str {
        self.mode.name()
    }

    fn pull(&mut self, upstream: &mut dyn Upstream<T>) -> Option<T> {
        if self.ended {
            self.open = false;
            self.ended = false;
            upstream.rewind();
            return None;
        }

        loop {
            let Some(value) = upstream.request() else {
                self.open = false;
                return None;
            };

            match self.mode {
                LatchMode::SkipUntil => {
                    if self.open || (self.predicate)(&value) {
                        self.open = true;
                        return Some(value);
                    }
                }
                LatchMode::SkipWhile => {
                    if self.open || !(self.predicate)(&value) {
                        self.open = true;
                        return Some(value);
                    }
                }
                LatchMode::TakeUntil => {
                    if (self.predicate)(&value) {
                        self.ended = true;
                    }
                    return Some(value);
                }
                LatchMode::TakeWhile => {
                    if (self.predicate)(&value) {
                        return Some(value);
                    }
                    upstream.rewind();
                    return None;
                }
            }
        }
    }

    fn push(&mut self, input: T, downstream: &mut dyn Downstream<T>) -> ControlFlow<()> {
        if self.ended {
            return ControlFlow::Break(());
        }

        match self.mode {
            LatchMode::SkipUntil | LatchMode::SkipWhile => {
                let matched = (self.predicate)(&input);
                let passes = match self.mode {
                    LatchMode::SkipUntil => matched,
                    _ => !matched,
                };
                if self.open || passes {
                    self.open = true;
                    downstream.emit(input)
                } else {
                    ControlFlow::Continue(())
                }
            }
            LatchMode::TakeUntil => {
                let matched = (self.predicate)(&input);
                let flow = downstream.emit(input);
                if matched {
                    self.ended = true;
                    return ControlFlow::Break(());
                }
                flow
            }
            LatchMode::TakeWhile => {
                if (self.predicate)(&input) {
                    downstream.emit(input)
                } else {
                    self.ended = true;
                    ControlFlow::Break(())
                }
            }
        }
    }

    fn reset(&mut self) {
        self.open = false;
        self.ended = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::testing::{Feed, pull_all, push_all};

    fn pulled(mode: LatchMode, items: Vec<i32>, predicate: fn(&i32) -> bool) -> Vec<i32> {
        let mut stage = LatchStage::new(mode, predicate);
        pull_all(&mut stage, &mut Feed::new(items))
    }

    fn pushed(mode: LatchMode, items: Vec<i32>, predicate: fn(&i32) -> bool) -> Vec<i32> {
        let mut stage = LatchStage::new(mode, predicate);
        push_all(&mut stage, items).values
    }

    #[test]
    fn test_skip_until() {
        assert_eq!(pulled(LatchMode::SkipUntil, vec![1, 2, 3, 4, 1], |x| *x > 2), vec![3, 4, 1]);
        assert_eq!(pushed(LatchMode::SkipUntil, vec![1, 2, 3, 4, 1], |x| *x > 2), vec![3, 4, 1]);
    }

    #[test]
    fn test_skip_while() {
        assert_eq!(pulled(LatchMode::SkipWhile, vec![1, 2, 3, 1], |x| *x < 3), vec![3, 1]);
        assert_eq!(pushed(LatchMode::SkipWhile, vec![1, 2, 3, 1], |x| *x < 3), vec![3, 1]);
    }

    #[test]
    fn test_take_until_includes_match() {
        assert_eq!(pulled(LatchMode::TakeUntil, vec![1, 2, 3, 4], |x| *x == 2), vec![1, 2]);
        assert_eq!(pushed(LatchMode::TakeUntil, vec![1, 2, 3, 4], |x| *x == 2), vec![1, 2]);
    }

    #[test]
    fn test_take_while() {
        assert_eq!(pulled(LatchMode::TakeWhile, vec![1, 2, 3, 1], |x| *x < 3), vec![1, 2]);
        assert_eq!(pulled(LatchMode::TakeWhile, vec![1, 2, 3, 4], |x| *x > 2), Vec::<i32>::new());
        assert_eq!(pushed(LatchMode::TakeWhile, vec![1, 2, 3, 1], |x| *x < 3), vec![1, 2]);
    }

    #[test]
    fn test_take_ending_rewinds_upstream() {
        let mut stage = LatchStage::new(LatchMode::TakeUntil, |x: &i32| *x == 2);
        let mut feed = Feed::new(vec![1, 2, 3]);

        assert_eq!(pull_all(&mut stage, &mut feed), vec![1, 2]);
        assert_eq!(feed.rewinds, 1);
        assert_eq!(pull_all(&mut stage, &mut feed), vec![1, 2]);
    }

    #[test]
    fn test_skip_latch_resets_between_passes() {
        let mut stage = LatchStage::new(LatchMode::SkipUntil, |x: &i32| *x == 2);
        let mut feed = Feed::new(vec![1, 2, 3]);

        assert_eq!(pull_all(&mut stage, &mut feed), vec![2, 3]);
        assert_eq!(pull_all(&mut stage, &mut feed), vec![2, 3]);
    }
}
