//! Windowing stage for a single upstream

use super::{Downstream, Stage, Upstream};
use crate::window::{Window, Windower};
use std::ops::ControlFlow;

/// Groups consecutive upstream values into windows
///
/// When upstream ends with a partial window pending, the window is padded
/// with `None` and emitted before the end is passed on.
pub struct DiscretizerStage<T> {
    windower: Windower<Option<T>>,
    /// The padded tail was returned; the next pull reports the end
    drained: bool,
}

impl<T: Clone + 'static> DiscretizerStage<T> {
    pub(crate) fn new(windower: Windower<Option<T>>) -> Self {
        Self {
            windower,
            drained: false,
        }
    }
}

impl<T: Clone + 'static> Stage<T, Window<Option<T>>> for DiscretizerStage<T> {
    fn name(&self) -> &str {
        "Discretize"
    }

    fn pull(&mut self, upstream: &mut dyn Upstream<T>) -> Option<Window<Option<T>>> {
        if self.drained {
            self.drained = false;
            return None;
        }

        loop {
            match upstream.request() {
                Some(value) => {
                    if let Some(window) = self.windower.offer(Some(value)) {
                        return Some(window);
                    }
                }
                None => {
                    let tail = self.windower.pad(|| None);
                    self.drained = tail.is_some();
                    return tail;
                }
            }
        }
    }

    fn push(
        &mut self,
        input: T,
        downstream: &mut dyn Downstream<Window<Option<T>>>,
    ) -> ControlFlow<()> {
        match self.windower.offer(Some(input)) {
            Some(window) => downstream.emit(window),
            None => ControlFlow::Continue(()),
        }
    }

    fn finish(&mut self, downstream: &mut dyn Downstream<Window<Option<T>>>) {
        if let Some(window) = self.windower.pad(|| None) {
            let _ = downstream.emit(window);
        }
        self.reset();
        downstream.finish();
    }

    fn reset(&mut self) {
        self.windower.clear();
        self.drained = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlowConfig;
    use crate::stage::testing::{Feed, pull_all, push_all};
    use crate::window::Boundary;

    fn stage(boundary: Boundary<Option<i32>>) -> DiscretizerStage<i32> {
        DiscretizerStage::new(Windower::new(boundary, false, 1, FlowConfig::test()).unwrap())
    }

    fn contents(windows: Vec<Window<Option<i32>>>) -> Vec<Vec<Option<i32>>> {
        windows.into_iter().map(Window::into_vec).collect()
    }

    #[test]
    fn test_pull_pads_partial_tail() {
        let mut stage = stage(Boundary::Count(2));
        let mut feed = Feed::new(vec![1, 2, 3, 4, 5]);

        let windows = contents(pull_all(&mut stage, &mut feed));
        assert_eq!(
            windows,
            vec![
                vec![Some(1), Some(2)],
                vec![Some(3), Some(4)],
                vec![Some(5), None]
            ]
        );
        // the next pass starts cleanly
        assert_eq!(contents(pull_all(&mut stage, &mut feed)).len(), 3);
    }

    #[test]
    fn test_exact_multiple_needs_no_padding() {
        let mut stage = stage(Boundary::Count(2));
        let windows = contents(pull_all(&mut stage, &mut Feed::new(vec![1, 2])));
        assert_eq!(windows, vec![vec![Some(1), Some(2)]]);
    }

    #[test]
    fn test_predicate_boundary() {
        let mut stage = stage(Boundary::when(|value: &Option<i32>, _| *value == Some(0)));
        let windows = contents(pull_all(&mut stage, &mut Feed::new(vec![4, 0, 7, 8, 0])));
        assert_eq!(
            windows,
            vec![vec![Some(4), Some(0)], vec![Some(7), Some(8), Some(0)]]
        );
    }

    #[test]
    fn test_push_flushes_on_finish() {
        let mut stage = stage(Boundary::Count(3));
        let sink = push_all(&mut stage, vec![1, 2, 3, 4]);

        assert_eq!(
            contents(sink.values),
            vec![vec![Some(1), Some(2), Some(3)], vec![Some(4), None, None]]
        );
        assert!(sink.finished);
    }
}
