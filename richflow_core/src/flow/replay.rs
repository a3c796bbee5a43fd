//! Replay buffer of one stage's outputs

/// Recorded outputs of a stage for a complete pass
///
/// Once a pass has been recorded from its first value to its end the
/// buffer is complete and serves later passes without touching upstream.
#[derive(Debug)]
pub(crate) struct ReplayBuffer<T> {
    elements: Vec<T>,
    ended: bool,
    cursor: usize,
    /// Some values of the current pass were produced while not recording
    partial: bool,
}

impl<T: Clone> ReplayBuffer<T> {
    pub(crate) fn new() -> Self {
        Self {
            elements: Vec::new(),
            ended: false,
            cursor: 0,
            partial: false,
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.ended
    }

    pub(crate) fn len(&self) -> usize {
        self.elements.len()
    }

    /// Record a produced value, or the end of the pass
    pub(crate) fn record(&mut self, value: Option<&T>) {
        if self.ended {
            return;
        }

        match value {
            Some(value) => self.elements.push(value.clone()),
            None if self.partial => self.clear(),
            None => self.ended = true,
        }
    }

    /// Note a value produced without recording
    pub(crate) fn skip(&mut self, end_of_pass: bool) {
        if end_of_pass {
            self.clear();
        } else {
            self.elements.clear();
            self.partial = true;
        }
    }

    /// Next replayed value; the cursor wraps on the end signal
    pub(crate) fn next(&mut self) -> Option<T> {
        match self.elements.get(self.cursor) {
            Some(value) => {
                self.cursor += 1;
                Some(value.clone())
            }
            None => {
                self.cursor = 0;
                None
            }
        }
    }

    pub(crate) fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub(crate) fn clear(&mut self) {
        self.elements.clear();
        self.ended = false;
        self.cursor = 0;
        self.partial = false;
    }
}
