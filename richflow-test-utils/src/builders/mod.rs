//! Builders for test roots

use crate::mocks::CountingSource;
use richflow_core::{
    FlowConfig, SourceFlow, Streamer, StreamerSource, TaskQueue, VecSource,
};

/// Builder for multi-source roots
pub struct FlowBuilder<T> {
    sources: Vec<Vec<T>>,
    config: FlowConfig,
    queue: Option<TaskQueue>,
}

impl<T: Clone + 'static> FlowBuilder<T> {
    /// Create a new flow builder
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            config: FlowConfig::test(),
            queue: None,
        }
    }

    /// Add a source holding `items`
    pub fn with_source(mut self, items: Vec<T>) -> Self {
        self.sources.push(items);
        self
    }

    pub fn with_config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_scheduler(mut self, queue: TaskQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Build a root over plain vector sources
    pub fn build(self) -> SourceFlow<T> {
        self.build_with(VecSource::new)
    }

    /// Build a root over counting sources, returning handles on their counters
    pub fn build_counting(self) -> (SourceFlow<T>, Vec<CountingSource<T>>) {
        let mut handles = Vec::new();
        let root = self.build_with(|items| {
            let source = CountingSource::new(items);
            handles.push(source.clone());
            source
        });
        (root, handles)
    }

    fn build_with<S, F>(self, mut make: F) -> SourceFlow<T>
    where
        S: richflow_core::Source<T> + 'static,
        F: FnMut(Vec<T>) -> S,
    {
        let mut sources = self.sources.into_iter();
        let first = make(sources.next().unwrap_or_default());
        let mut root = SourceFlow::with_config(first, self.config);
        if let Some(queue) = self.queue {
            root = root.with_scheduler(queue);
        }
        for items in sources {
            root.merge(make(items))
                .expect("finite sources always merge");
        }
        root
    }
}

impl<T: Clone + 'static> Default for FlowBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming root over two streamers, driven by `queue`
pub fn streaming_pair<T: Clone + 'static>(
    queue: TaskQueue,
) -> (SourceFlow<T>, Streamer<T>, Streamer<T>) {
    let left = Streamer::new();
    let right = Streamer::new();
    let root = SourceFlow::with_config(StreamerSource::new(left.clone()), FlowConfig::test())
        .with_scheduler(queue);
    root.merge(StreamerSource::new(right.clone()))
        .expect("streaming sources always merge");
    (root, left, right)
}
