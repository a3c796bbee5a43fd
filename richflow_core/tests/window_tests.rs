//! Integration tests for discretization and multi-source reconciliation

use richflow_core::{
    Boundary, BoundaryPredicate, Flow, FlowConfig, Row, TaskQueue, VecSource, Window,
};
use richflow_test_utils::{FlowBuilder, Recorder, streaming_pair};
use std::time::Duration;

fn rows(windows: Vec<Window<Row<i32>>>) -> Vec<Vec<Row<i32>>> {
    windows.into_iter().map(Window::into_vec).collect()
}

#[test]
fn test_discretize_pads_the_last_window() {
    let windows = Flow::from_vec(vec![1, 2, 3, 4, 5])
        .discretize(Boundary::count(2).unwrap(), false)
        .unwrap();

    let contents: Vec<_> = windows.to_vec().into_iter().map(Window::into_vec).collect();
    assert_eq!(
        contents,
        vec![
            vec![Some(1), Some(2)],
            vec![Some(3), Some(4)],
            vec![Some(5), None]
        ]
    );
}

#[test]
fn test_span_two_has_no_trailing_empty_row() {
    let root = FlowBuilder::new()
        .with_source(vec![1, 2, 3])
        .with_source(vec![10, 20])
        .build();

    let windows = root.discretize_span(2, Boundary::Count(3), false).unwrap();
    assert_eq!(
        rows(windows.to_vec()),
        vec![vec![
            vec![Some(1), Some(10)],
            vec![Some(2), Some(20)],
            vec![Some(3), None]
        ]]
    );
}

#[test]
fn test_span_only_reads_the_first_sources() {
    let root = FlowBuilder::new()
        .with_source(vec![1, 2])
        .with_source(vec![10, 20])
        .with_source(vec![100, 200])
        .build();

    let windows = root.discretize_span(2, Boundary::Count(2), false).unwrap();
    assert_eq!(
        rows(windows.to_vec()),
        vec![vec![vec![Some(1), Some(10)], vec![Some(2), Some(20)]]]
    );
}

#[test]
fn test_spawned_windows_are_flows() {
    let windows = Flow::from_vec(vec![1, 2, 3, 4])
        .discretize(Boundary::Count(2), true)
        .unwrap();

    let sums: Vec<f64> = windows
        .to_vec()
        .into_iter()
        .map(|window| window.into_flow().map(|v| v.unwrap_or(0)).sum())
        .collect();
    assert_eq!(sums, vec![3.0, 7.0]);
}

#[test]
fn test_windows_chain_further_operators() {
    let root = Flow::from_vec(vec![1, 2, 3]);
    root.merge(VecSource::new(vec![10, 20, 30])).unwrap();

    let totals = root
        .discretize_span(2, Boundary::Count(1), false)
        .unwrap()
        .map(|window| {
            window
                .into_vec()
                .into_iter()
                .flatten()
                .flatten()
                .sum::<i32>()
        })
        .to_vec();
    assert_eq!(totals, vec![11, 22, 33]);
}

#[test]
fn test_custom_boundary_predicate() {
    struct Budget {
        spent: i32,
        limit: i32,
    }

    impl BoundaryPredicate<Option<i32>> for Budget {
        fn is_boundary(&mut self, element: &Option<i32>, _len: usize) -> bool {
            self.spent += element.unwrap_or(self.limit);
            self.spent >= self.limit
        }

        fn reset(&mut self) {
            self.spent = 0;
        }
    }

    let windows = Flow::from_vec(vec![4, 5, 6, 1, 2])
        .discretize(Boundary::custom(Budget { spent: 0, limit: 10 }), false)
        .unwrap();
    let contents: Vec<_> = windows.to_vec().into_iter().map(Window::into_vec).collect();

    assert_eq!(
        contents,
        vec![
            vec![Some(4), Some(5), Some(6)],
            vec![Some(1), Some(2), None]
        ]
    );
}

#[test]
fn test_padding_is_capped() {
    let config = FlowConfig {
        max_padding: 3,
        ..FlowConfig::test()
    };
    let root = richflow_core::SourceFlow::with_config(VecSource::new(vec![1]), config);
    let windows = root
        .discretize(Boundary::when(|value: &Option<i32>, _| value.is_some_and(|v| v > 5)), false)
        .unwrap()
        .to_vec();

    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].to_vec(), vec![Some(1), None, None, None]);
}

#[test]
fn test_streaming_reconciliation_waits_for_every_source() {
    let (queue, clock) = TaskQueue::manual();
    let (root, left, right) = streaming_pair::<i32>(queue.clone());
    let windows = root.discretize_span(2, Boundary::Count(2), false).unwrap();
    let recorder: Recorder<Window<Row<i32>>> = Recorder::new();
    windows.start_push(recorder.clone());

    for value in 1..=3 {
        left.send(value);
    }
    right.send(10);

    // one pass is pending however many values arrived
    assert_eq!(queue.pending(), 1);
    clock.advance(Duration::from_millis(9));
    queue.run_due();
    assert!(recorder.is_empty());

    clock.advance(Duration::from_millis(1));
    queue.run_due();
    assert!(recorder.is_empty());

    right.send(20);
    queue.run_due();
    assert_eq!(
        rows(recorder.values()),
        vec![vec![vec![Some(1), Some(10)], vec![Some(2), Some(20)]]]
    );

    windows.stop_push();
    assert_eq!(left.listener_count(), 0);
    assert_eq!(right.listener_count(), 0);
}

#[test]
fn test_stopped_root_ignores_a_pending_pass() {
    let (queue, clock) = TaskQueue::manual();
    let (root, left, right) = streaming_pair::<i32>(queue.clone());
    let windows = root.discretize_span(2, Boundary::Count(1), false).unwrap();
    let recorder: Recorder<Window<Row<i32>>> = Recorder::new();
    windows.start_push(recorder.clone());

    left.send(1);
    right.send(2);
    windows.stop_push();

    clock.advance(Duration::from_secs(1));
    assert_eq!(queue.run_due(), 1);
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_reconciliation_on_the_system_clock() {
    let queue = TaskQueue::system();
    let (root, left, right) = streaming_pair::<i32>(queue.clone());
    let windows = root.discretize_span(2, Boundary::Count(1), false).unwrap();
    let recorder: Recorder<Window<Row<i32>>> = Recorder::new();
    windows.start_push(recorder.clone());

    left.send(1);
    right.send(2);
    assert!(recorder.is_empty());

    queue.drive().await;

    assert_eq!(rows(recorder.values()), vec![vec![vec![Some(1), Some(2)]]]);
    assert!(queue.is_idle());
    windows.stop_push();
}
