//! Integration tests for push evaluation, streamers and out-flows

use richflow_core::{Boundary, Flow, Partition, Streamer, StreamerSource, Window};
use richflow_test_utils::Recorder;
use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

#[test]
fn test_finite_push_through_a_chain() {
    let flow = Flow::from_vec(vec![1, 2, 3, 4, 5])
        .filter(|x| x % 2 == 1)
        .map(|x| x * 10);
    let recorder = Recorder::new();

    flow.start_push(recorder.clone());

    assert_eq!(recorder.values(), vec![10, 30, 50]);
    assert!(recorder.is_finished());
    assert!(!flow.is_listening());
}

#[test]
fn test_sink_break_ends_the_run() {
    let flow = Flow::from_vec(vec![1, 2, 3, 4]).map(|x| x);
    let recorder = Recorder::stop_after(2);

    flow.start_push(recorder.clone());

    assert_eq!(recorder.values(), vec![1, 2]);
    assert_eq!(recorder.finish_count(), 1);
}

#[test]
fn test_push_variants_of_stateful_stages() {
    let root = Flow::from_vec(vec![3, 1, 2, 4]);

    let limited = Recorder::new();
    root.limit(2).unwrap().start_push(limited.clone());
    assert_eq!(limited.values(), vec![3, 1]);

    // order-by passes values through in push mode
    let ordered = Recorder::new();
    root.order_by_key(|x| *x).start_push(ordered.clone());
    assert_eq!(ordered.values(), vec![3, 1, 2, 4]);

    let latched = Recorder::new();
    root.take_until(|x| *x == 2).start_push(latched.clone());
    assert_eq!(latched.values(), vec![3, 1, 2]);

    let partitions: Recorder<Partition<i32, i32>> = Recorder::new();
    root.partition_by(|x| x % 2).start_push(partitions.clone());
    let singletons: Vec<_> = partitions
        .values()
        .into_iter()
        .map(|p| (p.key, p.values))
        .collect();
    assert_eq!(
        singletons,
        vec![(1, vec![3]), (1, vec![1]), (0, vec![2]), (0, vec![4])]
    );
}

#[test]
fn test_stage_windows_flush_on_finish() {
    let windows = Flow::from_vec(vec![1, 2, 3])
        .map(|x| x)
        .discretize(Boundary::Count(2), false)
        .unwrap();
    let recorder: Recorder<Window<Option<i32>>> = Recorder::new();

    windows.start_push(recorder.clone());

    let contents: Vec<_> = recorder.values().into_iter().map(Window::into_vec).collect();
    assert_eq!(contents, vec![vec![Some(1), Some(2)], vec![Some(3), None]]);
}

#[test]
fn test_streaming_push_until_stopped() {
    let source = Streamer::new();
    let root = Flow::from_streamer(&source);
    let flow = root.map(|x| x + 1);
    let recorder = Recorder::new();

    flow.start_push(recorder.clone());
    assert!(flow.is_listening());
    assert_eq!(source.listener_count(), 1);

    source.send(1);
    source.send(2);
    assert_eq!(recorder.values(), vec![2, 3]);

    flow.stop_push();
    source.send(3);
    assert_eq!(recorder.values(), vec![2, 3]);
    assert_eq!(source.listener_count(), 0);
    assert!(!recorder.is_finished());
}

#[test]
fn test_restarting_replaces_the_previous_path() {
    let source = Streamer::new();
    let root = Flow::from_streamer(&source);
    let first = Recorder::new();
    let second = Recorder::new();

    root.map(|x| x * 2).start_push(first.clone());
    root.map(|x| x * 3).start_push(second.clone());
    source.send(1);

    assert!(first.is_empty());
    assert_eq!(second.values(), vec![3]);
    assert_eq!(source.listener_count(), 1);
    root.stop_push();
}

#[test]
fn test_out_flow_tags_values_with_its_key() {
    let received = Rc::new(RefCell::new(Vec::new()));
    let log = received.clone();
    let target = Streamer::new().with_receiver(move |value: i32, key: &str| {
        log.borrow_mut().push((value, key.to_string()));
    });

    let out = Flow::from_vec(vec![1, 2]).map(|x| x * 2).push_into(&target);
    out.start();

    let key = out.key().to_string();
    assert_eq!(*received.borrow(), vec![(2, key.clone()), (4, key)]);
    assert!(!out.is_listening());
}

#[test]
fn test_chained_streaming_roots() {
    let input = Streamer::new();
    let middle = Streamer::relaying();
    let out = Flow::from_streamer(&input)
        .map(|x: i32| x + 1)
        .push_into(&middle);
    let downstream = Flow::from_streamer(&middle).map(|x| x * 10);
    let recorder = Recorder::new();

    downstream.start_push(recorder.clone());
    out.start();
    input.send(1);
    input.send(2);

    assert_eq!(recorder.values(), vec![20, 30]);
    out.stop();
    downstream.stop_push();
}

#[test]
fn test_feedback_through_a_relay_is_queued_in_order() {
    let relay = Streamer::relaying();
    let root = Flow::from_streamer(&relay);
    let flow = root.map(|x: i32| x);
    let order = Rc::new(RefCell::new(Vec::new()));

    let log = order.clone();
    let feedback = relay.clone();
    flow.start_push_with(move |value: i32| {
        log.borrow_mut().push(value);
        if value < 10 {
            feedback.push(value + 10, "feedback");
        }
        log.borrow_mut().push(-value);
    });

    relay.send(1);
    assert_eq!(*order.borrow(), vec![1, -1, 11, -11]);
    flow.stop_push();
}

#[test]
fn test_recording_streamer_supports_pull() {
    let streamer = Streamer::recording();
    streamer.send("a".to_string());
    streamer.send("b".to_string());

    let flow = Flow::from_source(StreamerSource::new(streamer.clone()));
    assert_eq!(flow.join(), "a,b");

    streamer.send("c".to_string());
    assert_eq!(flow.count(), 3);
}

#[test]
fn test_panicking_sink_leaves_the_root_stopped_and_rewound() {
    let flow = Flow::from_vec(vec![1, 2, 3]).map(|x| x * 2);
    let armed = Rc::new(Cell::new(true));
    let trigger = armed.clone();

    let failed = catch_unwind(AssertUnwindSafe(|| {
        flow.start_push_with(move |x: i32| {
            if x == 4 && trigger.replace(false) {
                panic!("sink failed on {x}");
            }
        })
    }));
    assert!(failed.is_err());
    assert!(!flow.is_listening());

    let recorder = Recorder::new();
    flow.start_push(recorder.clone());
    assert_eq!(recorder.values(), vec![2, 4, 6]);
    assert!(recorder.is_finished());
    assert_eq!(flow.to_vec(), vec![2, 4, 6]);
}

#[test]
fn test_empty_range_pushes_nothing() {
    let flow = Flow::from_vec(vec![10, 20, 30]).range(1, 1).unwrap();
    let recorder = Recorder::new();

    flow.start_push(recorder.clone());

    assert!(recorder.is_empty());
    assert!(recorder.is_finished());
    assert!(flow.to_vec().is_empty());
}
