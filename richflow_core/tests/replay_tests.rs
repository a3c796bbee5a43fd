//! Integration tests for replay caching, branching and invalidation

use richflow_core::{Flow, FlowConfig, Order, SourceFlow};
use richflow_test_utils::{CountingSource, FlowBuilder, MutableSource};
use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

#[test]
fn test_second_pass_is_replayed_without_reading_the_source() {
    let source = CountingSource::new(vec![1, 2, 3]);
    let root = Flow::from_source(source.clone());
    let doubled = root.map(|x| x * 2);

    assert_eq!(doubled.count(), 3);
    assert_eq!(source.reads(), 3);

    assert_eq!(doubled.to_vec(), vec![2, 4, 6]);
    assert_eq!(doubled.summarize().count, 3);
    assert_eq!(source.reads(), 3);
}

#[test]
fn test_branches_share_the_recorded_base() {
    let source = CountingSource::new(vec![1, 2, 3, 4]);
    let root = Flow::from_source(source.clone());
    let base = root.map(|x| x * 10);

    let large = base.filter(|x| *x > 20);
    let labels = base.map(|x| format!("#{x}"));

    assert_eq!(large.to_vec(), vec![30, 40]);
    assert_eq!(labels.to_vec(), vec!["#10", "#20", "#30", "#40"]);
    assert_eq!(source.reads(), 4);
    // the base itself is unaffected by its branches
    assert_eq!(base.to_vec(), vec![10, 20, 30, 40]);
}

#[test]
fn test_invalidate_picks_up_changed_sources() {
    let source = MutableSource::new(vec![3, 1, 2]);
    let root = Flow::from_source(source.clone());
    let sorted = root.sort(Order::Asc);

    assert_eq!(sorted.to_vec(), vec![1, 2, 3]);

    source.set(vec![9, 7, 8]);
    assert_eq!(sorted.to_vec(), vec![1, 2, 3]);

    sorted.invalidate();
    assert_eq!(sorted.to_vec(), vec![7, 8, 9]);
}

#[test]
fn test_uncached_root_rereads_every_pass() {
    let source = MutableSource::new(vec![3, 1, 2]);
    let root = SourceFlow::with_config(source.clone(), FlowConfig::uncached());
    let sorted = root.sort(Order::Asc);

    assert_eq!(sorted.to_vec(), vec![1, 2, 3]);
    source.set(vec![5, 4]);
    assert_eq!(sorted.to_vec(), vec![4, 5]);
}

#[test]
fn test_caching_can_be_switched_off_later() {
    let (root, handles) = FlowBuilder::new()
        .with_source(vec![1, 2])
        .with_source(vec![3])
        .build_counting();
    let flow = root.map(|x| x + 1);

    assert_eq!(flow.to_vec(), vec![2, 3, 4]);
    root.set_caching(false);
    flow.invalidate();
    assert_eq!(flow.to_vec(), vec![2, 3, 4]);
    assert_eq!(flow.to_vec(), vec![2, 3, 4]);

    let reads: usize = handles.iter().map(CountingSource::reads).sum();
    assert_eq!(reads, 9);
}

#[test]
fn test_early_stop_does_not_leave_a_partial_recording() {
    let source = CountingSource::new(vec![5, 6, 7]);
    let root = Flow::from_source(source.clone());
    let flow = root.map(|x| x - 5);

    assert_eq!(flow.find_first(), Some(0));
    assert_eq!(source.reads(), 1);

    // a full pass after the early stop starts from the beginning
    assert_eq!(flow.to_vec(), vec![0, 1, 2]);
    assert_eq!(flow.to_vec(), vec![0, 1, 2]);
    assert_eq!(source.reads(), 4);
}

#[test]
fn test_limit_ends_each_pass_and_replays() {
    let source = CountingSource::new(vec![1, 2, 3, 4, 5]);
    let root = Flow::from_source(source.clone());
    let head = root.limit(2).unwrap();

    assert_eq!(head.to_vec(), vec![1, 2]);
    assert_eq!(head.to_vec(), vec![1, 2]);
    assert_eq!(source.reads(), 2);
    // the root was rewound, so a plain pass sees every value
    assert_eq!(root.to_vec(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_partition_by_key() {
    let partitions = Flow::from_vec(vec![1, 2, 3, 4]).partition_by(|x| x % 2).to_vec();

    assert_eq!(partitions.len(), 2);
    assert_eq!(partitions[0].key, 1);
    assert_eq!(partitions[0].values, vec![1, 3]);
    assert_eq!(partitions[1].key, 0);
    assert_eq!(partitions[1].values, vec![2, 4]);
}

#[test]
fn test_describe_lists_the_chain() {
    let root = Flow::from_vec(vec!["a", "b"]);
    let flow = root.skip(1).unwrap().map(|s| s.len());
    assert_eq!(flow.describe(), "Source[1] -> Range -> Map");
}

#[test]
fn test_panicking_closure_leaves_the_chain_rewound() {
    let armed = Rc::new(Cell::new(true));
    let trigger = armed.clone();
    let source = CountingSource::new(vec![1, 2, 3, 4]);
    let flow = Flow::from_source(source.clone())
        .map(move |x| {
            if x == 2 && trigger.replace(false) {
                panic!("transform failed on {x}");
            }
            x * 10
        })
        .filter(|x| *x > 0);

    let failed = catch_unwind(AssertUnwindSafe(|| flow.to_vec()));
    assert!(failed.is_err());
    assert!(!armed.get());

    // the retry starts from the first value and records a clean replay
    assert_eq!(flow.to_vec(), vec![10, 20, 30, 40]);
    assert_eq!(flow.to_vec(), vec![10, 20, 30, 40]);
    assert_eq!(source.reads(), 2 + 4);
}

#[test]
fn test_panicking_reducer_leaves_the_chain_rewound() {
    let flow = Flow::from_vec(vec![1, 2, 3]).map(|x| x + 1);

    let failed = catch_unwind(AssertUnwindSafe(|| {
        flow.reduce(0, |sum, x| {
            if x == 3 {
                panic!("reducer failed");
            }
            sum + x
        })
    }));
    assert!(failed.is_err());

    assert_eq!(flow.reduce(0, |sum, x| sum + x), 9);
    assert_eq!(flow.to_vec(), vec![2, 3, 4]);
}
