use std::time::Duration;

use stagepipe::error::Error;
use stagepipe::pipeline::context::Context;
use stagepipe::pipeline::processor::{OutputStatus, Processor};
use stagepipe::pipeline::reduce::ReduceProcessor;
use stagepipe::record::Item;
use tokio::sync::mpsc;

mod common;
use common::{
    collect_outputs, feed, keys, sort_summaries, summarize_all, TestRecord, TestReducer,
    ERR_TEST_REDUCER,
};

#[tokio::test]
async fn commits_close_groups_and_late_records_are_dropped() {
    let processor = ReduceProcessor::new("test", TestReducer);
    let inputs = feed(vec![
        Item::record(TestRecord::new("group1", "id1")),
        Item::record(TestRecord::new("group1", "id2")),
        Item::group_commit("group1"),
        // Uncommitted groups still reduce at end-of-input.
        Item::record(TestRecord::new("group2", "id3")),
        Item::record(TestRecord::new("error", "id4")),
        Item::group_commit("group3"),
        // A second commit for the same group is ignored.
        Item::group_commit("group3"),
        // Arrived after group1's commit, excluded from its reduction.
        Item::record(TestRecord::new("group1", "id5")),
    ]);
    let (abort_tx, _abort_rx) = mpsc::channel(8);

    let outputs = collect_outputs(processor.process(Context::background(), inputs, abort_tx)).await;

    assert_eq!(outputs.len(), 4);

    let failed = outputs.iter().find(|o| o.unit == "error").expect("error");
    assert_eq!(failed.status, OutputStatus::Error);
    assert_eq!(failed.err, Some(ERR_TEST_REDUCER));

    let group1 = outputs.iter().find(|o| o.unit == "group1").expect("group1");
    assert_eq!(
        keys(&group1.records),
        vec![("group1".to_owned(), "2".to_owned())]
    );

    let group2 = outputs.iter().find(|o| o.unit == "group2").expect("group2");
    assert_eq!(
        keys(&group2.records),
        vec![("group2".to_owned(), "1".to_owned())]
    );

    let group3 = outputs.iter().find(|o| o.unit == "group3").expect("group3");
    assert_eq!(
        keys(&group3.records),
        vec![("group3".to_owned(), "0".to_owned())]
    );
}

#[tokio::test]
async fn deadline_fails_every_group() {
    let mut processor = ReduceProcessor::new("test", TestReducer);
    processor.set_max_parallel(1);

    let ctx = Context::background().child_with_timeout(Duration::from_millis(100));
    let inputs = feed(vec![
        Item::record(TestRecord::new("timeout1", "id1")),
        Item::record(TestRecord::new("timeout2", "id2")),
    ]);
    let (abort_tx, _abort_rx) = mpsc::channel(4);

    let outputs = collect_outputs(processor.process(ctx, inputs, abort_tx)).await;
    let summaries = sort_summaries(summarize_all(&outputs));

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].unit, "timeout1");
    assert_eq!(summaries[0].err, Some(Error::DeadlineExceeded));
    assert_eq!(summaries[1].unit, "timeout2");
    assert_eq!(summaries[1].err, Some(Error::DeadlineExceeded));
}

#[tokio::test]
async fn abort_forwards_the_first_error() {
    let mut processor = ReduceProcessor::new("test", TestReducer);
    processor.set_abort_if_any_error(true);

    let inputs = feed(vec![
        Item::record(TestRecord::new("group1", "id1")),
        Item::record(TestRecord::new("group2", "id2")),
        Item::record(TestRecord::new("error", "id3")),
    ]);
    let (abort_tx, mut abort_rx) = mpsc::channel(4);

    let outputs = collect_outputs(processor.process(Context::background(), inputs, abort_tx)).await;

    assert_eq!(abort_rx.recv().await, Some(ERR_TEST_REDUCER));
    assert!(outputs
        .iter()
        .any(|o| o.unit == "error" && o.err == Some(ERR_TEST_REDUCER)));
}
