use stagepipe::pipeline::processor::{Output, OutputStatus, SummarizedOutput};
use stagepipe::record::Item;

mod common;
use common::{TestRecord, ERR_TEST_MAPPER};

#[test]
fn summarized_counts_records_and_groups() {
    let output = Output {
        unit: "unit".to_owned(),
        status: OutputStatus::Error,
        records: vec![
            Item::record(TestRecord::new("group1", "id1")),
            // Commits count towards groups but not towards records.
            Item::group_commit("group2"),
        ],
        err: Some(ERR_TEST_MAPPER),
    };

    assert_eq!(
        output.summarized(),
        SummarizedOutput {
            unit: "unit".to_owned(),
            status: OutputStatus::Error,
            record_count: 1,
            group_count: 2,
            err: Some(ERR_TEST_MAPPER),
        }
    );
}

#[test]
fn summarized_dedupes_group_keys() {
    let output = Output {
        unit: "unit".to_owned(),
        status: OutputStatus::Success,
        records: vec![
            Item::record(TestRecord::new("group1", "id1")),
            Item::record(TestRecord::new("group1", "id2")),
            Item::group_commit("group1"),
        ],
        err: None,
    };

    let summary = output.summarized();
    assert_eq!(summary.record_count, 2);
    assert_eq!(summary.group_count, 1);
}
