#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stagepipe::error::{Error, Result};
use stagepipe::pipeline::context::Context;
use stagepipe::pipeline::map::Mapper;
use stagepipe::pipeline::processor::{Output, SummarizedOutput};
use stagepipe::pipeline::reduce::Reducer;
use stagepipe::record::{Group, Item, Record};
use tokio::sync::mpsc::{self, Receiver};

pub const ERR_TEST_MAPPER: Error = Error::Unit {
    context: "test mapper error",
};
pub const ERR_TEST_REDUCER: Error = Error::Unit {
    context: "test reducer error",
};
pub const ERR_TEST_BROKEN_GENERATOR: Error = Error::Unit {
    context: "test broken generator error",
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    pub group: String,
    pub identifier: String,
}

impl TestRecord {
    pub fn new(group: &str, identifier: &str) -> Self {
        Self {
            group: group.to_owned(),
            identifier: identifier.to_owned(),
        }
    }
}

impl Record for TestRecord {
    fn group(&self) -> Group {
        Group::new(self.group.clone())
    }

    fn identifier(&self) -> String {
        self.identifier.clone()
    }
}

/// Doubles `group1`-prefixed records with suffixed identifiers and closes an
/// extra empty group; errors on `error`-prefixed groups; blocks on
/// `timeout`-prefixed groups until the scope gives up.
pub struct TestMapper;

#[async_trait]
impl Mapper for TestMapper {
    async fn map(&self, ctx: &Context, input: Arc<dyn Record>) -> Result<Vec<Item>> {
        let group = input.group().as_str().to_owned();

        if group.contains("group1") {
            return Ok(vec![
                Item::record(TestRecord::new(
                    &format!("{group}_mapped"),
                    &format!("{}_1", input.identifier()),
                )),
                Item::record(TestRecord::new(
                    &format!("{group}_mapped"),
                    &format!("{}_2", input.identifier()),
                )),
                Item::group_commit(format!("{group}_empty")),
            ]);
        }
        if group.contains("error") {
            return Err(ERR_TEST_MAPPER);
        }
        if group.contains("timeout") {
            tokio::select! {
                _ = ctx.done() => return Err(ctx.err().unwrap_or(Error::Cancelled)),
                _ = tokio::time::sleep(Duration::from_secs(10)) => {}
            }
            return Ok(Vec::new());
        }

        Ok(Vec::new())
    }
}

/// Counts records per group; `error`- and `timeout`-prefixed groups
/// misbehave the same way [`TestMapper`] does.
pub struct TestReducer;

#[async_trait]
impl Reducer for TestReducer {
    async fn reduce(
        &self,
        ctx: &Context,
        group: Group,
        inputs: Vec<Arc<dyn Record>>,
    ) -> Result<Vec<Item>> {
        if group.as_str().contains("error") {
            return Err(ERR_TEST_REDUCER);
        }
        if group.as_str().contains("timeout") {
            tokio::select! {
                _ = ctx.done() => return Err(ctx.err().unwrap_or(Error::Cancelled)),
                _ = tokio::time::sleep(Duration::from_secs(10)) => {}
            }
            return Ok(Vec::new());
        }

        Ok(vec![Item::record(TestRecord::new(
            group.as_str(),
            &inputs.len().to_string(),
        ))])
    }
}

pub struct TestGenerator;

#[async_trait]
impl Mapper for TestGenerator {
    async fn map(&self, _ctx: &Context, _input: Arc<dyn Record>) -> Result<Vec<Item>> {
        Ok(vec![
            Item::record(TestRecord::new("group1", "id1")),
            Item::record(TestRecord::new("error", "id2")),
        ])
    }
}

pub struct TestGeneratorTimeout;

#[async_trait]
impl Mapper for TestGeneratorTimeout {
    async fn map(&self, _ctx: &Context, _input: Arc<dyn Record>) -> Result<Vec<Item>> {
        Ok(vec![
            Item::record(TestRecord::new("group1", "id1")),
            Item::record(TestRecord::new("error", "id2")),
            Item::record(TestRecord::new("timeout", "id3")),
            Item::record(TestRecord::new("group4", "id4")),
        ])
    }
}

pub struct TestBrokenGenerator;

#[async_trait]
impl Mapper for TestBrokenGenerator {
    async fn map(&self, _ctx: &Context, _input: Arc<dyn Record>) -> Result<Vec<Item>> {
        Err(ERR_TEST_BROKEN_GENERATOR)
    }
}

/// Feed `items` into a fresh channel, closing it afterwards.
pub fn feed(items: Vec<Item>) -> Receiver<Item> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        for item in items {
            if tx.send(item).await.is_err() {
                break;
            }
        }
    });
    rx
}

/// Drain a processor's output channel to completion.
pub async fn collect_outputs(mut outputs: Receiver<Output>) -> Vec<Output> {
    let mut collected = Vec::new();
    while let Some(output) = outputs.recv().await {
        collected.push(output);
    }
    collected
}

pub fn summarize_all(outputs: &[Output]) -> Vec<SummarizedOutput> {
    outputs.iter().map(Output::summarized).collect()
}

/// Order-insensitive comparison helper for per-unit summaries.
pub fn sort_summaries(mut summaries: Vec<SummarizedOutput>) -> Vec<SummarizedOutput> {
    summaries.sort_by(|a, b| a.unit.cmp(&b.unit));
    summaries
}

/// Project records to sorted `(group, identifier)` pairs for assertions.
pub fn keys(items: &[Item]) -> Vec<(String, String)> {
    let mut keys: Vec<_> = items
        .iter()
        .map(|item| (item.group().as_str().to_owned(), item.identifier()))
        .collect();
    keys.sort();
    keys
}
