use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::error::{Error, Result};
use crate::pipeline::context::Context;
use crate::pipeline::processor::{Output, Processor, ProcessorType};
use crate::pipeline::worker::WorkerPool;
use crate::record::{Group, Item, Record};

/// A committed group's records in, any number of records out.
///
/// `inputs` holds every user record whose group key matched, in arrival
/// order; it is empty when the group was closed by a commit alone.
#[async_trait]
pub trait Reducer: Send + Sync {
    async fn reduce(
        &self,
        ctx: &Context,
        group: Group,
        inputs: Vec<Arc<dyn Record>>,
    ) -> Result<Vec<Item>>;
}

/// Buffers records by group key and runs a [`Reducer`] once per group.
///
/// A [`Item::GroupCommit`] closes its group on arrival: the buffered records
/// are detached into a pending work unit and the group refuses further
/// input, so a second commit is a no-op and records arriving after the
/// commit are dropped. Groups never committed become work units when the
/// input channel closes. Units start executing once the stage has consumed
/// its whole input.
pub struct ReduceProcessor {
    name: String,
    reducer: Arc<dyn Reducer>,
    max_parallel: usize,
    abort_if_any_error: bool,
}

struct GroupEntry {
    group: Group,
    done: bool,
    records: Vec<Arc<dyn Record>>,
}

impl GroupEntry {
    fn new(group: Group) -> Self {
        Self {
            group,
            done: false,
            records: Vec::new(),
        }
    }
}

impl ReduceProcessor {
    pub fn new(name: impl Into<String>, reducer: impl Reducer + 'static) -> Self {
        Self {
            name: name.into(),
            reducer: Arc::new(reducer),
            max_parallel: 0,
            abort_if_any_error: false,
        }
    }
}

impl Processor for ReduceProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn processor_type(&self) -> ProcessorType {
        ProcessorType::Reduce
    }

    fn set_max_parallel(&mut self, max: usize) {
        self.max_parallel = max;
    }

    fn set_abort_if_any_error(&mut self, value: bool) {
        self.abort_if_any_error = value;
    }

    fn process(
        &self,
        ctx: Context,
        mut inputs: Receiver<Item>,
        abort: Sender<Error>,
    ) -> Receiver<Output> {
        let (tx, rx) = mpsc::channel(1);
        let reducer = Arc::clone(&self.reducer);
        let mut pool = WorkerPool::new(&ctx, self.max_parallel, tx, abort, self.abort_if_any_error);

        tokio::spawn(async move {
            let mut entries: HashMap<String, GroupEntry> = HashMap::new();
            // Committed groups keep their commit order; the rest follow at
            // end-of-input in no particular order.
            let mut ready: Vec<(Group, Vec<Arc<dyn Record>>)> = Vec::new();

            while let Some(item) = inputs.recv().await {
                match item {
                    Item::GroupCommit(group) => {
                        let entry = entries
                            .entry(group.as_str().to_owned())
                            .or_insert_with(|| GroupEntry::new(group));
                        // A repeated commit must not spawn a second reduce.
                        if entry.done {
                            continue;
                        }
                        entry.done = true;
                        ready.push((entry.group.clone(), mem::take(&mut entry.records)));
                    }
                    Item::Record(record) => {
                        let entry = entries
                            .entry(record.group().as_str().to_owned())
                            .or_insert_with(|| GroupEntry::new(record.group()));
                        // Records arriving after their group's commit are
                        // dropped; the entry stays so the group cannot be
                        // resurrected.
                        if entry.done {
                            continue;
                        }
                        entry.records.push(record);
                    }
                }
            }

            for (_, entry) in entries {
                if !entry.done {
                    ready.push((entry.group, entry.records));
                }
            }

            for (group, records) in ready {
                let reducer = Arc::clone(&reducer);
                let unit = group.as_str().to_owned();
                pool.dispatch(unit, move |ctx| async move {
                    reducer.reduce(&ctx, group, records).await
                })
                .await;
            }

            pool.join().await;
        });

        rx
    }
}
