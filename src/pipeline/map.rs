use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::error::{Error, Result};
use crate::pipeline::context::Context;
use crate::pipeline::processor::{Output, Processor, ProcessorType};
use crate::pipeline::worker::WorkerPool;
use crate::record::{record_key, Item, Record};

/// One input record in, any number of records out.
///
/// A mapper that blocks should watch `ctx` and return its error when the
/// scope finishes, so deadlines and aborts propagate promptly.
#[async_trait]
pub trait Mapper: Send + Sync {
    async fn map(&self, ctx: &Context, input: Arc<dyn Record>) -> Result<Vec<Item>>;
}

/// Runs a [`Mapper`] concurrently over every record the stage receives.
pub struct MapProcessor {
    name: String,
    mapper: Arc<dyn Mapper>,
    max_parallel: usize,
    abort_if_any_error: bool,
}

impl MapProcessor {
    pub fn new(name: impl Into<String>, mapper: impl Mapper + 'static) -> Self {
        Self {
            name: name.into(),
            mapper: Arc::new(mapper),
            max_parallel: 0,
            abort_if_any_error: false,
        }
    }
}

impl Processor for MapProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn processor_type(&self) -> ProcessorType {
        ProcessorType::Map
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
        let mapper = Arc::clone(&self.mapper);
        let mut pool = WorkerPool::new(&ctx, self.max_parallel, tx, abort, self.abort_if_any_error);

        tokio::spawn(async move {
            while let Some(item) = inputs.recv().await {
                // Group commits are a reduce-side signal; map stages drop
                // them without emitting an output.
                let record = match item {
                    Item::Record(record) => record,
                    Item::GroupCommit(_) => continue,
                };

                let unit = record_key(record.as_ref());
                let mapper = Arc::clone(&mapper);
                pool.dispatch(unit, move |ctx| async move { mapper.map(&ctx, record).await })
                    .await;
            }

            pool.join().await;
        });

        rx
    }
}
