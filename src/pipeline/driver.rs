use std::mem;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::pipeline::context::Context;
use crate::pipeline::stage::{PipelineStage, StageExecution};
use crate::record::{Item, OriginInput};

/// A linear chain of stages executed as one concurrent run.
///
/// The pipeline itself holds no execution state: [`execute`](Pipeline::execute)
/// wires fresh channels every call, so one value can drive any number of
/// runs.
pub struct Pipeline {
    stages: Vec<PipelineStage>,
    buffer: usize,
}

/// Everything a completed run produced: the terminal stage's records and one
/// [`StageExecution`] per stage, in pipeline order.
#[derive(Debug)]
pub struct ExecutionReport {
    pub outputs: Vec<Item>,
    pub stages: Vec<StageExecution>,
}

impl Pipeline {
    pub fn new(stages: Vec<PipelineStage>) -> Self {
        Self { stages, buffer: 1 }
    }

    /// Capacity of the inter-stage record channels.
    ///
    /// The default of 1 keeps the rendezvous handoff where a slow downstream
    /// throttles its upstream; larger values trade memory for looser
    /// coupling.
    pub fn buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Run every stage concurrently, streaming records down the chain.
    ///
    /// Each stage reads the previous stage's records, and the terminal
    /// stage's records become [`ExecutionReport::outputs`]. When a stage
    /// with [`abort_if_any_error`](PipelineStage::abort_if_any_error) fails,
    /// the first such error is returned instead and the report is discarded.
    /// Cancellation of `ctx` and per-stage timeouts do not abort the run;
    /// affected units surface as Error entries in the report.
    pub async fn execute(&self, ctx: &Context) -> Result<ExecutionReport> {
        let pipeline_ctx = ctx.child();

        // Single-shot abort signal: the first error wins, later senders
        // drain into the supervisor so no stage ever blocks on the write.
        let (abort_tx, mut abort_rx) = mpsc::channel::<Error>(1);
        let supervisor: JoinHandle<Option<Error>> = {
            let ctx = pipeline_ctx.clone();
            tokio::spawn(async move {
                let first = abort_rx.recv().await;
                if first.is_some() {
                    ctx.cancel();
                }
                while abort_rx.recv().await.is_some() {}
                first
            })
        };

        // Head channel: one origin record, then closed.
        let (origin_tx, mut next_rx) = mpsc::channel::<Item>(self.buffer);
        tokio::spawn(async move {
            let _ = origin_tx.send(Item::Record(Arc::new(OriginInput))).await;
        });

        let mut drains = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let stage_ctx = match stage.timeout {
                Some(timeout) => pipeline_ctx.child_with_timeout(timeout),
                None => pipeline_ctx.clone(),
            };

            let (tx, rx) = mpsc::channel::<Item>(self.buffer);
            let inputs = mem::replace(&mut next_rx, rx);
            let mut outputs = stage.processor.process(stage_ctx, inputs, abort_tx.clone());

            let name = stage.processor.name().to_owned();
            let kind = stage.processor.processor_type();

            #[cfg(feature = "tracing")]
            let span = tracing::info_span!("stagepipe.stage", stage = %name, kind = %kind);

            let drain = async move {
                let mut summaries = Vec::new();
                while let Some(output) = outputs.recv().await {
                    let summary = output.summarized();
                    for record in output.records {
                        // The downstream reader outlives every producer; a
                        // failed send means the run is being torn down.
                        if tx.send(record).await.is_err() {
                            break;
                        }
                    }
                    summaries.push(summary);
                }
                StageExecution {
                    name,
                    kind,
                    outputs: summaries,
                }
            };

            #[cfg(feature = "tracing")]
            let handle = {
                use tracing::Instrument;
                tokio::spawn(drain.instrument(span))
            };
            #[cfg(not(feature = "tracing"))]
            let handle = tokio::spawn(drain);

            drains.push(handle);
        }
        drop(abort_tx);

        let mut outputs = Vec::new();
        while let Some(item) = next_rx.recv().await {
            outputs.push(item);
        }

        // The terminal channel closing means every stage has finished;
        // release the context watchers before assembling the report.
        pipeline_ctx.cancel();

        let mut stages = Vec::with_capacity(drains.len());
        for drain in drains {
            stages.push(drain.await.map_err(|_| Error::Panicked)?);
        }

        let abort_err = supervisor.await.map_err(|_| Error::Panicked)?;
        if let Some(err) = abort_err {
            return Err(err);
        }

        Ok(ExecutionReport { outputs, stages })
    }
}
