use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::Sender;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::pipeline::context::Context;
use crate::pipeline::processor::Output;
use crate::record::Item;

/// Unit-execution policy shared by the map and reduce processors: an
/// optional parallelism cap, a pre-run context check, and the gate that
/// escalates the first unit error into a pipeline abort.
pub(crate) struct WorkerPool {
    ctx: Context,
    limit: Option<Arc<Semaphore>>,
    tasks: JoinSet<()>,
    outputs: Sender<Output>,
    abort: Sender<Error>,
    abort_if_any_error: bool,
    aborted: Arc<AtomicBool>,
}

impl WorkerPool {
    pub(crate) fn new(
        ctx: &Context,
        max_parallel: usize,
        outputs: Sender<Output>,
        abort: Sender<Error>,
        abort_if_any_error: bool,
    ) -> Self {
        let limit = (max_parallel > 0).then(|| Arc::new(Semaphore::new(max_parallel)));
        Self {
            ctx: ctx.child(),
            limit,
            tasks: JoinSet::new(),
            outputs,
            abort,
            abort_if_any_error,
            aborted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run one unit. Blocks while the cap is saturated, so a stage reading
    /// its input channel throttles exactly like the channel handoff itself.
    pub(crate) async fn dispatch<F, Fut>(&mut self, unit: String, work: F)
    where
        F: FnOnce(Context) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<Item>>> + Send + 'static,
    {
        let permit = match &self.limit {
            Some(semaphore) => match Arc::clone(semaphore).acquire_owned().await {
                Ok(permit) => Some(permit),
                // The semaphore is never closed while the pool is alive.
                Err(_) => return,
            },
            None => None,
        };

        let ctx = self.ctx.clone();
        let outputs = self.outputs.clone();
        let abort = self.abort.clone();
        let abort_if_any_error = self.abort_if_any_error;
        let aborted = Arc::clone(&self.aborted);

        self.tasks.spawn(async move {
            let _permit = permit;

            // Units arriving after cancellation are drained and failed fast
            // with the scope's error.
            let result = match ctx.err() {
                Some(err) => Err(err),
                None => work(ctx.clone()).await,
            };

            match result {
                Ok(records) => {
                    let _ = outputs.send(Output::success(unit, records)).await;
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::event!(
                        tracing::Level::WARN,
                        event = "stagepipe.unit.failed",
                        unit = %unit,
                        error = %err,
                        "stagepipe.unit.failed"
                    );

                    let _ = outputs.send(Output::error(unit, err.clone())).await;

                    if abort_if_any_error && !aborted.swap(true, Ordering::SeqCst) {
                        #[cfg(feature = "tracing")]
                        tracing::event!(
                            tracing::Level::ERROR,
                            event = "stagepipe.abort.raised",
                            error = %err,
                            "stagepipe.abort.raised"
                        );
                        let _ = abort.send(err).await;
                        ctx.cancel();
                    }
                }
            }
        });
    }

    /// Wait for every dispatched unit. Dropping the pool afterwards releases
    /// the stage's output sender.
    pub(crate) async fn join(mut self) {
        while let Some(result) = self.tasks.join_next().await {
            #[cfg(feature = "tracing")]
            if let Err(join_err) = result {
                tracing::event!(
                    tracing::Level::WARN,
                    event = "stagepipe.unit.panicked",
                    error = %join_err,
                    "stagepipe.unit.panicked"
                );
            }
            #[cfg(not(feature = "tracing"))]
            let _ = result;
        }
    }
}
