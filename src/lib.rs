//! # stagepipe
//!
//! **Staged map/reduce record pipelines in Rust.**
//!
//! `stagepipe` composes a linear sequence of user-supplied map and reduce
//! stages into one concurrent execution: typed records stream from stage to
//! stage through bounded channels, each stage runs its work units in
//! parallel under an optional cap, and the run ends with a per-stage report
//! of what succeeded and what failed.
//!
//! It is built for batch jobs that want pipeline structure without a
//! framework:
//!
//! - streaming handoff between stages, with real backpressure
//! - per-unit failure isolation, or first-error abort when you ask for it
//! - per-stage timeouts and whole-pipeline cancellation
//! - group-wise reduction with explicit group-closure markers
//!
//! ---
//!
//! ## Core Model
//!
//! A pipeline is a chain of stages:
//!
//! ```text
//! Origin → Map → Map → Reduce
//! ```
//!
//! Map stages implement [`Mapper`] and run once per input record. Reduce
//! stages implement [`Reducer`]: records are buffered by group key and the
//! reducer runs once per group. A [`Item::group_commit`] marker closes a
//! group early, which also lets a reducer observe groups that never saw a
//! record.
//!
//! The first stage is fed a single seed record with wildcard group and
//! identifier (`"*"`); generators simply ignore their input.
//!
//! ---
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use stagepipe::error::Result;
//! use stagepipe::pipeline::context::Context;
//! use stagepipe::pipeline::driver::Pipeline;
//! use stagepipe::pipeline::map::Mapper;
//! use stagepipe::pipeline::reduce::Reducer;
//! use stagepipe::pipeline::stage::PipelineStage;
//! use stagepipe::record::{Group, Item, Record};
//!
//! struct Line {
//!     file: String,
//!     number: usize,
//! }
//!
//! impl Record for Line {
//!     fn group(&self) -> Group {
//!         Group::new(self.file.clone())
//!     }
//!
//!     fn identifier(&self) -> String {
//!         self.number.to_string()
//!     }
//! }
//!
//! struct LoadLines;
//!
//! #[async_trait]
//! impl Mapper for LoadLines {
//!     async fn map(&self, _ctx: &Context, _input: Arc<dyn Record>) -> Result<Vec<Item>> {
//!         Ok(vec![
//!             Item::record(Line { file: "a.txt".into(), number: 1 }),
//!             Item::record(Line { file: "a.txt".into(), number: 2 }),
//!             Item::record(Line { file: "b.txt".into(), number: 1 }),
//!         ])
//!     }
//! }
//!
//! struct CountLines;
//!
//! #[async_trait]
//! impl Reducer for CountLines {
//!     async fn reduce(
//!         &self,
//!         _ctx: &Context,
//!         group: Group,
//!         inputs: Vec<Arc<dyn Record>>,
//!     ) -> Result<Vec<Item>> {
//!         Ok(vec![Item::record(Line {
//!             file: group.as_str().to_owned(),
//!             number: inputs.len(),
//!         })])
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let pipeline = Pipeline::new(vec![
//!         PipelineStage::map("load", LoadLines),
//!         PipelineStage::reduce("count", CountLines).max_parallel(4),
//!     ]);
//!
//!     let report = pipeline.execute(&Context::background()).await?;
//!     for item in &report.outputs {
//!         println!("{}", item.key());
//!     }
//!     for stage in &report.stages {
//!         println!("{} ({}): {} units", stage.name, stage.kind, stage.outputs.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ---
//!
//! ## Error Handling Contract
//!
//! - A mapper/reducer error is confined to its work unit: the unit is
//!   reported as an Error output and the rest of the stage keeps going.
//! - With [`PipelineStage::abort_if_any_error`], the stage's first unit
//!   error additionally cancels the whole run and
//!   [`Pipeline::execute`] returns that error.
//! - Cancellation and expired deadlines fail in-flight units with
//!   [`Error::Cancelled`] / [`Error::DeadlineExceeded`]; still-arriving
//!   units are drained and failed fast. Neither aborts the run by itself.
//!
//! Errors are never swallowed: every failed unit carries its error in the
//! execution report.
//!
//! ---
//!
//! ## Cancellation
//!
//! Execution is scoped by a [`Context`]. Cancel it to stop the run, or
//! derive a deadline for a single stage with
//! [`PipelineStage::timeout`]:
//!
//! ```no_run
//! # use stagepipe::pipeline::context::Context;
//! let ctx = Context::background().child_with_timeout(std::time::Duration::from_secs(30));
//! // pipeline.execute(&ctx).await?;
//! ```
//!
//! ---
//!
//! ## Observability
//!
//! Enable tracing instrumentation with the default `tracing` feature.
//! `stagepipe` emits a span per running stage plus structured events such as
//! `stagepipe.unit.failed`, `stagepipe.abort.raised` and
//! `stagepipe.unit.panicked`.
//!
//! ---
//!
//! ## Feature Flags
//!
//! - `tracing` *(default)*: spans and events for stage and unit lifecycle.
//! - `serde`: `Serialize` impls for the report types
//!   ([`SummarizedOutput`], [`StageExecution`] and friends).
//!
//! [`Mapper`]: pipeline::map::Mapper
//! [`Reducer`]: pipeline::reduce::Reducer
//! [`Context`]: pipeline::context::Context
//! [`Item::group_commit`]: record::Item::group_commit
//! [`PipelineStage::abort_if_any_error`]: pipeline::stage::PipelineStage::abort_if_any_error
//! [`PipelineStage::timeout`]: pipeline::stage::PipelineStage::timeout
//! [`Pipeline::execute`]: pipeline::driver::Pipeline::execute
//! [`Error::Cancelled`]: error::Error::Cancelled
//! [`Error::DeadlineExceeded`]: error::Error::DeadlineExceeded
//! [`SummarizedOutput`]: pipeline::processor::SummarizedOutput
//! [`StageExecution`]: pipeline::stage::StageExecution

pub mod error;
pub mod pipeline;
pub mod record;

pub mod prelude {
    //! Convenient imports for most `stagepipe` users.

    pub use crate::error::{Error, Result};
    pub use crate::pipeline::context::Context;
    pub use crate::pipeline::driver::{ExecutionReport, Pipeline};
    pub use crate::pipeline::map::Mapper;
    pub use crate::pipeline::processor::{Output, OutputStatus, ProcessorType, SummarizedOutput};
    pub use crate::pipeline::reduce::Reducer;
    pub use crate::pipeline::stage::{PipelineStage, StageExecution};
    pub use crate::record::{record_key, Group, Item, Record};
}
