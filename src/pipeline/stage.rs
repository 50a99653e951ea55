use std::time::Duration;

use crate::pipeline::map::{MapProcessor, Mapper};
use crate::pipeline::processor::{Processor, ProcessorType, SummarizedOutput};
use crate::pipeline::reduce::{ReduceProcessor, Reducer};

/// One processor plus its execution options.
pub struct PipelineStage {
    pub(crate) processor: Box<dyn Processor>,
    pub(crate) timeout: Option<Duration>,
}

impl PipelineStage {
    /// Wrap an arbitrary processor.
    pub fn new(processor: impl Processor + 'static) -> Self {
        Self {
            processor: Box::new(processor),
            timeout: None,
        }
    }

    /// Stage running `mapper` over each input record.
    pub fn map(name: impl Into<String>, mapper: impl Mapper + 'static) -> Self {
        Self::new(MapProcessor::new(name, mapper))
    }

    /// Stage reducing buffered records group by group.
    pub fn reduce(name: impl Into<String>, reducer: impl Reducer + 'static) -> Self {
        Self::new(ReduceProcessor::new(name, reducer))
    }

    /// Deadline for this stage alone. In-flight and still-arriving units
    /// fail with [`Error::DeadlineExceeded`] once it expires; other stages
    /// are unaffected.
    ///
    /// [`Error::DeadlineExceeded`]: crate::error::Error::DeadlineExceeded
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cap the stage's concurrent work units. Zero removes the cap.
    pub fn max_parallel(mut self, max: usize) -> Self {
        self.processor.set_max_parallel(max);
        self
    }

    /// Escalate this stage's first unit error into a pipeline-wide abort.
    pub fn abort_if_any_error(mut self, value: bool) -> Self {
        self.processor.set_abort_if_any_error(value);
        self
    }
}

/// What one stage did during an execution, unit by unit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StageExecution {
    pub name: String,
    pub kind: ProcessorType,
    pub outputs: Vec<SummarizedOutput>,
}
