use std::collections::HashSet;
use std::fmt;

use tokio::sync::mpsc::{Receiver, Sender};

use crate::error::Error;
use crate::pipeline::context::Context;
use crate::record::{Group, Item};

/// Engine-internal executor behind a stage.
///
/// `process` takes ownership of the stage's input channel and returns the
/// channel its per-unit outputs arrive on. The output channel closes exactly
/// once, after every unit has reported.
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;
    fn processor_type(&self) -> ProcessorType;

    fn process(
        &self,
        ctx: Context,
        inputs: Receiver<Item>,
        abort: Sender<Error>,
    ) -> Receiver<Output>;

    /// Cap concurrent work units; zero removes the cap.
    fn set_max_parallel(&mut self, max: usize);

    /// Escalate the stage's first unit error into a pipeline-wide abort.
    fn set_abort_if_any_error(&mut self, value: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ProcessorType {
    Map,
    Reduce,
}

impl fmt::Display for ProcessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Map => "Map",
            Self::Reduce => "Reduce",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum OutputStatus {
    Success,
    Error,
}

impl fmt::Display for OutputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "Success",
            Self::Error => "Error",
        })
    }
}

/// Result of one work unit: an input record for map stages, a committed
/// group for reduce stages.
#[derive(Debug, Clone)]
pub struct Output {
    /// Record key (map) or group key (reduce) of the unit.
    pub unit: String,
    pub status: OutputStatus,
    /// Records handed to the next stage. Empty when the unit failed.
    pub records: Vec<Item>,
    pub err: Option<Error>,
}

impl Output {
    pub(crate) fn success(unit: String, records: Vec<Item>) -> Self {
        Self {
            unit,
            status: OutputStatus::Success,
            records,
            err: None,
        }
    }

    pub(crate) fn error(unit: String, err: Error) -> Self {
        Self {
            unit,
            status: OutputStatus::Error,
            records: Vec::new(),
            err: Some(err),
        }
    }

    /// Compact the output into per-unit counts for the execution report.
    ///
    /// `record_count` counts what a downstream mapper would actually see, so
    /// group commits are excluded; `group_count` counts distinct group keys
    /// across everything produced, commits included.
    pub fn summarized(&self) -> SummarizedOutput {
        let mut groups: HashSet<Group> = HashSet::new();
        let mut record_count = 0;
        for item in &self.records {
            groups.insert(item.group());
            if !item.is_group_commit() {
                record_count += 1;
            }
        }

        SummarizedOutput {
            unit: self.unit.clone(),
            status: self.status,
            record_count,
            group_count: groups.len(),
            err: self.err.clone(),
        }
    }
}

/// Per-unit entry of the execution report.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SummarizedOutput {
    pub unit: String,
    pub status: OutputStatus,
    pub record_count: usize,
    pub group_count: usize,
    pub err: Option<Error>,
}
