use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by pipeline execution and by user-supplied mappers and
/// reducers.
///
/// The engine threads errors through per-unit [`Output`] values and into the
/// execution report, so every variant is cheap to clone and compare.
///
/// [`Output`]: crate::pipeline::processor::Output
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The pipeline scope was cancelled before the unit could finish.
    #[error("pipeline cancelled")]
    Cancelled,

    /// A stage or pipeline deadline expired.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A mapper or reducer rejected a single work unit.
    #[error("{context}")]
    Unit { context: &'static str },

    /// A mapper or reducer failed with a dynamic message.
    #[error("{0}")]
    Message(String),

    /// A worker task panicked before reporting its output.
    #[error("worker panicked")]
    Panicked,
}

impl Error {
    pub fn unit(context: &'static str) -> Self {
        Self::Unit { context }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
