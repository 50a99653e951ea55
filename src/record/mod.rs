//! The record model: user records, their groups, and the sentinel values the
//! engine threads between stages.

use std::fmt;
use std::sync::Arc;

/// Group key carried by records that do not belong to any user group.
pub const GROUP_NA: &str = "*";

/// Identifier carried by records that have no identity of their own.
pub const IDENTIFIER_NA: &str = "*";

/// A user data item flowing through the pipeline.
///
/// Implementations expose only where the record belongs and a stable
/// identifier within that group; everything else is opaque to the engine.
pub trait Record: Send + Sync + 'static {
    fn group(&self) -> Group;
    fn identifier(&self) -> String;
}

/// Equivalence class over records, identified by a stable string key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Group(Arc<str>);

impl Group {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// The wildcard group assigned to records outside any user group.
    pub fn na() -> Self {
        Self::new(GROUP_NA)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Group").field(&self.as_str()).finish()
    }
}

impl From<&str> for Group {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for Group {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Stable key for a record within a stage: `"{group}/{identifier}"`.
pub fn record_key(record: &dyn Record) -> String {
    format!("{}/{}", record.group(), record.identifier())
}

/// A value travelling between stages.
///
/// Stages exchange either user records or group commits; the engine tells
/// them apart by variant, so user code can never forge a sentinel by
/// formatting a string.
#[derive(Clone)]
pub enum Item {
    /// A user-supplied record.
    Record(Arc<dyn Record>),
    /// No further records will arrive for this group. Reduce stages consume
    /// it as the group-closure signal; map stages drop it.
    GroupCommit(Group),
}

impl Item {
    pub fn record(record: impl Record) -> Self {
        Self::Record(Arc::new(record))
    }

    /// Marker asserting that a group is complete. Lets reducers run over
    /// groups that never saw a record, and drop buffers before end-of-input.
    pub fn group_commit(group: impl Into<Group>) -> Self {
        Self::GroupCommit(group.into())
    }

    pub fn group(&self) -> Group {
        match self {
            Self::Record(record) => record.group(),
            Self::GroupCommit(group) => group.clone(),
        }
    }

    pub fn identifier(&self) -> String {
        match self {
            Self::Record(record) => record.identifier(),
            Self::GroupCommit(_) => IDENTIFIER_NA.to_owned(),
        }
    }

    pub fn is_group_commit(&self) -> bool {
        matches!(self, Self::GroupCommit(_))
    }

    /// `"{group}/{identifier}"`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.group(), self.identifier())
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record(record) => f
                .debug_tuple("Record")
                .field(&record_key(record.as_ref()))
                .finish(),
            Self::GroupCommit(group) => f.debug_tuple("GroupCommit").field(&group.as_str()).finish(),
        }
    }
}

/// Seed record injected once at the pipeline head. The first stage receives
/// it as a plain record carrying the wildcard group and identifier.
pub(crate) struct OriginInput;

impl Record for OriginInput {
    fn group(&self) -> Group {
        Group::na()
    }

    fn identifier(&self) -> String {
        IDENTIFIER_NA.to_owned()
    }
}
