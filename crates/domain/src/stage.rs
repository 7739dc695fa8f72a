//! Identity of a pipeline stage, used when reporting failures.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a stage inside a component pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Adapter,
    Logic,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adapter => f.write_str("adapter"),
            Self::Logic => f.write_str("logic"),
        }
    }
}

/// Which stage of a pipeline something happened in.
///
/// `index` is the position among adapters; it is always `0` for logic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageId {
    pub kind: StageKind,
    pub index: usize,
    pub name: String,
}

impl StageId {
    #[must_use]
    pub fn new(kind: StageKind, index: usize, name: impl Into<String>) -> Self {
        Self {
            kind,
            index,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn adapter(index: usize, name: impl Into<String>) -> Self {
        Self::new(StageKind::Adapter, index, name)
    }

    #[must_use]
    pub fn logic(name: impl Into<String>) -> Self {
        Self::new(StageKind::Logic, 0, name)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StageKind::Adapter => write!(f, "adapter[{}] `{}`", self.index, self.name),
            StageKind::Logic => write!(f, "logic `{}`", self.name),
        }
    }
}
