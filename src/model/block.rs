//! Safety block documents.

use crate::error::{FleetError, Result};
use crate::store::{DocKind, Document};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The class of operations a block prevents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Destroy,
    Remove,
    Change,
    /// Satisfies every specific-kind check.
    All,
}

impl BlockKind {
    pub const ALL_KINDS: [BlockKind; 4] = [
        BlockKind::Destroy,
        BlockKind::Remove,
        BlockKind::Change,
        BlockKind::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Destroy => "destroy",
            BlockKind::Remove => "remove",
            BlockKind::Change => "change",
            BlockKind::All => "all",
        }
    }
}

impl FromStr for BlockKind {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        BlockKind::ALL_KINDS
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                FleetError::InvalidArgument(format!(
                    "block kind {:?} (expected destroy, remove, change, or all)",
                    s
                ))
            })
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operator-imposed block, one document per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyBlock {
    pub kind: BlockKind,
    #[serde(default)]
    pub message: String,
    pub active: bool,
}

impl Document for SafetyBlock {
    const KIND: DocKind = DocKind::Block;

    fn id(&self) -> String {
        self.kind.as_str().to_string()
    }
}
