//! The model-wide singleton document.

use crate::store::{DocKind, Document};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Key of the single `ModelDoc`.
pub const MODEL_DOC_ID: &str = "model";

/// Model-wide bookkeeping.
///
/// Every branch create and delete writes this document, so its version
/// serializes them and the active-branch limit holds under concurrency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDoc {
    #[serde(default)]
    pub active_branches: BTreeSet<String>,
}

impl Document for ModelDoc {
    const KIND: DocKind = DocKind::Model;

    fn id(&self) -> String {
        MODEL_DOC_ID.to_string()
    }
}
