//! Error taxonomy for a curation run.
//!
//! | Variant | Policy |
//! |---------|--------|
//! | [`CurateError::StoreRead`] | Fatal. Nothing can proceed without the item set. |
//! | [`CurateError::StoreWrite`] | Isolated. Logged per mutation, the rest of the plan continues. |
//! | [`CurateError::InvalidRules`] | Fatal at startup. Bad classifier or facet declarations. |
//!
//! Unresolvable gaps and ambiguous classifications are reportable
//! conditions, not errors; see [`crate::report`].

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CurateError>;

#[derive(Error, Debug)]
pub enum CurateError {
    #[error("failed to read catalog items: {0:#}")]
    StoreRead(anyhow::Error),

    #[error("failed to update item {item_id} ({facet} = {value}): {message}")]
    StoreWrite {
        item_id: String,
        facet: String,
        value: String,
        message: String,
    },

    #[error("invalid rules: {0}")]
    InvalidRules(String),
}

/// Serializable record of one failed mutation, kept in the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteFailure {
    pub item_id: String,
    pub facet: String,
    pub value: String,
    pub message: String,
}

impl From<&WriteFailure> for CurateError {
    fn from(f: &WriteFailure) -> Self {
        CurateError::StoreWrite {
            item_id: f.item_id.clone(),
            facet: f.facet.clone(),
            value: f.value.clone(),
            message: f.message.clone(),
        }
    }
}
