//! Core error handling
//!
//! Service-level errors for store, bookmark, and timer operations.
//! Storage-level failures are wrapped transparently; enrichment
//! failures never surface here (they degrade to sentinel values).

use thiserror::Error;

use crate::storage::StorageError;
use crate::table::RecordId;

/// Errors surfaced by core operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// A lookup by id matched nothing where a record was required
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: RecordId },

    /// The hadith already has a bookmark
    #[error("hadith {hadith_id} is already bookmarked")]
    DuplicateBookmark { hadith_id: RecordId },

    /// The chapter position is already taken within the book
    #[error("chapter number {number} is already used in book {book_id}")]
    ChapterNumberTaken { book_id: RecordId, number: u32 },

    /// An input value failed validation
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The timer was asked for a transition its current state forbids
    #[error("timer is {state}, cannot {action}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    /// The durable surface failed; in-memory state may already be ahead
    /// of what was persisted and callers should re-read before retrying
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: RecordId) -> Self {
        CoreError::NotFound { entity, id }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        CoreError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Whether this error is a missing-record lookup
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
