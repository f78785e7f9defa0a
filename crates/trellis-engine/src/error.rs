//! Error types shared by every engine operation.
//!
//! A save either commits completely or fails with a [`SaveError`]. Failures of
//! derived writes (block contents, menu items, redirects) surface as the same
//! [`SaveError::Invalid`] a direct validation failure would produce, so
//! callers never learn which synchronization stage rejected the save.

use std::fmt;

use serde::Serialize;

use crate::model::{MenuId, PageId, TemplateId};
use crate::snapshot_store::SnapshotError;

/// A single field-level validation failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Record type the field belongs to (e.g., "page", "redirect").
    pub record: &'static str,
    /// Field name (e.g., "path").
    pub field: &'static str,
    /// Human-readable message (e.g., "has already been taken").
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.record, self.field, self.message)
    }
}

/// Collected field-level validation failures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Create an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error set holding one failure.
    #[must_use]
    pub fn single(record: &'static str, field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(record, field, message);
        errors
    }

    /// Record a failure.
    pub fn add(&mut self, record: &'static str, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            record,
            field,
            message: message.into(),
        });
    }

    /// Append every failure from `other`.
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over failures in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Whether any failure was recorded for `record.field`.
    #[must_use]
    pub fn has(&self, record: &str, field: &str) -> bool {
        self.0
            .iter()
            .any(|error| error.record == record && error.field == field)
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Error returned when a save is rejected.
///
/// The transaction is rolled back in every case: no page, block content, menu
/// item or redirect written by the failed operation is visible afterwards.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// One or more records failed validation.
    #[error("Validation failed: {0}")]
    Invalid(#[from] ValidationErrors),
    /// Page does not exist.
    #[error("Page not found: {0}")]
    PageNotFound(PageId),
    /// Menu does not exist.
    #[error("Menu not found: {0}")]
    MenuNotFound(MenuId),
    /// Template does not exist.
    #[error("Template not found: {0}")]
    TemplateNotFound(TemplateId),
    /// The page changed since the caller read it.
    #[error("Page {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        /// Page being updated.
        id: PageId,
        /// Version the caller expected.
        expected: u64,
        /// Version currently stored.
        found: u64,
    },
    /// The committed state could not be written to the snapshot store.
    #[error("Failed to persist snapshot: {0}")]
    Persist(#[from] SnapshotError),
}

impl SaveError {
    /// Field-level failures, if this is a validation error.
    #[must_use]
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}

/// A violated page-tree invariant.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Pages exist but none is the root.
    #[error("No root page with path `/`")]
    MissingRoot,
    /// More than one page claims to be the root.
    #[error("More than one root page: {0} and {1}")]
    MultipleRoots(PageId, PageId),
    /// A page points at a parent that does not exist.
    #[error("Page {page} references missing parent {parent}")]
    MissingParent {
        /// Orphaned page.
        page: PageId,
        /// Missing parent.
        parent: PageId,
    },
    /// Two pages share a path.
    #[error("Duplicate page path `{0}`")]
    DuplicatePath(String),
    /// Positional markers or counters are inconsistent.
    #[error("Tree invariant violated at page {page}: {reason}")]
    Invariant {
        /// Page where the violation was detected.
        page: PageId,
        /// What is wrong.
        reason: String,
    },
}
