//! Error handling types and utilities.

use crate::document::ExternalId;
use std::fmt;

/// A specialized Result type for index operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors surfaced by index construction, mutation and snapshot restore.
///
/// Every variant is reported synchronously to the immediate caller; nothing is
/// retried. A failed `add` or `remove` leaves the index unchanged.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// No indexed fields were declared at construction.
    #[error("option \"fields\" must be provided")]
    MissingFields,

    /// A snapshot was restored without the options used to build it.
    #[error("restoring a snapshot requires the same options used when it was exported")]
    MissingConfig,

    /// The snapshot's field table disagrees with the configured fields.
    #[error("snapshot field \"{field}\" does not match the configured fields")]
    FieldMismatch { field: String },

    /// A document lacks the configured id attribute.
    #[error("document does not have ID field \"{id_field}\"")]
    MissingIdField { id_field: String },

    /// The removal target was never indexed (or was already removed).
    #[error("cannot remove document with ID {id}: it is not in the index")]
    NotIndexed { id: ExternalId },

    /// A document with the same external id is already indexed.
    #[error("duplicate ID {id}: a document with this ID is already in the index")]
    DuplicateId { id: ExternalId },

    /// The TOML configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Snapshot JSON could not be encoded or decoded.
    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// Whether this error stems from missing or inconsistent configuration.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingFields | Self::MissingConfig | Self::FieldMismatch { .. } | Self::Config(_)
        )
    }
}

/// A term that `remove` expected to find for a document but did not.
///
/// This happens when the caller supplies content that differs from what was
/// indexed. The removal still decrements everything it can and the index stays
/// consistent; the mismatch is reported rather than raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMismatch {
    pub id: ExternalId,
    pub field: String,
    pub term: String,
}

impl fmt::Display for ContentMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "document with ID {} has changed before removal: term \"{}\" was not present in field \"{}\"",
            self.id, self.term, self.field
        )
    }
}

/// Outcome of a removal that did not fail outright.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    /// Documents removed from the index.
    pub removed: usize,
    /// Terms that could not be found while replaying the document's tokens.
    pub mismatches: Vec<ContentMismatch>,
}

impl RemovalReport {
    /// True when every replayed term was found in the index.
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub(crate) fn merge(&mut self, other: Self) {
        self.removed += other.removed;
        self.mismatches.extend(other.mismatches);
    }
}
