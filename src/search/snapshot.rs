//! Plain-data snapshots of an index.
//!
//! A snapshot carries data only: the trie entries, counters, id maps, field
//! statistics and stored fields. Tokenizers, term processors and other
//! behaviour are not serializable, so restoring requires the options the
//! original index was built with.

use crate::config::IndexOptions;
use crate::document::ExternalId;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::index::{SearchIndex, TermPostings};
use super::registry::{FieldId, InternalId, Registry, StoredFields};

/// Serializable state of a [`SearchIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSnapshot {
    /// Trie entries in lexicographic term order
    pub index: Vec<(String, TermPostings)>,
    pub document_count: usize,
    pub next_id: InternalId,
    pub document_ids: BTreeMap<InternalId, ExternalId>,
    pub field_ids: BTreeMap<String, FieldId>,
    pub field_length: BTreeMap<InternalId, BTreeMap<FieldId, usize>>,
    pub average_field_length: BTreeMap<FieldId, f64>,
    #[serde(default)]
    pub field_samples: BTreeMap<FieldId, u64>,
    #[serde(default)]
    pub stored_fields: BTreeMap<InternalId, StoredFields>,
}

impl IndexSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl SearchIndex {
    /// Captures the full index state.
    pub fn export(&self) -> IndexSnapshot {
        let registry = &self.registry;
        let by_field = |values: &[f64]| -> BTreeMap<FieldId, f64> {
            values
                .iter()
                .enumerate()
                .map(|(id, &value)| (id as FieldId, value))
                .collect()
        };

        IndexSnapshot {
            index: self
                .index
                .iter()
                .map(|(term, postings)| (term, postings.clone()))
                .collect(),
            document_count: registry.document_count,
            next_id: registry.next_id,
            document_ids: registry.document_ids.clone(),
            field_ids: registry
                .field_names
                .iter()
                .enumerate()
                .map(|(id, name)| (name.clone(), id as FieldId))
                .collect(),
            field_length: registry.field_length.clone(),
            average_field_length: by_field(&registry.average_field_length),
            field_samples: registry
                .field_samples
                .iter()
                .enumerate()
                .map(|(id, &samples)| (id as FieldId, samples))
                .collect(),
            stored_fields: registry.stored_fields.clone(),
        }
    }

    /// Rebuilds an index from a snapshot and the options it was built with.
    ///
    /// Fails with [`SearchError::MissingConfig`] when no options are given and
    /// [`SearchError::FieldMismatch`] when the configured fields do not line
    /// up with the snapshot's field table.
    pub fn restore(snapshot: IndexSnapshot, options: Option<IndexOptions>) -> Result<Self> {
        let options = options.ok_or(SearchError::MissingConfig)?;
        let start = std::time::Instant::now();

        for (position, name) in options.fields().iter().enumerate() {
            if snapshot.field_ids.get(name) != Some(&(position as FieldId)) {
                return Err(SearchError::FieldMismatch { field: name.clone() });
            }
        }
        if let Some(extra) = snapshot
            .field_ids
            .keys()
            .find(|name| !options.fields().contains(name))
        {
            return Err(SearchError::FieldMismatch {
                field: extra.clone(),
            });
        }

        let mut registry = Registry::new(options.fields());
        for (id, average) in &snapshot.average_field_length {
            if let Some(slot) = registry.average_field_length.get_mut(*id as usize) {
                *slot = *average;
            }
        }
        for (id, samples) in &snapshot.field_samples {
            if let Some(slot) = registry.field_samples.get_mut(*id as usize) {
                *slot = *samples;
            }
        }
        registry.internal_ids = snapshot
            .document_ids
            .iter()
            .map(|(&internal, external)| (external.clone(), internal))
            .collect();
        registry.document_ids = snapshot.document_ids;
        registry.field_length = snapshot.field_length;
        registry.stored_fields = snapshot.stored_fields;
        registry.document_count = snapshot.document_count;
        registry.next_id = snapshot.next_id;

        let index = Self {
            index: snapshot.index.into_iter().collect(),
            registry,
            options,
        };

        tracing::info!(
            "Restored search index: {} documents, {} terms in {:?}",
            index.document_count(),
            index.term_count(),
            start.elapsed()
        );
        Ok(index)
    }

    /// Serializes the index state to JSON.
    pub fn to_json(&self) -> Result<String> {
        self.export().to_json()
    }

    /// Restores an index from [`to_json`](Self::to_json) output.
    pub fn load_json(json: &str, options: Option<IndexOptions>) -> Result<Self> {
        let options = options.ok_or(SearchError::MissingConfig)?;
        Self::restore(IndexSnapshot::from_json(json)?, Some(options))
    }
}
