//! Field and document bookkeeping for the index.
//!
//! Tracks the field-name to field-id table, per-document field lengths with a
//! running per-field average, the internal/external id maps, and the stored
//! field values returned with search results.

use crate::document::ExternalId;
use ahash::AHashMap;
use serde_json::Value;
use std::collections::BTreeMap;

/// Small integer assigned to each indexed field in declaration order.
pub type FieldId = u32;

/// Compact document id assigned by the index. Never reused within a session.
pub type InternalId = u32;

/// Stored (returnable) field values for one document.
pub type StoredFields = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub(super) field_names: Vec<String>,
    pub(super) field_ids: AHashMap<String, FieldId>,
    /// Token count per (document, field)
    pub(super) field_length: BTreeMap<InternalId, BTreeMap<FieldId, usize>>,
    /// Running mean token count, indexed by field id
    pub(super) average_field_length: Vec<f64>,
    /// Lengths folded into each running mean so far
    pub(super) field_samples: Vec<u64>,
    pub(super) document_ids: BTreeMap<InternalId, ExternalId>,
    pub(super) internal_ids: AHashMap<ExternalId, InternalId>,
    pub(super) stored_fields: BTreeMap<InternalId, StoredFields>,
    pub(super) document_count: usize,
    pub(super) next_id: InternalId,
}

impl Registry {
    pub fn new(fields: &[String]) -> Self {
        let mut registry = Self::default();
        registry.register_fields(fields);
        registry
    }

    /// Assigns ids to any fields not yet known, in declaration order.
    pub fn register_fields(&mut self, names: &[String]) {
        for name in names {
            if self.field_ids.contains_key(name) {
                continue;
            }
            let id = self.field_names.len() as FieldId;
            self.field_ids.insert(name.clone(), id);
            self.field_names.push(name.clone());
            self.average_field_length.push(0.0);
            self.field_samples.push(0);
        }
    }

    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.field_ids.get(name).copied()
    }

    pub fn field_name(&self, id: FieldId) -> Option<&str> {
        self.field_names.get(id as usize).map(String::as_str)
    }

    pub fn fields(&self) -> &[String] {
        &self.field_names
    }

    /// Records a document's token count for a field and folds it into the
    /// field's running average: `avg' = (avg * n + length) / (n + 1)`.
    ///
    /// The average is never recomputed and never reduced on removal.
    pub fn record_field_length(&mut self, doc: InternalId, field: FieldId, length: usize) {
        let slot = field as usize;
        let n = self.field_samples[slot] as f64;
        let average = self.average_field_length[slot];
        self.average_field_length[slot] = average.mul_add(n, length as f64) / (n + 1.0);
        self.field_samples[slot] += 1;

        self.field_length
            .entry(doc)
            .or_default()
            .insert(field, length);
    }

    pub fn field_length(&self, doc: InternalId, field: FieldId) -> Option<usize> {
        self.field_length.get(&doc)?.get(&field).copied()
    }

    pub fn average_field_length(&self, field: FieldId) -> f64 {
        self.average_field_length
            .get(field as usize)
            .copied()
            .unwrap_or(0.0)
    }

    /// Field length of `doc` relative to the field average.
    ///
    /// Falls back to 1.0 when either side is missing or zero so a degenerate
    /// statistic never divides a score by zero.
    pub fn relative_field_length(&self, doc: InternalId, field: FieldId) -> f64 {
        let average = self.average_field_length(field);
        match self.field_length(doc, field) {
            Some(length) if length > 0 && average > 0.0 => length as f64 / average,
            _ => 1.0,
        }
    }

    /// Assigns the next internal id to `external` and counts the document.
    pub fn allocate_internal_id(&mut self, external: ExternalId) -> InternalId {
        let id = self.next_id;
        self.next_id += 1;
        self.internal_ids.insert(external.clone(), id);
        self.document_ids.insert(id, external);
        self.document_count += 1;
        id
    }

    /// Forgets a document: id mappings, stored fields and per-document
    /// lengths. Field averages are left untouched.
    pub fn release_internal_id(&mut self, id: InternalId) -> Option<ExternalId> {
        let external = self.document_ids.remove(&id)?;
        self.internal_ids.remove(&external);
        self.stored_fields.remove(&id);
        self.field_length.remove(&id);
        self.document_count -= 1;
        Some(external)
    }

    pub fn internal_id(&self, external: &ExternalId) -> Option<InternalId> {
        self.internal_ids.get(external).copied()
    }

    pub fn external_id(&self, id: InternalId) -> Option<&ExternalId> {
        self.document_ids.get(&id)
    }

    pub fn store_fields(&mut self, id: InternalId, fields: StoredFields) {
        if !fields.is_empty() {
            self.stored_fields.insert(id, fields);
        }
    }

    pub fn stored_fields(&self, id: InternalId) -> Option<&StoredFields> {
        self.stored_fields.get(&id)
    }

    pub const fn document_count(&self) -> usize {
        self.document_count
    }

    pub const fn next_id(&self) -> InternalId {
        self.next_id
    }

    /// Drops every document and statistic, keeping the field table.
    pub fn reset(&mut self) {
        let fields = std::mem::take(&mut self.field_names);
        *self = Self::new(&fields);
    }
}
