//! The index manager: document ingestion and removal.
//!
//! [`SearchIndex`] owns the term trie and the field/document registry. Adding a
//! document tokenizes each indexed field and bumps the postings of every
//! surviving term; removing it replays the same tokenization to take exactly
//! those postings back out.

use crate::config::IndexOptions;
use crate::document::{Document, ExternalId, value_to_text};
use crate::error::{ContentMismatch, RemovalReport, Result, SearchError};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::registry::{FieldId, InternalId, Registry, StoredFields};
use super::tokenize::analyze;
use super::trie::RadixTrie;

/// Documents indexed per batch by [`SearchIndex::add_all_async`] when the
/// caller has no preference.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Occurrences of one term within one field.
///
/// `document_frequency` always equals the number of entries in
/// `term_frequencies`; a posting whose map empties is removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub document_frequency: u32,
    /// Internal document id to occurrence count
    pub term_frequencies: AHashMap<InternalId, u32>,
}

/// Trie value: the postings of a term, keyed by field id.
pub type TermPostings = BTreeMap<FieldId, Posting>;

/// An in-memory full-text index.
///
/// All operations are synchronous and run to completion. Mutation needs
/// `&mut self`, so shared readers and a writer cannot overlap.
pub struct SearchIndex {
    pub(super) options: IndexOptions,
    pub(super) index: RadixTrie<TermPostings>,
    pub(super) registry: Registry,
}

impl SearchIndex {
    pub fn new(options: IndexOptions) -> Self {
        let registry = Registry::new(options.fields());
        Self {
            options,
            index: RadixTrie::new(),
            registry,
        }
    }

    pub const fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Number of documents currently indexed.
    pub const fn document_count(&self) -> usize {
        self.registry.document_count()
    }

    /// Number of distinct terms in the trie.
    pub const fn term_count(&self) -> usize {
        self.index.len()
    }

    pub fn has(&self, id: &ExternalId) -> bool {
        self.registry.internal_id(id).is_some()
    }

    pub fn stored_fields(&self, id: &ExternalId) -> Option<&StoredFields> {
        let internal = self.registry.internal_id(id)?;
        self.registry.stored_fields(internal)
    }

    /// Postings for an exact term, keyed by field id.
    pub fn postings(&self, term: &str) -> Option<&TermPostings> {
        self.index.get(term)
    }

    pub fn field_id(&self, field: &str) -> Option<FieldId> {
        self.registry.field_id(field)
    }

    pub fn average_field_length(&self, field: &str) -> Option<f64> {
        let id = self.registry.field_id(field)?;
        Some(self.registry.average_field_length(id))
    }

    /// Indexes a document.
    ///
    /// Fails with [`SearchError::MissingIdField`] when the id attribute is
    /// absent and [`SearchError::DuplicateId`] when the id is already indexed.
    /// A failed add leaves the index unchanged.
    pub fn add(&mut self, document: &Document) -> Result<()> {
        let id = self.extract_id(document)?;
        if self.registry.internal_id(&id).is_some() {
            return Err(SearchError::DuplicateId { id });
        }

        let doc = self.registry.allocate_internal_id(id.clone());
        self.save_stored_fields(doc, document);

        let Self {
            options,
            index,
            registry,
        } = self;

        let mut term_total = 0;
        for field in &options.fields {
            let Some(field_id) = registry.field_id(field) else {
                continue;
            };
            let Some(text) = options
                .extractor
                .extract(document, field)
                .as_ref()
                .and_then(value_to_text)
            else {
                continue;
            };

            let (length, terms) = analyze(
                &text,
                Some(field),
                &*options.tokenizer,
                &*options.term_processor,
            );
            registry.record_field_length(doc, field_id, length);

            term_total += terms.len();
            for term in &terms {
                add_term(index, field_id, doc, term);
            }
        }

        tracing::debug!("Indexed document {} ({} terms)", id, term_total);
        Ok(())
    }

    /// Indexes documents in order.
    ///
    /// The first failure is returned immediately; documents before it stay
    /// indexed.
    pub fn add_all<'a>(&mut self, documents: impl IntoIterator<Item = &'a Document>) -> Result<()> {
        let start = std::time::Instant::now();
        let mut added = 0usize;
        for document in documents {
            self.add(document)?;
            added += 1;
        }
        tracing::info!(
            "Indexed {} documents ({} total, {} terms) in {:?}",
            added,
            self.document_count(),
            self.term_count(),
            start.elapsed()
        );
        Ok(())
    }

    /// Indexes documents in chunks of `chunk_size`, yielding to the runtime
    /// between chunks so a long batch does not monopolize it.
    ///
    /// Each document is indexed atomically; failure semantics match
    /// [`add_all`](Self::add_all).
    pub async fn add_all_async(&mut self, documents: &[Document], chunk_size: usize) -> Result<()> {
        for (i, chunk) in documents.chunks(chunk_size.max(1)).enumerate() {
            if i > 0 {
                tokio::task::yield_now().await;
            }
            self.add_all(chunk)?;
        }
        Ok(())
    }

    /// Removes a document, given the same content it was indexed with.
    ///
    /// Fails with [`SearchError::NotIndexed`] when the id is unknown. Terms
    /// that cannot be found are reported as [`ContentMismatch`]es and logged;
    /// everything else is decremented and the index stays consistent.
    pub fn remove(&mut self, document: &Document) -> Result<RemovalReport> {
        let id = self.extract_id(document)?;
        let doc = self
            .registry
            .internal_id(&id)
            .ok_or_else(|| SearchError::NotIndexed { id: id.clone() })?;

        let Self {
            options,
            index,
            registry,
        } = self;

        let mut report = RemovalReport {
            removed: 1,
            mismatches: Vec::new(),
        };

        for field in &options.fields {
            let Some(field_id) = registry.field_id(field) else {
                continue;
            };
            let Some(text) = options
                .extractor
                .extract(document, field)
                .as_ref()
                .and_then(value_to_text)
            else {
                continue;
            };

            let (_, terms) = analyze(
                &text,
                Some(field),
                &*options.tokenizer,
                &*options.term_processor,
            );
            for term in terms {
                if !remove_term(index, field_id, doc, &term) {
                    let mismatch = ContentMismatch {
                        id: id.clone(),
                        field: field.clone(),
                        term,
                    };
                    tracing::warn!(
                        "{}. Removing a document after it has changed can corrupt the index",
                        mismatch
                    );
                    report.mismatches.push(mismatch);
                }
            }
        }

        registry.release_internal_id(doc);
        tracing::debug!("Removed document {}", id);
        Ok(report)
    }

    /// With `Some(documents)`, removes each one in order. With `None`, drops
    /// every document and resets all statistics and the id counter.
    ///
    /// `Some(&[])` removes nothing; only `None` clears the index.
    pub fn remove_all(&mut self, documents: Option<&[Document]>) -> Result<RemovalReport> {
        match documents {
            Some(documents) => {
                let mut report = RemovalReport::default();
                for document in documents {
                    report.merge(self.remove(document)?);
                }
                Ok(report)
            }
            None => {
                let removed = self.document_count();
                self.clear();
                Ok(RemovalReport {
                    removed,
                    mismatches: Vec::new(),
                })
            }
        }
    }

    /// Resets the index to its freshly constructed state.
    pub fn clear(&mut self) {
        let documents = self.document_count();
        self.index.clear();
        self.registry.reset();
        tracing::info!("Cleared search index ({} documents dropped)", documents);
    }

    fn extract_id(&self, document: &Document) -> Result<ExternalId> {
        self.options
            .extractor
            .extract(document, &self.options.id_field)
            .as_ref()
            .and_then(ExternalId::from_value)
            .ok_or_else(|| SearchError::MissingIdField {
                id_field: self.options.id_field.clone(),
            })
    }

    fn save_stored_fields(&mut self, doc: InternalId, document: &Document) {
        let stored: StoredFields = self
            .options
            .store_fields
            .iter()
            .filter_map(|field| {
                self.options
                    .extractor
                    .extract(document, field)
                    .map(|value| (field.clone(), value))
            })
            .collect();
        self.registry.store_fields(doc, stored);
    }
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("fields", &self.options.fields)
            .field("documents", &self.document_count())
            .field("terms", &self.term_count())
            .finish_non_exhaustive()
    }
}

/// Counts one occurrence of `term` in `field` of `doc`.
fn add_term(index: &mut RadixTrie<TermPostings>, field: FieldId, doc: InternalId, term: &str) {
    index.update(term, |postings| {
        let mut postings = postings.unwrap_or_default();
        let posting = postings.entry(field).or_default();
        let frequency = posting.term_frequencies.entry(doc).or_insert(0);
        if *frequency == 0 {
            posting.document_frequency += 1;
        }
        *frequency += 1;
        postings
    });
}

/// Takes back one occurrence of `term` in `field` of `doc`, pruning empty
/// postings and trie entries. Returns false when there was nothing to take.
fn remove_term(
    index: &mut RadixTrie<TermPostings>,
    field: FieldId,
    doc: InternalId,
    term: &str,
) -> bool {
    let Some(postings) = index.get_mut(term) else {
        return false;
    };
    let Some(posting) = postings.get_mut(&field) else {
        return false;
    };
    let Some(frequency) = posting.term_frequencies.get_mut(&doc) else {
        return false;
    };

    if *frequency > 1 {
        *frequency -= 1;
        return true;
    }

    posting.term_frequencies.remove(&doc);
    posting.document_frequency = posting.term_frequencies.len() as u32;
    if posting.term_frequencies.is_empty() {
        postings.remove(&field);
    }

    let now_empty = postings.is_empty();
    if now_empty {
        index.delete(term);
    }
    true
}
