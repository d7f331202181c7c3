//! In-memory full-text search over a compressed trie.
//!
//! Documents are flat field maps. Each configured field is tokenized,
//! normalized and recorded in a [`RadixTrie`] of term postings; queries run
//! exact, prefix and fuzzy lookups against it and rank hits by TF-IDF.
//!
//! ```no_run
//! use radix_search::{Document, IndexOptions, SearchIndex};
//! use serde_json::json;
//!
//! let options = IndexOptions::builder().fields(["title", "text"]).build()?;
//! let mut index = SearchIndex::new(options);
//! index.add(&Document::try_from(json!({"id": 1, "title": "Moby Dick"})).unwrap())?;
//! let results = index.search("moby");
//! # Ok::<(), radix_search::SearchError>(())
//! ```

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod search;

pub use config::{
    AttributeExtractor, Combinator, FieldExtractor, FuzzyBudget, IndexConfig, IndexOptions,
    IndexOptionsBuilder, MatchWeights, PerTerm, SearchOptions,
};
pub use document::{Document, ExternalId};
pub use error::{ContentMismatch, RemovalReport, Result, SearchError};
pub use search::{
    IndexSnapshot, RadixTrie, SearchIndex, SearchResult, Suggestion, TermProcessor, Tokenizer,
};
