//! Full-text search over a compressed trie.
//!
//! This module provides the term dictionary, tokenization, indexing,
//! TF-IDF scoring, query execution and snapshot persistence.

// Module declarations
pub(crate) mod index;
pub(crate) mod query;
pub(crate) mod registry;
pub mod scoring;
pub(crate) mod snapshot;
pub mod tokenize;
pub mod trie;

// Public re-exports (used via lib.rs)
pub use index::{DEFAULT_CHUNK_SIZE, Posting, SearchIndex, TermPostings};
pub use query::{SearchResult, Suggestion};
pub use registry::{FieldId, InternalId, StoredFields};
pub use snapshot::IndexSnapshot;
pub use tokenize::{LowercaseProcessor, PunctuationTokenizer, StemmingProcessor, TermProcessor, Tokenizer};
pub use trie::{RadixTrie, TrieView};
