//! Shared test fixtures and utilities for integration tests.
//!
//! # Available Fixtures
//!
//! - `corpus`: four small book records with `id`, `title`, `text` and `category`
//! - `options`: index options over `title` and `text`, storing `title` and `category`
//! - `index`: a [`SearchIndex`] built from `options` with the whole corpus added
//!
//! [`TempWorkspace`] provides a temp directory for tests that exercise the
//! binary or snapshot files.

use radix_search::{Document, IndexOptions, SearchIndex};
use rstest::fixture;
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builds a document from a JSON object literal.
pub fn doc(value: serde_json::Value) -> Document {
    Document::try_from(value).expect("test documents are JSON objects")
}

#[fixture]
pub fn corpus() -> Vec<Document> {
    vec![
        doc(json!({
            "id": 1,
            "title": "Moby Dick",
            "text": "Call me Ishmael. Some years ago, never mind how long precisely",
            "category": "fiction",
        })),
        doc(json!({
            "id": 2,
            "title": "Zen and the Art of Motorcycle Maintenance",
            "text": "I can see by my watch, without taking my hand from the left grip of the cycle",
            "category": "fiction",
        })),
        doc(json!({
            "id": 3,
            "title": "Neuromancer",
            "text": "The sky above the port was the color of television, tuned to a dead channel",
            "category": "fiction",
        })),
        doc(json!({
            "id": 4,
            "title": "Zen and the Art of Archery",
            "text": "At first sight it must seem intolerably degrading for Zen",
            "category": "non-fiction",
        })),
    ]
}

#[fixture]
pub fn options() -> IndexOptions {
    IndexOptions::builder()
        .fields(["title", "text"])
        .store_fields(["title", "category"])
        .build()
        .expect("fields are declared")
}

#[fixture]
pub fn index(options: IndexOptions, corpus: Vec<Document>) -> SearchIndex {
    radix_search::logging::init();
    let mut index = SearchIndex::new(options);
    index.add_all(&corpus).expect("corpus indexes cleanly");
    index
}

/// A temporary directory that is cleaned up when dropped.
#[allow(dead_code)] // Used by some integration test crates only
pub struct TempWorkspace {
    _temp: TempDir,
    root: PathBuf,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl TempWorkspace {
    /// Creates a new empty temporary workspace.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    /// Returns the root path of this workspace.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates a file with the given content within this workspace.
    ///
    /// # Panics
    /// Panics if file creation fails.
    pub fn create_file(&self, path: &str, content: &str) -> PathBuf {
        let full_path = self.root.join(path);
        std::fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("Failed to write file '{}': {}", path, e));
        full_path
    }

    /// Reads a file from this workspace.
    ///
    /// # Panics
    /// Panics if the file cannot be read.
    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.root.join(path))
            .unwrap_or_else(|e| panic!("Failed to read file '{}': {}", path, e))
    }
}
