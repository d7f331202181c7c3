use crate::config::{Combinator, FuzzyBudget, IndexConfig};
use crate::document::Document;
use crate::search::{DEFAULT_CHUNK_SIZE, SearchIndex};
use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "radix-search")]
#[command(about = "Build and query in-memory full-text search indexes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index a JSON array of documents and write a snapshot
    Index {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        documents: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
    /// Query a snapshot and print ranked results as JSON
    Search {
        query: String,
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Prefix-match every query term
        #[arg(long)]
        prefix: bool,
        /// Fuzzy budget: below 1 a fraction of term length, otherwise edits
        #[arg(long)]
        fuzzy: Option<f64>,
        /// Require every query term to match
        #[arg(long)]
        and: bool,
        #[arg(short = 'n', long, default_value = "25")]
        limit: usize,
    },
    /// Print query completions from a snapshot as JSON
    Suggest {
        query: String,
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        snapshot: PathBuf,
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}

impl Commands {
    /// Runs the command and returns what should be printed to stdout.
    pub async fn execute(self) -> anyhow::Result<String> {
        match self {
            Self::Index {
                config,
                documents,
                output,
                chunk_size,
            } => {
                let options = load_config(&config)?.into_options()?;
                let source = tokio::fs::read_to_string(&documents)
                    .await
                    .with_context(|| format!("Failed to read {}", documents.display()))?;
                let documents: Vec<Document> = serde_json::from_str(&source)
                    .with_context(|| format!("{} is not a JSON array of objects", documents.display()))?;

                let mut index = SearchIndex::new(options);
                index.add_all_async(&documents, chunk_size).await?;
                tokio::fs::write(&output, index.to_json()?)
                    .await
                    .with_context(|| format!("Failed to write {}", output.display()))?;

                tracing::info!(
                    "Indexed {} documents ({} terms) into {}",
                    index.document_count(),
                    index.term_count(),
                    output.display()
                );
                Ok(serde_json::json!({
                    "documents": index.document_count(),
                    "terms": index.term_count(),
                })
                .to_string())
            }
            Self::Search {
                query,
                config,
                snapshot,
                prefix,
                fuzzy,
                and,
                limit,
            } => {
                let index = load_index(&config, &snapshot).await?;
                let mut options = index.options().search_options().clone();
                if prefix {
                    options = options.prefix(true);
                }
                if let Some(fuzzy) = fuzzy {
                    if !fuzzy.is_finite() || fuzzy < 0.0 {
                        bail!("--fuzzy must be a non-negative number, got {}", fuzzy);
                    }
                    options = options.fuzzy(FuzzyBudget::from_value(fuzzy));
                }
                if and {
                    options = options.combine_with(Combinator::And);
                }

                let mut results = index.search_with(&query, &options);
                results.truncate(limit);
                Ok(serde_json::to_string_pretty(&results)?)
            }
            Self::Suggest {
                query,
                config,
                snapshot,
                limit,
            } => {
                let index = load_index(&config, &snapshot).await?;
                let mut suggestions = index.auto_suggest(&query);
                suggestions.truncate(limit);
                Ok(serde_json::to_string_pretty(&suggestions)?)
            }
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<IndexConfig> {
    IndexConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))
}

async fn load_index(config: &Path, snapshot: &Path) -> anyhow::Result<SearchIndex> {
    let options = load_config(config)?.into_options()?;
    let json = tokio::fs::read_to_string(snapshot)
        .await
        .with_context(|| format!("Failed to read snapshot {}", snapshot.display()))?;
    SearchIndex::load_json(&json, Some(options))
        .with_context(|| format!("Failed to restore snapshot {}", snapshot.display()))
}
