//! Index construction and search options.
//!
//! [`IndexOptions`] fixes the behaviour of an index for its whole lifetime:
//! which fields are indexed and stored, where the id lives, and how text is
//! turned into terms. [`SearchOptions`] tune individual queries; the index keeps
//! a default set that `search` and `auto_suggest` fall back to. [`IndexConfig`]
//! is the serializable file form used by the command line.

use crate::document::{Document, ExternalId};
use crate::error::{Result, SearchError};
use crate::search::SearchResult;
use crate::search::tokenize::{
    LowercaseProcessor, PunctuationTokenizer, StemmingProcessor, TermProcessor, Tokenizer,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Pulls a field value out of a document.
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, document: &Document, field: &str) -> Option<Value>;
}

impl<F> FieldExtractor for F
where
    F: Fn(&Document, &str) -> Option<Value> + Send + Sync,
{
    fn extract(&self, document: &Document, field: &str) -> Option<Value> {
        self(document, field)
    }
}

/// Default extractor: direct attribute lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeExtractor;

impl FieldExtractor for AttributeExtractor {
    fn extract(&self, document: &Document, field: &str) -> Option<Value> {
        document.get(field).filter(|v| !v.is_null()).cloned()
    }
}

/// How per-term result sets are combined across query terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    Or,
    And,
}

/// Edit budget for fuzzy matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FuzzyBudget {
    /// Fraction of the query term's length, rounded to the nearest edit count.
    Fraction(f64),
    /// Absolute number of edits.
    Edits(usize),
}

impl FuzzyBudget {
    /// Budget used when fuzzy matching is simply switched on.
    pub const DEFAULT: Self = Self::Fraction(0.2);

    /// Interprets a bare number: below 1 is a fraction, otherwise an edit
    /// count. Zero and negative values disable fuzzy matching.
    pub fn from_value(value: f64) -> Option<Self> {
        if value <= 0.0 || !value.is_finite() {
            None
        } else if value < 1.0 {
            Some(Self::Fraction(value))
        } else {
            Some(Self::Edits(value as usize))
        }
    }

    /// Maximum edit distance for a term of `term_len` characters.
    pub fn max_distance(self, term_len: usize) -> usize {
        match self {
            Self::Fraction(fraction) => (term_len as f64 * fraction).round() as usize,
            Self::Edits(edits) => edits,
        }
    }
}

type TermDecision<T> = dyn Fn(&str, usize, &[String]) -> T + Send + Sync;

/// A search setting that is either fixed or decided per query term.
///
/// Per-term functions receive the term, its position, and all query terms.
pub enum PerTerm<T> {
    Fixed(T),
    Dynamic(Arc<TermDecision<T>>),
}

impl<T: Clone> PerTerm<T> {
    pub fn dynamic(f: impl Fn(&str, usize, &[String]) -> T + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(f))
    }

    pub fn resolve(&self, term: &str, position: usize, terms: &[String]) -> T {
        match self {
            Self::Fixed(value) => value.clone(),
            Self::Dynamic(f) => f(term, position, terms),
        }
    }
}

impl<T: Clone> Clone for PerTerm<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(value) => Self::Fixed(value.clone()),
            Self::Dynamic(f) => Self::Dynamic(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PerTerm<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Prefix and fuzzy weights accepted as part of the search options.
///
/// They are carried through configuration and snapshots of the options but
/// do not enter the score: expansions are penalized only through their
/// match degradation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchWeights {
    pub fuzzy: f64,
    pub prefix: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            fuzzy: 0.9,
            prefix: 0.75,
        }
    }
}

/// Document boost: `(external id, term) -> factor`. A factor of zero drops
/// the contribution.
pub type DocumentBoost = Arc<dyn Fn(&ExternalId, &str) -> f64 + Send + Sync>;

/// Result predicate applied before ranking.
pub type ResultFilter = Arc<dyn Fn(&SearchResult) -> bool + Send + Sync>;

/// Options for a single query.
#[derive(Clone)]
pub struct SearchOptions {
    /// Fields to search; `None` searches every indexed field
    pub fields: Option<Vec<String>>,
    pub combine_with: Combinator,
    /// `None` means unset: no prefix matching in `search`, last-term prefix
    /// matching in `auto_suggest_with`
    pub prefix: Option<PerTerm<bool>>,
    pub fuzzy: PerTerm<Option<FuzzyBudget>>,
    /// Per-field boost; fields not listed get 1.0
    pub boost: BTreeMap<String, f64>,
    pub weights: MatchWeights,
    pub boost_document: Option<DocumentBoost>,
    pub filter: Option<ResultFilter>,
    /// Overrides the index tokenizer for the query string
    pub tokenizer: Option<Arc<dyn Tokenizer>>,
    /// Overrides the index term processor for query terms
    pub term_processor: Option<Arc<dyn TermProcessor>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            fields: None,
            combine_with: Combinator::Or,
            prefix: None,
            fuzzy: PerTerm::Fixed(None),
            boost: BTreeMap::new(),
            weights: MatchWeights::default(),
            boost_document: None,
            filter: None,
            tokenizer: None,
            term_processor: None,
        }
    }
}

impl SearchOptions {
    #[must_use]
    pub fn combine_with(mut self, combinator: Combinator) -> Self {
        self.combine_with = combinator;
        self
    }

    #[must_use]
    pub fn prefix(mut self, enabled: bool) -> Self {
        self.prefix = Some(PerTerm::Fixed(enabled));
        self
    }

    #[must_use]
    pub fn prefix_when(
        mut self,
        f: impl Fn(&str, usize, &[String]) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.prefix = Some(PerTerm::dynamic(f));
        self
    }

    #[must_use]
    pub fn fuzzy(mut self, budget: Option<FuzzyBudget>) -> Self {
        self.fuzzy = PerTerm::Fixed(budget);
        self
    }

    #[must_use]
    pub fn fuzzy_when(
        mut self,
        f: impl Fn(&str, usize, &[String]) -> Option<FuzzyBudget> + Send + Sync + 'static,
    ) -> Self {
        self.fuzzy = PerTerm::dynamic(f);
        self
    }

    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn boost(mut self, field: &str, factor: f64) -> Self {
        self.boost.insert(field.to_string(), factor);
        self
    }

    #[must_use]
    pub const fn weights(mut self, weights: MatchWeights) -> Self {
        self.weights = weights;
        self
    }

    #[must_use]
    pub fn boost_document(
        mut self,
        f: impl Fn(&ExternalId, &str) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.boost_document = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn filter(mut self, f: impl Fn(&SearchResult) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn tokenizer(mut self, tokenizer: impl Tokenizer + 'static) -> Self {
        self.tokenizer = Some(Arc::new(tokenizer));
        self
    }

    #[must_use]
    pub fn term_processor(mut self, processor: impl TermProcessor + 'static) -> Self {
        self.term_processor = Some(Arc::new(processor));
        self
    }

    /// Auto-suggest flavour: prefix matching on the last query term only.
    #[must_use]
    pub fn for_suggestions(mut self) -> Self {
        self.prefix = Some(PerTerm::dynamic(|_, position, terms| {
            position + 1 == terms.len()
        }));
        self
    }

    /// Whether the query term at `position` is prefix-matched.
    pub fn prefix_applies(&self, term: &str, position: usize, terms: &[String]) -> bool {
        self.prefix
            .as_ref()
            .is_some_and(|prefix| prefix.resolve(term, position, terms))
    }
}

impl fmt::Debug for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions")
            .field("fields", &self.fields)
            .field("combine_with", &self.combine_with)
            .field("prefix", &self.prefix)
            .field("fuzzy", &self.fuzzy)
            .field("boost", &self.boost)
            .field("weights", &self.weights)
            .field("boost_document", &self.boost_document.is_some())
            .field("filter", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

/// Construction options for an index.
#[derive(Clone)]
pub struct IndexOptions {
    pub(crate) fields: Vec<String>,
    pub(crate) store_fields: Vec<String>,
    pub(crate) id_field: String,
    pub(crate) extractor: Arc<dyn FieldExtractor>,
    pub(crate) tokenizer: Arc<dyn Tokenizer>,
    pub(crate) term_processor: Arc<dyn TermProcessor>,
    pub(crate) search: SearchOptions,
}

impl IndexOptions {
    pub fn builder() -> IndexOptionsBuilder {
        IndexOptionsBuilder::default()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn store_fields(&self) -> &[String] {
        &self.store_fields
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub const fn search_options(&self) -> &SearchOptions {
        &self.search
    }
}

impl fmt::Debug for IndexOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexOptions")
            .field("fields", &self.fields)
            .field("store_fields", &self.store_fields)
            .field("id_field", &self.id_field)
            .field("search", &self.search)
            .finish_non_exhaustive()
    }
}

/// Builder for [`IndexOptions`]. `fields` is the only required setting.
pub struct IndexOptionsBuilder {
    fields: Option<Vec<String>>,
    store_fields: Vec<String>,
    id_field: String,
    extractor: Arc<dyn FieldExtractor>,
    tokenizer: Arc<dyn Tokenizer>,
    term_processor: Arc<dyn TermProcessor>,
    search: SearchOptions,
}

impl Default for IndexOptionsBuilder {
    fn default() -> Self {
        Self {
            fields: None,
            store_fields: Vec::new(),
            id_field: "id".to_string(),
            extractor: Arc::new(AttributeExtractor),
            tokenizer: Arc::new(PunctuationTokenizer),
            term_processor: Arc::new(LowercaseProcessor),
            search: SearchOptions::default(),
        }
    }
}

impl IndexOptionsBuilder {
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn store_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.store_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    #[must_use]
    pub fn extractor(mut self, extractor: impl FieldExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    #[must_use]
    pub fn tokenizer(mut self, tokenizer: impl Tokenizer + 'static) -> Self {
        self.tokenizer = Arc::new(tokenizer);
        self
    }

    #[must_use]
    pub fn term_processor(mut self, processor: impl TermProcessor + 'static) -> Self {
        self.term_processor = Arc::new(processor);
        self
    }

    #[must_use]
    pub fn search_options(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }

    /// Fails with [`SearchError::MissingFields`] when no field was declared.
    pub fn build(self) -> Result<IndexOptions> {
        let fields = self
            .fields
            .filter(|fields| !fields.is_empty())
            .ok_or(SearchError::MissingFields)?;

        Ok(IndexOptions {
            fields,
            store_fields: self.store_fields,
            id_field: self.id_field,
            extractor: self.extractor,
            tokenizer: self.tokenizer,
            term_processor: self.term_processor,
            search: self.search,
        })
    }
}

/// File form of the index options.
///
/// ```toml
/// fields = ["title", "text"]
/// store_fields = ["title"]
/// stemming = true
///
/// [search]
/// combine_with = "and"
/// fuzzy = 0.2
/// boost = { title = 2.0 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub fields: Vec<String>,
    pub store_fields: Vec<String>,
    pub id_field: Option<String>,
    /// Use the English stemming processor instead of plain lowercasing
    pub stemming: bool,
    pub search: SearchConfig,
}

/// File form of the default search options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub combine_with: Combinator,
    pub prefix: Option<bool>,
    /// Fuzzy budget as a bare number; see [`FuzzyBudget::from_value`]
    pub fuzzy: f64,
    pub boost: BTreeMap<String, f64>,
    pub weights: MatchWeights,
}

impl IndexConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn into_options(self) -> Result<IndexOptions> {
        let search = SearchOptions {
            combine_with: self.search.combine_with,
            prefix: self.search.prefix.map(PerTerm::Fixed),
            fuzzy: PerTerm::Fixed(FuzzyBudget::from_value(self.search.fuzzy)),
            boost: self.search.boost,
            weights: self.search.weights,
            ..SearchOptions::default()
        };

        let mut builder = IndexOptions::builder()
            .fields(self.fields)
            .store_fields(self.store_fields)
            .search_options(search);
        if let Some(id_field) = self.id_field {
            builder = builder.id_field(id_field);
        }
        if self.stemming {
            builder = builder.term_processor(StemmingProcessor::english());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rstest::rstest;

    #[test]
    fn test_builder_requires_fields() {
        let_assert!(Err(SearchError::MissingFields) = IndexOptions::builder().build());
        let_assert!(
            Err(SearchError::MissingFields) =
                IndexOptions::builder().fields(Vec::<String>::new()).build()
        );
    }

    #[test]
    fn test_builder_defaults() {
        let options = IndexOptions::builder().fields(["text"]).build().unwrap();
        check!(options.id_field() == "id");
        check!(options.store_fields().is_empty());
        check!(options.search_options().combine_with == Combinator::Or);
        check!(options.search_options().weights == MatchWeights::default());
    }

    #[rstest]
    #[case(0.0, None)]
    #[case(-1.0, None)]
    #[case(0.34, Some(FuzzyBudget::Fraction(0.34)))]
    #[case(1.0, Some(FuzzyBudget::Edits(1)))]
    #[case(3.0, Some(FuzzyBudget::Edits(3)))]
    fn test_fuzzy_budget_from_value(#[case] value: f64, #[case] expected: Option<FuzzyBudget>) {
        check!(FuzzyBudget::from_value(value) == expected);
    }

    #[rstest]
    #[case(FuzzyBudget::Fraction(0.34), 6, 2)]
    #[case(FuzzyBudget::DEFAULT, 5, 1)]
    #[case(FuzzyBudget::DEFAULT, 2, 0)]
    #[case(FuzzyBudget::Edits(2), 10, 2)]
    fn test_fuzzy_budget_max_distance(
        #[case] budget: FuzzyBudget,
        #[case] len: usize,
        #[case] expected: usize,
    ) {
        check!(budget.max_distance(len) == expected);
    }

    #[test]
    fn test_per_term_resolution() {
        let terms = vec!["a".to_string(), "bb".to_string()];
        let last_only = SearchOptions::default().for_suggestions();
        check!(!last_only.prefix_applies("a", 0, &terms));
        check!(last_only.prefix_applies("bb", 1, &terms));
        check!(!SearchOptions::default().prefix_applies("bb", 1, &terms));

        let short_only = PerTerm::dynamic(|term: &str, _, _: &[String]| term.len() < 2);
        check!(short_only.resolve("a", 0, &terms));
        check!(!short_only.resolve("bb", 1, &terms));
    }

    #[test]
    fn test_config_from_toml() {
        let config = IndexConfig::from_toml_str(
            r#"
            fields = ["title", "text"]
            store_fields = ["title"]
            id_field = "key"
            stemming = true

            [search]
            combine_with = "and"
            prefix = true
            fuzzy = 0.2
            boost = { title = 2.0 }
            "#,
        )
        .unwrap();

        check!(config.fields == vec!["title".to_string(), "text".to_string()]);
        check!(config.search.combine_with == Combinator::And);
        check!(config.search.weights == MatchWeights::default());

        let options = config.into_options().unwrap();
        check!(options.id_field() == "key");
        check!(options.search_options().boost.get("title") == Some(&2.0));
        check!(options.search_options().prefix_applies("x", 0, &["x".to_string()]));
        check!(
            options.search_options().fuzzy.resolve("x", 0, &[]) == Some(FuzzyBudget::Fraction(0.2))
        );
    }

    #[test]
    fn test_config_without_fields_is_rejected() {
        let config = IndexConfig::from_toml_str("store_fields = [\"title\"]").unwrap();
        let error = config.into_options().unwrap_err();
        check!(error.is_configuration());
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let error = IndexConfig::from_toml_str("fields = [").unwrap_err();
        check!(error.is_configuration());
    }
}
