//! Query execution: term expansion, result combination and ranking.
//!
//! A query string is tokenized and normalized exactly like document text. Each
//! resulting term is looked up exactly, and optionally expanded through prefix
//! and fuzzy matching; the hits of one term are OR-merged into a single result
//! set. The per-term sets are then combined with the configured combinator and
//! ranked by score.

use crate::config::{Combinator, FuzzyBudget, SearchOptions};
use crate::document::ExternalId;
use ahash::AHashSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use super::index::{SearchIndex, TermPostings};
use super::registry::{FieldId, InternalId, StoredFields};
use super::scoring::{fuzzy_degradation, prefix_degradation, tf_idf};
use super::tokenize::analyze;

/// Factor applied when a document is matched by more than one term (or
/// expansion) under OR combination.
const OR_MULTI_MATCH_REWARD: f64 = 1.5;

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: ExternalId,
    /// Indexed terms that contributed, deduplicated, in match order
    pub terms: Vec<String>,
    pub score: f64,
    /// Term to the names of the fields it matched in
    #[serde(rename = "match")]
    pub matches: BTreeMap<String, Vec<String>>,
    /// Configured stored fields of the document
    pub stored: StoredFields,
}

/// An auto-suggest entry: a combination of matched terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub suggestion: String,
    pub terms: Vec<String>,
    /// Average score of the documents matched by this term combination
    pub score: f64,
}

/// One query term with its resolved matching modes.
#[derive(Debug, Clone, PartialEq)]
struct QueryTerm {
    term: String,
    prefix: bool,
    fuzzy: Option<FuzzyBudget>,
}

/// Accumulated match of one document within a result set.
#[derive(Debug, Clone, Default)]
struct DocumentMatch {
    score: f64,
    terms: Vec<String>,
    matches: BTreeMap<String, Vec<String>>,
}

type ResultSet = BTreeMap<InternalId, DocumentMatch>;

/// A searchable field with its boost.
struct BoostedField<'a> {
    id: FieldId,
    name: &'a str,
    boost: f64,
}

impl SearchIndex {
    /// Searches with the index's default search options.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        self.search_with(query, &self.options.search)
    }

    /// Searches and returns hits ranked by descending score.
    ///
    /// Ties are not ordered in any guaranteed way.
    pub fn search_with(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        let terms = self.query_terms(query, options);
        let result_sets: Vec<ResultSet> = terms
            .iter()
            .map(|term| self.execute_query(term, options))
            .collect();

        let mut results: Vec<SearchResult> = combine(result_sets, options.combine_with)
            .into_iter()
            .filter_map(|(doc, matched)| {
                Some(SearchResult {
                    id: self.registry.external_id(doc)?.clone(),
                    terms: dedupe(matched.terms),
                    score: matched.score,
                    matches: matched.matches,
                    stored: self
                        .registry
                        .stored_fields(doc)
                        .cloned()
                        .unwrap_or_default(),
                })
            })
            .filter(|result| options.filter.as_ref().is_none_or(|keep| keep(result)))
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        tracing::debug!(
            "Query {:?} ({} terms) matched {} documents",
            query,
            terms.len(),
            results.len()
        );
        results
    }

    /// Suggests query completions, prefix-matching the last query term.
    pub fn auto_suggest(&self, query: &str) -> Vec<Suggestion> {
        let options = self.options.search.clone().for_suggestions();
        self.auto_suggest_with(query, &options)
    }

    /// Groups search hits by the combination of terms they matched and ranks
    /// each combination by its average score.
    ///
    /// When `options` leave `prefix` unset, the last query term is
    /// prefix-matched.
    pub fn auto_suggest_with(&self, query: &str, options: &SearchOptions) -> Vec<Suggestion> {
        let defaulted;
        let options = if options.prefix.is_none() {
            defaulted = options.clone().for_suggestions();
            &defaulted
        } else {
            options
        };

        let mut groups: BTreeMap<String, (Vec<String>, f64, usize)> = BTreeMap::new();

        for result in self.search_with(query, options) {
            let phrase = result.terms.join(" ");
            let group = groups
                .entry(phrase)
                .or_insert_with(|| (result.terms.clone(), 0.0, 0));
            group.1 += result.score;
            group.2 += 1;
        }

        let mut suggestions: Vec<Suggestion> = groups
            .into_iter()
            .map(|(suggestion, (terms, score, count))| Suggestion {
                suggestion,
                terms,
                score: score / count as f64,
            })
            .collect();
        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
        suggestions
    }

    fn query_terms(&self, query: &str, options: &SearchOptions) -> Vec<QueryTerm> {
        let tokenizer = options
            .tokenizer
            .as_deref()
            .unwrap_or(&*self.options.tokenizer);
        let processor = options
            .term_processor
            .as_deref()
            .unwrap_or(&*self.options.term_processor);

        let (_, terms) = analyze(query, None, tokenizer, processor);
        terms
            .iter()
            .enumerate()
            .map(|(position, term)| QueryTerm {
                term: term.clone(),
                prefix: options.prefix_applies(term, position, &terms),
                fuzzy: options.fuzzy.resolve(term, position, &terms),
            })
            .collect()
    }

    /// Exact, prefix and fuzzy hits for one query term, OR-merged.
    ///
    /// Prefix and fuzzy lookups include the query term itself when it is
    /// indexed, so an exact hit is merged once per enabled mode.
    fn execute_query(&self, query: &QueryTerm, options: &SearchOptions) -> ResultSet {
        let searched = options
            .fields
            .as_deref()
            .unwrap_or(self.options.fields.as_slice());
        let fields: Vec<BoostedField<'_>> = searched
            .iter()
            .filter_map(|name| {
                Some(BoostedField {
                    id: self.registry.field_id(name)?,
                    name,
                    boost: options.boost.get(name).copied().unwrap_or(1.0),
                })
            })
            .collect();

        let mut result_sets = vec![self.term_results(
            &query.term,
            self.index.get(&query.term),
            &fields,
            options,
            0.0,
        )];

        let query_len = query.term.chars().count();

        if query.prefix {
            for (term, postings) in self.index.at_prefix(&query.term).iter() {
                let degradation = prefix_degradation(query_len, term.chars().count());
                result_sets.push(self.term_results(&term, Some(postings), &fields, options, degradation));
            }
        }

        if let Some(budget) = query.fuzzy {
            let max_distance = budget.max_distance(query_len);
            for (term, (postings, distance)) in self.index.fuzzy_get(&query.term, max_distance) {
                let degradation = fuzzy_degradation(distance, term.chars().count());
                result_sets.push(self.term_results(&term, Some(postings), &fields, options, degradation));
            }
        }

        result_sets.into_iter().fold(ResultSet::new(), merge_or)
    }

    /// Scores every document holding `term` in one of the searched fields.
    fn term_results(
        &self,
        term: &str,
        postings: Option<&TermPostings>,
        fields: &[BoostedField<'_>],
        options: &SearchOptions,
        match_degradation: f64,
    ) -> ResultSet {
        let mut results = ResultSet::new();
        let Some(postings) = postings else {
            return results;
        };
        let document_count = self.registry.document_count();

        for field in fields {
            let Some(posting) = postings.get(&field.id) else {
                continue;
            };

            for (&doc, &frequency) in &posting.term_frequencies {
                let Some(external) = self.registry.external_id(doc) else {
                    continue;
                };
                let document_boost = options
                    .boost_document
                    .as_ref()
                    .map_or(1.0, |boost| boost(external, term));
                if document_boost == 0.0 {
                    continue;
                }

                let score = tf_idf(
                    frequency,
                    posting.document_frequency,
                    document_count,
                    self.registry.relative_field_length(doc, field.id),
                    field.boost,
                    match_degradation,
                );

                let matched = results.entry(doc).or_default();
                matched.score += document_boost * score;
                matched.terms.push(term.to_owned());
                let matched_fields = matched.matches.entry(term.to_owned()).or_default();
                if !matched_fields.iter().any(|name| name == field.name) {
                    matched_fields.push(field.name.to_owned());
                }
            }
        }

        results
    }
}

fn combine(result_sets: Vec<ResultSet>, combinator: Combinator) -> ResultSet {
    let mut sets = result_sets.into_iter();
    let Some(first) = sets.next() else {
        return ResultSet::new();
    };
    match combinator {
        Combinator::Or => sets.fold(first, merge_or),
        Combinator::And => sets.fold(first, merge_and),
    }
}

/// Union. A document already present gets `(old + new) * 1.5`.
fn merge_or(mut acc: ResultSet, next: ResultSet) -> ResultSet {
    for (doc, matched) in next {
        match acc.entry(doc) {
            Entry::Vacant(slot) => {
                slot.insert(matched);
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.score = (existing.score + matched.score) * OR_MULTI_MATCH_REWARD;
                existing.terms.extend(matched.terms);
                merge_fields(&mut existing.matches, matched.matches);
            }
        }
    }
    acc
}

/// Intersection. Surviving documents sum their scores.
fn merge_and(mut acc: ResultSet, next: ResultSet) -> ResultSet {
    next.into_iter()
        .filter_map(|(doc, matched)| {
            let mut existing = acc.remove(&doc)?;
            existing.score += matched.score;
            existing.terms.extend(matched.terms);
            merge_fields(&mut existing.matches, matched.matches);
            Some((doc, existing))
        })
        .collect()
}

fn merge_fields(into: &mut BTreeMap<String, Vec<String>>, from: BTreeMap<String, Vec<String>>) {
    for (term, fields) in from {
        let target = into.entry(term).or_default();
        for field in fields {
            if !target.contains(&field) {
                target.push(field);
            }
        }
    }
}

fn dedupe(terms: Vec<String>) -> Vec<String> {
    let mut seen = AHashSet::with_capacity(terms.len());
    terms
        .into_iter()
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexOptions;
    use crate::document::Document;
    use assert2::{check, let_assert};
    use serde_json::json;

    fn matched(score: f64, term: &str, field: &str) -> DocumentMatch {
        DocumentMatch {
            score,
            terms: vec![term.to_string()],
            matches: BTreeMap::from([(term.to_string(), vec![field.to_string()])]),
        }
    }

    #[test]
    fn test_merge_or_rewards_multiple_matches() {
        let a = ResultSet::from([(0, matched(1.0, "x", "title")), (1, matched(2.0, "x", "text"))]);
        let b = ResultSet::from([(0, matched(3.0, "y", "text"))]);

        let merged = merge_or(a, b);
        check!(merged.len() == 2);
        check!(merged[&0].score == 6.0);
        check!(merged[&0].terms == vec!["x".to_string(), "y".to_string()]);
        check!(merged[&0].matches.len() == 2);
        check!(merged[&1].score == 2.0);
    }

    #[test]
    fn test_merge_and_keeps_intersection() {
        let a = ResultSet::from([(0, matched(1.0, "x", "title")), (1, matched(2.0, "x", "text"))]);
        let b = ResultSet::from([(0, matched(3.0, "y", "text")), (2, matched(5.0, "y", "text"))]);

        let merged = merge_and(a, b);
        check!(merged.keys().copied().collect::<Vec<_>>() == vec![0]);
        check!(merged[&0].score == 4.0);
        check!(merged[&0].terms == vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_combine_empty_is_empty() {
        check!(combine(Vec::new(), Combinator::And).is_empty());
        check!(combine(Vec::new(), Combinator::Or).is_empty());
    }

    #[test]
    fn test_dedupe_preserves_first_occurrence() {
        let terms = ["b", "a", "b", "c", "a"].map(String::from).to_vec();
        check!(dedupe(terms) == ["b", "a", "c"].map(String::from).to_vec());
    }

    fn sample_index() -> SearchIndex {
        let options = IndexOptions::builder()
            .fields(["title", "text"])
            .build()
            .unwrap();
        let mut index = SearchIndex::new(options);
        for value in [
            json!({"id": 1, "title": "Moby Dick", "text": "Call me Ishmael"}),
            json!({"id": 2, "title": "Zen and the art", "text": "I can see by my watch"}),
            json!({"id": 3, "title": "Neuromancer", "text": "The sky above the port"}),
        ] {
            index.add(&Document::try_from(value).unwrap()).unwrap();
        }
        index
    }

    #[test]
    fn test_query_terms_resolve_per_term_modes() {
        let index = sample_index();
        let options = SearchOptions::default()
            .prefix_when(|_, position, terms| position + 1 == terms.len())
            .fuzzy_when(|term, _, _| (term.len() > 3).then_some(FuzzyBudget::Edits(1)));

        let terms = index.query_terms("The quick, brown FOX", &options);
        check!(
            terms
                == vec![
                    QueryTerm { term: "the".into(), prefix: false, fuzzy: None },
                    QueryTerm { term: "quick".into(), prefix: false, fuzzy: Some(FuzzyBudget::Edits(1)) },
                    QueryTerm { term: "brown".into(), prefix: false, fuzzy: Some(FuzzyBudget::Edits(1)) },
                    QueryTerm { term: "fox".into(), prefix: true, fuzzy: None },
                ]
        );
    }

    #[test]
    fn test_matches_name_fields() {
        let index = sample_index();
        let results = index.search("the");
        let_assert!([first, second] = results.as_slice());
        let mut ids = vec![first.id.clone(), second.id.clone()];
        ids.sort();
        check!(ids == vec![ExternalId::from(2), ExternalId::from(3)]);

        let neuromancer = results.iter().find(|r| r.id == ExternalId::from(3)).unwrap();
        check!(neuromancer.matches.get("the") == Some(&vec!["text".to_string()]));
    }

    #[test]
    fn test_fields_option_restricts_search() {
        let index = sample_index();
        let options = SearchOptions::default().fields(["title"]);
        check!(index.search_with("ishmael", &options).is_empty());
        check!(index.search_with("moby", &options).len() == 1);
    }

    #[test]
    fn test_document_boost_zero_skips() {
        let index = sample_index();
        let options = SearchOptions::default()
            .boost_document(|id, _| if *id == ExternalId::from(2) { 0.0 } else { 1.0 });
        let results = index.search_with("the", &options);
        check!(results.iter().all(|r| r.id != ExternalId::from(2)));
        check!(results.len() == 1);
    }

    #[test]
    fn test_filter_drops_results() {
        let index = sample_index();
        let options = SearchOptions::default().filter(|r| r.id != ExternalId::from(3));
        let results = index.search_with("the", &options);
        check!(results.len() == 1);
        check!(results[0].id == ExternalId::from(2));
    }

    #[test]
    fn test_auto_suggest_defaults_to_last_term_prefix() {
        let index = sample_index();

        let suggestions = index.auto_suggest_with("moby neuro", &SearchOptions::default());
        check!(suggestions.iter().any(|s| s.suggestion == "neuromancer"));

        let explicit = SearchOptions::default().prefix(false);
        check!(index.auto_suggest_with("neuro", &explicit).is_empty());
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let index = sample_index();
        check!(index.search("").is_empty());
        check!(index.search(" ,.; ").is_empty());
        check!(index.auto_suggest("").is_empty());
    }
}
