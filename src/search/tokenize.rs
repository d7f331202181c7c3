//! Text tokenization and term normalization strategies.
//!
//! Tokenizers split raw field text into tokens; term processors normalize each
//! token into an indexable term or drop it. Both are plain traits with blanket
//! impls for closures, so callers can pass a function where a strategy is
//! expected.

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::fmt;
use std::sync::LazyLock;

/// Common English stop words dropped by [`StemmingProcessor`].
pub(crate) const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with",
];

/// Line breaks, Unicode space separators and Unicode punctuation. Tabs and
/// form feeds are not separators, and symbols such as `$`, `+` or `<` stay
/// inside tokens.
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\n\r\p{Z}\p{P}]+").expect("separator pattern is valid"));

/// Splits text into raw tokens.
///
/// `field` is the field being indexed, or `None` when tokenizing a query.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str, field: Option<&str>) -> Vec<String>;
}

impl<F> Tokenizer for F
where
    F: Fn(&str, Option<&str>) -> Vec<String> + Send + Sync,
{
    fn tokenize(&self, text: &str, field: Option<&str>) -> Vec<String> {
        self(text, field)
    }
}

/// Normalizes a token into a term. Returning `None` drops the token, which is
/// how stop-word filtering is expressed.
pub trait TermProcessor: Send + Sync {
    fn process(&self, token: &str, field: Option<&str>) -> Option<String>;
}

impl<F> TermProcessor for F
where
    F: Fn(&str, Option<&str>) -> Option<String> + Send + Sync,
{
    fn process(&self, token: &str, field: Option<&str>) -> Option<String> {
        self(token, field)
    }
}

/// Default tokenizer: splits on runs of spaces, line breaks and punctuation.
///
/// Empty pieces at either end of the text are dropped, so they never count
/// towards a field's length.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationTokenizer;

impl Tokenizer for PunctuationTokenizer {
    fn tokenize(&self, text: &str, _field: Option<&str>) -> Vec<String> {
        SEPARATOR
            .split(text)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

/// Default term processor: lowercases every token.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowercaseProcessor;

impl TermProcessor for LowercaseProcessor {
    fn process(&self, token: &str, _field: Option<&str>) -> Option<String> {
        let term = token.to_lowercase();
        (!term.is_empty()).then_some(term)
    }
}

/// Lowercases, drops English stop words, and applies Snowball stemming.
pub struct StemmingProcessor {
    stemmer: Stemmer,
}

impl StemmingProcessor {
    pub fn english() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }
}

impl Default for StemmingProcessor {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Debug for StemmingProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StemmingProcessor").finish_non_exhaustive()
    }
}

impl TermProcessor for StemmingProcessor {
    fn process(&self, token: &str, _field: Option<&str>) -> Option<String> {
        let lowercase = token.to_lowercase();

        if lowercase.is_empty() || STOP_WORDS.contains(&lowercase.as_str()) {
            return None;
        }

        Some(self.stemmer.stem(&lowercase).into_owned())
    }
}

/// Tokenizes `text` and normalizes each token, dropping filtered ones.
///
/// Returns the raw token count alongside the surviving terms; field length
/// statistics are based on the former.
pub(crate) fn analyze(
    text: &str,
    field: Option<&str>,
    tokenizer: &dyn Tokenizer,
    processor: &dyn TermProcessor,
) -> (usize, Vec<String>) {
    let tokens = tokenizer.tokenize(text, field);
    let terms = tokens
        .iter()
        .filter_map(|token| processor.process(token, field))
        .filter(|term| !term.is_empty())
        .collect();
    (tokens.len(), terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case("alpha beta", &["alpha", "beta"])]
    #[case("  leading and trailing.  ", &["leading", "and", "trailing"])]
    #[case("comma,separated;list", &["comma", "separated", "list"])]
    #[case("line\nbreaks\r\nend", &["line", "breaks", "end"])]
    #[case("tab\tseparated\u{000B}cells", &["tab\tseparated\u{000B}cells"])]
    #[case("no\u{00A0}break\u{3000}wide", &["no", "break", "wide"])]
    #[case("l'été — déjà vu", &["l", "été", "déjà", "vu"])]
    #[case("c++ $5", &["c++", "$5"])]
    fn test_punctuation_tokenizer(#[case] input: &str, #[case] expected: &[&str]) {
        check!(PunctuationTokenizer.tokenize(input, None) == expected);
    }

    #[test]
    fn test_empty_and_whitespace() {
        check!(PunctuationTokenizer.tokenize("", None).is_empty());
        check!(PunctuationTokenizer.tokenize("   ", None).is_empty());
        check!(PunctuationTokenizer.tokenize("\r\n ", None).is_empty());
    }

    #[test]
    fn test_edge_punctuation_does_not_count_towards_length() {
        let (length, terms) = analyze(
            "Call me Ishmael.",
            Some("text"),
            &PunctuationTokenizer,
            &LowercaseProcessor,
        );
        check!(length == 3);
        check!(terms == ["call", "me", "ishmael"]);
    }

    #[test]
    fn test_lowercase_processor() {
        check!(LowercaseProcessor.process("HeLLo", Some("title")) == Some("hello".to_string()));
        check!(LowercaseProcessor.process("", None) == None);
    }

    #[rstest]
    #[case("Running", Some("run"))]
    #[case("plurals", Some("plural"))]
    #[case("the", None)]
    #[case("With", None)]
    fn test_stemming_processor(#[case] token: &str, #[case] expected: Option<&str>) {
        let processor = StemmingProcessor::english();
        check!(processor.process(token, None).as_deref() == expected);
    }

    #[test]
    fn test_closures_are_strategies() {
        let tokenizer = |text: &str, _: Option<&str>| -> Vec<String> {
            text.split('|').map(str::to_owned).collect()
        };
        let processor = |token: &str, _: Option<&str>| -> Option<String> {
            (token.len() > 1).then(|| token.to_uppercase())
        };
        let (length, terms) = analyze("ab|c|de", None, &tokenizer, &processor);
        check!(length == 3);
        check!(terms == vec!["AB".to_string(), "DE".to_string()]);
    }
}
