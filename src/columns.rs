//! Computed per-row columns. Implement `ColumnProvider` to append your own.

use crate::record::Record;
use crate::sentiment::Lexicon;
use anyhow::Result;
use regex::Regex;
use std::sync::Arc;

/// A pure function from a status to extra column values.
/// `values` must return exactly `labels().len()` entries.
pub trait ColumnProvider {
    fn labels(&self) -> Vec<String>;
    fn values(&self, status: &Record) -> Result<Vec<String>>;
}

fn status_text(status: &Record) -> &str {
    status.get("text").and_then(Record::as_str).unwrap_or("")
}

/// `average_sentiment`, `sentiment_words`. With no matches the average is `""` and the count `0`.
pub struct SentimentColumns {
    lexicon: Arc<Lexicon>,
}

impl SentimentColumns {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }
}

impl ColumnProvider for SentimentColumns {
    fn labels(&self) -> Vec<String> {
        vec!["average_sentiment".into(), "sentiment_words".into()]
    }

    fn values(&self, status: &Record) -> Result<Vec<String>> {
        let score = self.lexicon.score(status_text(status));
        // Debug formatting keeps the trailing ".0" on whole numbers.
        let avg = score.average().map(|a| format!("{:?}", a)).unwrap_or_default();
        Ok(vec![avg, score.matches.to_string()])
    }
}

/// `word_count`: runs of letters, digits and underscores.
pub struct WordCountColumn {
    word: Regex,
}

impl WordCountColumn {
    pub fn new() -> Self {
        Self { word: Regex::new(r"\w+").expect("static regex") }
    }

    pub fn count(&self, text: &str) -> usize {
        self.word.find_iter(text).count()
    }
}

impl Default for WordCountColumn {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnProvider for WordCountColumn {
    fn labels(&self) -> Vec<String> {
        vec!["word_count".into()]
    }

    fn values(&self, status: &Record) -> Result<Vec<String>> {
        Ok(vec![self.count(status_text(status)).to_string()])
    }
}
