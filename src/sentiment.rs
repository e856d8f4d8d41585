//! Lexicon-based sentiment scoring with longest-phrase-first matching.
//!
//! The lexicon is a data asset (phrase -> integer score, AFINN style) injected by the caller.
//! Text is lowercased, underscores join words like spaces, and any phrase may be matched in
//! either its hyphenated or its spaced spelling.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default)]
pub struct Lexicon {
    scores: ahash::AHashMap<String, i32>,
    max_words: usize,
}

impl Lexicon {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i32)>,
        S: AsRef<str>,
    {
        let mut lex = Lexicon::default();
        for (phrase, score) in pairs {
            lex.insert(phrase.as_ref(), score);
        }
        lex
    }

    /// Load a `phrase<TAB>score` file, one entry per line. Blank lines are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read lexicon {}", path.display()))?;
        let lex = Self::parse(&text).with_context(|| format!("parse lexicon {}", path.display()))?;
        tracing::info!("Loaded {} lexicon phrases from {}", lex.len(), path.display());
        Ok(lex)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut lex = Lexicon::default();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let (phrase, score) = line
                .rsplit_once('\t')
                .or_else(|| line.trim().rsplit_once(char::is_whitespace))
                .ok_or_else(|| anyhow!("line {}: expected `phrase<TAB>score`", idx + 1))?;
            let score: i32 = score
                .trim()
                .parse()
                .with_context(|| format!("line {}: invalid score {:?}", idx + 1, score))?;
            lex.insert(phrase, score);
        }
        Ok(lex)
    }

    fn insert(&mut self, phrase: &str, score: i32) {
        let key = normalize_phrase(phrase);
        if key.is_empty() {
            return;
        }
        let words = key.split(|c: char| c == ' ' || c == '-').filter(|w| !w.is_empty()).count();
        self.max_words = self.max_words.max(words);
        self.scores.insert(key, score);
    }

    pub fn get(&self, phrase: &str) -> Option<i32> {
        self.scores.get(phrase).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Longest phrase in the lexicon, counted in words.
    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Score `text`: matched phrases are consumed, scanning resumes after them.
    pub fn score(&self, text: &str) -> SentimentScore {
        let tokens = tokenize(text);
        let mut out = SentimentScore::default();
        let mut i = 0;
        while i < tokens.len() {
            let longest = self.max_words.min(tokens.len() - i);
            let hit = (1..=longest).rev().find_map(|len| {
                let phrase = join_tokens(&tokens[i..i + len]);
                self.lookup_variants(&phrase).map(|score| (len, score))
            });
            match hit {
                Some((len, score)) => {
                    out.sum += score as i64;
                    out.matches += 1;
                    i += len;
                }
                None => i += 1,
            }
        }
        out
    }

    fn lookup_variants(&self, phrase: &str) -> Option<i32> {
        if let Some(s) = self.get(phrase) {
            return Some(s);
        }
        if phrase.contains('-') {
            if let Some(s) = self.get(&phrase.replace('-', " ")) {
                return Some(s);
            }
        }
        if phrase.contains(' ') {
            if let Some(s) = self.get(&phrase.replace(' ', "-")) {
                return Some(s);
            }
        }
        None
    }
}

/// Sum and count of lexicon matches for one text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SentimentScore {
    pub sum: i64,
    pub matches: u64,
}

impl SentimentScore {
    /// Mean matched score; `None` when nothing matched.
    pub fn average(&self) -> Option<f64> {
        if self.matches == 0 {
            None
        } else {
            Some(self.sum as f64 / self.matches as f64)
        }
    }
}

/// A word plus the separator that joined it to the previous word (`' '` or `'-'`).
struct Token {
    word: String,
    sep: char,
}

fn normalize_char(c: char) -> char {
    if c.is_alphanumeric() || c == '-' || c == '\'' {
        c
    } else {
        ' '
    }
}

fn normalize_phrase(s: &str) -> String {
    let lowered: String = s.to_lowercase().chars().map(normalize_char).collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tokenize(text: &str) -> Vec<Token> {
    let normalized = normalize_phrase(text);
    let mut tokens = Vec::new();
    for chunk in normalized.split(' ') {
        let mut sep = ' ';
        for part in chunk.split('-').filter(|p| !p.is_empty()) {
            tokens.push(Token { word: part.to_string(), sep });
            sep = '-';
        }
    }
    tokens
}

fn join_tokens(tokens: &[Token]) -> String {
    let mut s = String::new();
    for (idx, t) in tokens.iter().enumerate() {
        if idx > 0 {
            s.push(t.sep);
        }
        s.push_str(&t.word);
    }
    s
}
