use crate::date::{days, parse_timestamp};
use crate::sentiment::Lexicon;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

/// Longest accepted retweet window: ten thousand years, the span of representable dates.
pub const MAX_WINDOW_DAYS: f64 = 3_652_425.0;

/// How reposts are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetweetMode {
    /// Every status is written as its own row.
    #[default]
    None,
    /// Reposts feed the roll-up aggregator; nothing is written until a sweep.
    Rollup,
}

/// Row-building options with defaults and builder chaining.
#[derive(Clone, Debug, Default)]
pub struct CsvOptions {
    pub fields: Vec<String>,          // dot-paths, in column order
    pub url_columns: usize,
    pub hashtag_columns: usize,
    pub user_mention_columns: usize,
    pub compute_sentiment: bool,
    pub compute_word_count: bool,
    pub require_english: bool,
    pub retweet_mode: RetweetMode,
    pub retweet_threshold: u64,
    pub retweet_window: Option<Duration>, // None = unbounded
    pub retweet_counts_at: Vec<u32>,      // hour offsets, rollup only

    // record-level time bounds on `created_at`: start inclusive, end exclusive
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,

    pub lexicon: Option<Arc<Lexicon>>,
}

impl CsvOptions {
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_url_columns(mut self, n: usize) -> Self {
        self.url_columns = n;
        self
    }
    pub fn with_hashtag_columns(mut self, n: usize) -> Self {
        self.hashtag_columns = n;
        self
    }
    pub fn with_user_mention_columns(mut self, n: usize) -> Self {
        self.user_mention_columns = n;
        self
    }
    pub fn with_sentiment(mut self, lexicon: Arc<Lexicon>) -> Self {
        self.compute_sentiment = true;
        self.lexicon = Some(lexicon);
        self
    }
    pub fn with_word_count(mut self, yes: bool) -> Self {
        self.compute_word_count = yes;
        self
    }
    pub fn with_require_english(mut self, yes: bool) -> Self {
        self.require_english = yes;
        self
    }
    pub fn with_retweet_rollup(mut self, threshold: u64, window: Option<Duration>) -> Self {
        self.retweet_mode = RetweetMode::Rollup;
        self.retweet_threshold = threshold;
        self.retweet_window = window;
        self
    }
    pub fn with_retweet_counts_at<I: IntoIterator<Item = u32>>(mut self, hours: I) -> Self {
        self.retweet_counts_at = hours.into_iter().collect();
        self
    }
    pub fn with_time_bounds(mut self, start: Option<OffsetDateTime>, end: Option<OffsetDateTime>) -> Self {
        self.start = start;
        self.end = end;
        self
    }
}

/// On-disk run description for the binary (JSON).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub inputs: Vec<PathBuf>,
    pub output: Option<PathBuf>, // None = stdout
    pub lexicon: Option<PathBuf>,
    pub header: bool,
    pub progress: bool,
    pub sample_fields: usize,   // >0: print leaf-path counts of the first N records and stop

    pub fields: Vec<String>,
    pub url_columns: usize,
    pub hashtag_columns: usize,
    pub user_mention_columns: usize,
    pub compute_sentiment: bool,
    pub compute_word_count: bool,
    pub require_english: bool,
    pub retweet_mode: RetweetMode,
    pub retweet_threshold: u64,
    pub retweet_window_days: Option<f64>,
    pub retweet_counts_at: Vec<u32>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    /// Resolve into builder options, loading the lexicon when sentiment is requested.
    pub fn to_options(&self) -> Result<CsvOptions> {
        let bound = |s: &Option<String>, name: &str| -> Result<Option<OffsetDateTime>> {
            match s {
                Some(s) => parse_timestamp(s).map(Some).ok_or_else(|| anyhow!("invalid {} timestamp {:?}", name, s)),
                None => Ok(None),
            }
        };

        let mut opts = CsvOptions::default()
            .with_fields(self.fields.iter().cloned())
            .with_url_columns(self.url_columns)
            .with_hashtag_columns(self.hashtag_columns)
            .with_user_mention_columns(self.user_mention_columns)
            .with_word_count(self.compute_word_count)
            .with_require_english(self.require_english)
            .with_retweet_counts_at(self.retweet_counts_at.iter().copied())
            .with_time_bounds(bound(&self.start, "start")?, bound(&self.end, "end")?);

        let window = match self.retweet_window_days {
            Some(d) if !d.is_finite() || d < 0.0 || d > MAX_WINDOW_DAYS => {
                bail!("invalid retweet_window_days {}: expected 0..={} days", d, MAX_WINDOW_DAYS)
            }
            Some(d) => Some(days(d)),
            None => None,
        };
        if self.retweet_mode == RetweetMode::Rollup {
            opts = opts.with_retweet_rollup(self.retweet_threshold, window);
        }

        if self.compute_sentiment {
            let path = self
                .lexicon
                .as_ref()
                .ok_or_else(|| anyhow!("compute_sentiment requires a `lexicon` path"))?;
            opts = opts.with_sentiment(Arc::new(Lexicon::load(path)?));
        }
        Ok(opts)
    }
}
