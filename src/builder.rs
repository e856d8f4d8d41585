//! `CsvBuilder`: turns status records into CSV rows according to `CsvOptions`.
//!
//! Feed records one at a time with `handle_status`. In roll-up mode nothing is written until
//! `finalize(now)` (or `finalize_with_clock`) sweeps the aggregator.

use crate::clock::{Clock, SystemClock};
use crate::columns::{ColumnProvider, SentimentColumns, WordCountColumn};
use crate::config::{CsvOptions, RetweetMode};
use crate::entities::{configured_groups, EntityColumns};
use crate::field_path::{lookup, resolve};
use crate::record::Record;
use crate::retweet::{RetweetRollup, Sighting};
use anyhow::{anyhow, bail, Result};
use std::io::Write;
use time::OffsetDateTime;

/// Running counters, reported at the end of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderStats {
    pub seen: u64,
    pub written: u64,
    pub skipped_language: u64,
    pub skipped_time_bounds: u64,
    pub sightings_tracked: u64,
    pub sightings_ignored: u64,
    pub rollups_suppressed: u64,
}

pub struct CsvBuilder<W: Write> {
    opts: CsvOptions,
    out: csv::Writer<W>,
    entities: Vec<EntityColumns>,
    providers: Vec<Box<dyn ColumnProvider>>,
    rollup: Option<RetweetRollup>,
    clock: Box<dyn Clock>,
    stats: BuilderStats,
}

impl<W: Write> CsvBuilder<W> {
    pub fn new(opts: CsvOptions, sink: W) -> Result<Self> {
        let mut providers: Vec<Box<dyn ColumnProvider>> = Vec::new();
        if opts.compute_sentiment {
            let lexicon = opts
                .lexicon
                .clone()
                .ok_or_else(|| anyhow!("compute_sentiment requires a lexicon"))?;
            providers.push(Box::new(SentimentColumns::new(lexicon)));
        }
        if opts.compute_word_count {
            providers.push(Box::new(WordCountColumn::new()));
        }

        let rollup = match opts.retweet_mode {
            RetweetMode::Rollup => Some(
                RetweetRollup::new(opts.retweet_threshold, opts.retweet_window)
                    .with_counts_at_hours(opts.retweet_counts_at.clone()),
            ),
            RetweetMode::None => None,
        };

        let out = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(sink);

        Ok(Self {
            entities: configured_groups(opts.url_columns, opts.hashtag_columns, opts.user_mention_columns),
            opts,
            out,
            providers,
            rollup,
            clock: Box::new(SystemClock),
            stats: BuilderStats::default(),
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Append a custom computed column group after the built-in ones.
    pub fn with_column_provider(mut self, provider: impl ColumnProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn stats(&self) -> BuilderStats {
        self.stats
    }

    /// Ids still waiting for their window to elapse (roll-up mode).
    pub fn pending_rollups(&self) -> usize {
        self.rollup.as_ref().map_or(0, RetweetRollup::pending)
    }

    /// Column labels in row order: fields, entity groups, computed columns, roll-up offsets.
    pub fn header_labels(&self) -> Vec<String> {
        let mut labels = self.opts.fields.clone();
        for group in &self.entities {
            labels.extend(group.labels());
        }
        for p in &self.providers {
            labels.extend(p.labels());
        }
        if let Some(rollup) = &self.rollup {
            labels.extend(rollup.counts_at_hours().iter().map(|h| format!("retweets_at_{}_hours", h)));
        }
        labels
    }

    pub fn log_csv_header(&mut self) -> Result<()> {
        let labels = self.header_labels();
        self.out.write_record(&labels)?;
        Ok(())
    }

    pub fn handle_status(&mut self, status: &Record) -> Result<()> {
        self.stats.seen += 1;

        if !self.within_time_bounds(status) {
            self.stats.skipped_time_bounds += 1;
            return Ok(());
        }
        if self.opts.require_english && !is_english(status) {
            self.stats.skipped_language += 1;
            return Ok(());
        }

        if let Some(rollup) = self.rollup.as_mut() {
            let original = match status.get("retweeted_status") {
                Some(o) if !o.is_null() => o,
                _ => return Ok(()),
            };
            match Sighting::from_repost(status, original) {
                Some(sighting) => {
                    if rollup.observe(sighting) {
                        self.stats.sightings_tracked += 1;
                    } else {
                        self.stats.sightings_ignored += 1;
                    }
                }
                None => {
                    tracing::debug!("skipping repost sighting without id, timestamps or retweet_count");
                    self.stats.sightings_ignored += 1;
                }
            }
            return Ok(());
        }

        let row = self.build_row(status, &[])?;
        self.write_row(&row)
    }

    /// Sweep the roll-up aggregator as of `now`, writing every eligible row that meets the
    /// threshold. A no-op outside roll-up mode.
    pub fn finalize(&mut self, now: OffsetDateTime) -> Result<()> {
        let Some(mut rollup) = self.rollup.take() else {
            return Ok(());
        };
        let res = rollup.finalize(now, |r| {
            let row = self.build_row(&r.record, &r.counts_at)?;
            self.write_row(&row)
        });
        let pending = rollup.pending();
        self.rollup = Some(rollup);

        let (emitted, suppressed) = res?;
        self.stats.rollups_suppressed += suppressed as u64;
        tracing::info!(
            "Retweet rollup sweep: {} emitted, {} below threshold, {} pending",
            emitted, suppressed, pending
        );
        self.out.flush()?;
        Ok(())
    }

    /// `finalize` using the builder's clock for "now".
    pub fn finalize_with_clock(&mut self) -> Result<()> {
        let now = self.clock.now();
        self.finalize(now)
    }

    /// Flush and hand back the underlying sink.
    pub fn into_inner(self) -> Result<W> {
        self.out
            .into_inner()
            .map_err(|e| anyhow!("flush csv output: {}", e.error()))
    }

    fn within_time_bounds(&self, status: &Record) -> bool {
        if self.opts.start.is_none() && self.opts.end.is_none() {
            return true;
        }
        let Some(ts) = status.get("created_at").and_then(Record::as_timestamp) else {
            return false;
        };
        self.opts.start.map_or(true, |s| ts >= s) && self.opts.end.map_or(true, |e| ts < e)
    }

    /// Assemble a full row in memory; any error leaves the sink untouched.
    fn build_row(&self, status: &Record, counts_at: &[u64]) -> Result<Vec<String>> {
        let mut row = Vec::with_capacity(self.opts.fields.len());
        for path in &self.opts.fields {
            row.push(resolve(status, path)?);
        }
        for group in &self.entities {
            row.extend(group.extract(status));
        }
        for p in &self.providers {
            let values = p.values(status)?;
            let expected = p.labels().len();
            if values.len() != expected {
                bail!("column provider returned {} values, expected {}", values.len(), expected);
            }
            row.extend(values);
        }
        row.extend(counts_at.iter().map(u64::to_string));
        Ok(row)
    }

    fn write_row(&mut self, row: &[String]) -> Result<()> {
        self.out.write_record(row)?;
        self.stats.written += 1;
        Ok(())
    }
}

/// Only an explicit, non-`en` `user.lang` fails; absent or null passes.
fn is_english(status: &Record) -> bool {
    match lookup(status, "user.lang") {
        None | Some(Record::Null) => true,
        Some(v) => v.as_str() == Some("en"),
    }
}
