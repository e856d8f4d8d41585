//! Retweet roll-up: collapse many sightings of the same original status into one row.
//!
//! Each repost carries a snapshot of its original's `retweet_count` at repost time. Sightings
//! are grouped by original id in first-seen order. A sweep (`finalize`) resolves every pending
//! id whose window has elapsed: the reported count is taken from the latest observation at or
//! before `created_at + window`, and a row is emitted when it reaches the threshold.
//! Resolved ids never emit again and ignore later sightings.

use crate::date::hours;
use crate::record::Record;
use anyhow::Result;
use time::{Duration, OffsetDateTime};

/// One timestamped engagement-count snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    pub observed_at: OffsetDateTime,
    pub count: u64,
}

/// A repost sighting of an original status, ready to feed the aggregator.
#[derive(Clone, Debug)]
pub struct Sighting {
    pub id: String,
    pub created_at: OffsetDateTime,
    pub observed_at: OffsetDateTime,
    pub count: u64,
    /// The embedded original status as seen in this repost.
    pub snapshot: Record,
}

impl Sighting {
    /// Read a sighting from a repost `status` embedding `original`.
    /// `None` when the id, either timestamp, or the count is missing or unparseable.
    pub fn from_repost(status: &Record, original: &Record) -> Option<Sighting> {
        let id = original
            .get("id")
            .or_else(|| original.get("id_str"))
            .and_then(|v| v.render_scalar().ok().flatten())
            .filter(|s| !s.is_empty())?;
        let created_at = original.get("created_at")?.as_timestamp()?;
        let observed_at = status.get("created_at")?.as_timestamp()?;
        let count = original.get("retweet_count")?.as_u64()?;
        Some(Sighting { id, created_at, observed_at, count, snapshot: original.clone() })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackState {
    Pending,
    Resolved,
}

#[derive(Clone, Debug)]
pub struct TrackedOriginal {
    pub id: String,
    pub created_at: OffsetDateTime,
    pub state: TrackState,
    snapshot: Record,
    observations: Vec<Observation>,
}

impl TrackedOriginal {
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Count from the latest observation at or before `cutoff` (`None` = no cutoff); 0 if none.
    /// Among observations sharing the latest `observed_at`, the last one recorded wins.
    pub fn count_at(&self, cutoff: Option<OffsetDateTime>) -> u64 {
        self.observations
            .iter()
            .filter(|o| cutoff.map_or(true, |c| o.observed_at <= c))
            .max_by_key(|o| o.observed_at)
            .map(|o| o.count)
            .unwrap_or(0)
    }
}

/// A row produced by a sweep: the original status with its rolled-up `retweet_count`,
/// plus counts at each configured hour offset.
#[derive(Clone, Debug)]
pub struct RolledUp {
    pub record: Record,
    pub counts_at: Vec<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct RetweetRollup {
    threshold: u64,
    window: Option<Duration>,
    counts_at_hours: Vec<u32>,
    tracked: Vec<TrackedOriginal>,
    index: ahash::AHashMap<String, usize>,
}

impl RetweetRollup {
    /// `window == None` means every tracked id is immediately eligible.
    pub fn new(threshold: u64, window: Option<Duration>) -> Self {
        Self { threshold, window, ..Default::default() }
    }

    pub fn with_counts_at_hours(mut self, hours: Vec<u32>) -> Self {
        self.counts_at_hours = hours;
        self
    }

    /// Record a sighting. Returns `false` when the id was already resolved and the sighting ignored.
    pub fn observe(&mut self, s: Sighting) -> bool {
        let idx = match self.index.get(&s.id) {
            Some(&idx) => idx,
            None => {
                let idx = self.tracked.len();
                self.index.insert(s.id.clone(), idx);
                self.tracked.push(TrackedOriginal {
                    id: s.id,
                    created_at: s.created_at,
                    state: TrackState::Pending,
                    snapshot: s.snapshot,
                    observations: Vec::new(),
                });
                idx
            }
        };
        let t = &mut self.tracked[idx];
        if t.state == TrackState::Resolved {
            return false;
        }
        t.observations.push(Observation { observed_at: s.observed_at, count: s.count });
        true
    }

    /// Resolve every eligible pending id in first-seen order, handing rows that meet the
    /// threshold to `emit`. An id whose `emit` fails stays pending.
    /// Returns `(emitted, suppressed)`.
    pub fn finalize(
        &mut self,
        now: OffsetDateTime,
        mut emit: impl FnMut(RolledUp) -> Result<()>,
    ) -> Result<(usize, usize)> {
        let mut emitted = 0;
        let mut suppressed = 0;
        for t in self.tracked.iter_mut().filter(|t| t.state == TrackState::Pending) {
            // A cutoff past the representable range never elapses.
            let cutoff = match self.window {
                Some(w) => match t.created_at.checked_add(w) {
                    Some(cutoff) if now >= cutoff => Some(cutoff),
                    _ => continue,
                },
                None => None,
            };

            let count = t.count_at(cutoff);
            if count >= self.threshold {
                let mut record = t.snapshot.clone();
                record.insert("id", Record::text(t.id.clone()));
                record.insert("retweet_count", Record::from(count));
                let counts_at = self
                    .counts_at_hours
                    .iter()
                    .map(|h| t.count_at(t.created_at.checked_add(hours(*h))))
                    .collect();
                emit(RolledUp { record, counts_at })?;
                emitted += 1;
            } else {
                tracing::debug!("retweet rollup: {} below threshold ({} < {})", t.id, count, self.threshold);
                suppressed += 1;
            }
            t.state = TrackState::Resolved;
            t.observations = Vec::new();
            t.snapshot = Record::Null;
        }
        Ok((emitted, suppressed))
    }

    pub fn tracked(&self) -> &[TrackedOriginal] {
        &self.tracked
    }

    pub fn pending(&self) -> usize {
        self.tracked.iter().filter(|t| t.state == TrackState::Pending).count()
    }

    pub fn counts_at_hours(&self) -> &[u32] {
        &self.counts_at_hours
    }
}
