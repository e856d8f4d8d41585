mod config;
mod date;
mod record;

mod field_path;
mod entities;
mod sentiment;
mod columns;
mod retweet;
mod clock;
mod builder;

mod ndjson;
mod paths;
mod progress;
mod util;

pub use crate::config::{MAX_WINDOW_DAYS, CsvOptions, RetweetMode, RunConfig};
pub use crate::date::{days, format_timestamp, hours, parse_timestamp};
pub use crate::record::Record;

// Row pipeline.
pub use crate::builder::{BuilderStats, CsvBuilder};
pub use crate::field_path::{enumerate_leaves, lookup, resolve, FieldCounts};
pub use crate::entities::{configured_groups, EntityColumns, EntityKind};
pub use crate::columns::{ColumnProvider, SentimentColumns, WordCountColumn};
pub use crate::sentiment::{Lexicon, SentimentScore};

// Retweet roll-up and its clock.
pub use crate::retweet::{Observation, RetweetRollup, RolledUp, Sighting, TrackState, TrackedOriginal};
pub use crate::clock::{Clock, ManualClock, SystemClock};

// Input replay helpers for binaries.
pub use crate::ndjson::{for_each_status, is_zst, parse_status, take_statuses, StatusReader, StreamCounts};
pub use crate::paths::{discover_inputs, total_input_size};
pub use crate::progress::input_progress;
pub use crate::util::{create_with_backoff, init_tracing_once, open_with_backoff};
