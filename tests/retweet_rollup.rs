#[path = "common/mod.rs"]
mod common;

use common::*;
use serde_json::json;
use std::rc::Rc;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};
use tweet_csv::{days, CsvBuilder, CsvOptions, ManualClock, Record, RetweetRollup, Sighting};

const NOW: OffsetDateTime = datetime!(2013-05-10 12:00:00 UTC);

fn ago(d: f64) -> String {
    ts(NOW - days(d))
}

/// Replay a reverse-chronological stream: reposts of ids 3, 2 (three times) and 4, then the
/// originals themselves (which never feed the roll-up), plus an original nobody reposted.
fn play_data(b: &mut CsvBuilder<Vec<u8>>) {
    let statuses = [
        json!({
            "created_at": ago(0.0),
            "retweeted_status": { "id": 3, "created_at": ago(1.0), "retweet_count": 1 },
            "text": "RT not enough time has passed"
        }),
        json!({ "id": 3, "created_at": ago(1.0), "text": "not enough time has passed", "retweet_count": 0 }),
        json!({
            "created_at": ago(1.0),
            "retweeted_status": { "id": 2, "created_at": ago(4.0), "retweet_count": 3 },
            "text": "RT 2 retweets"
        }),
        json!({
            "created_at": ago(2.0),
            "retweeted_status": { "id": 4, "created_at": ago(5.0), "retweet_count": 1 },
            "text": "RT 1 retweet"
        }),
        json!({
            "created_at": ago(3.0),
            "retweeted_status": { "id": 2, "created_at": ago(4.0), "retweet_count": 2 },
            "text": "RT 2 retweets"
        }),
        json!({
            "created_at": ago(3.5),
            "retweeted_status": { "id": 2, "created_at": ago(4.0), "retweet_count": 1 },
            "text": "RT 2 retweets"
        }),
        json!({ "id": 2, "created_at": ago(4.0), "text": "2 retweets", "retweet_count": 0 }),
        json!({ "id": 4, "created_at": ago(5.0), "text": "1 retweet", "retweet_count": 0 }),
        json!({ "id": 5, "created_at": ago(5.1), "text": "no retweets", "retweet_count": 0 }),
    ];
    for s in statuses {
        b.handle_status(&status(s)).unwrap();
    }
}

fn rollup_builder(threshold: u64, window_days: Option<f64>) -> CsvBuilder<Vec<u8>> {
    csv_builder(
        CsvOptions::default()
            .with_fields(["id", "retweet_count"])
            .with_retweet_rollup(threshold, window_days.map(days)),
    )
}

fn run(threshold: u64, window_days: Option<f64>) -> String {
    let mut b = rollup_builder(threshold, window_days);
    play_data(&mut b);
    b.finalize(NOW).unwrap();
    output(b)
}

/// Threshold 2, window 2 days: id 2 reports the count seen at day 2 (2 retweets), id 4 had no
/// sighting inside its window (0), id 3 is still inside its window.
#[test]
fn threshold_and_short_window() {
    assert_eq!(run(2, Some(2.0)), "\"2\",\"2\"\n");
}

/// Threshold 1, window 3 days: id 2 reports 3, id 4 reports its single sighting; first-seen order.
#[test]
fn threshold_one_window_three_days() {
    assert_eq!(run(1, Some(3.0)), "\"2\",\"3\"\n\"4\",\"1\"\n");
}

/// A window longer than the whole replay leaves everything pending.
#[test]
fn long_window_emits_nothing() {
    let mut b = rollup_builder(1, Some(20.0));
    play_data(&mut b);
    b.finalize(NOW).unwrap();
    assert_eq!(b.pending_rollups(), 3);
    assert_eq!(output(b), "");
}

/// Unbounded window: everything is eligible and reports its latest sighting.
#[test]
fn unbounded_window_uses_latest_sighting() {
    assert_eq!(run(1, None), "\"3\",\"1\"\n\"2\",\"3\"\n\"4\",\"1\"\n");
}

/// Sweeping again with the same `now` writes nothing new.
#[test]
fn finalize_is_idempotent() {
    let mut b = rollup_builder(1, None);
    play_data(&mut b);
    b.finalize(NOW).unwrap();
    b.finalize(NOW).unwrap();
    assert_eq!(b.stats().written, 3);
    assert_eq!(output(b), "\"3\",\"1\"\n\"2\",\"3\"\n\"4\",\"1\"\n");
}

/// Sweeps driven by an injected clock: ids become eligible as time moves on, suppressed ids are
/// never retried, and sightings of already-resolved ids are ignored.
#[test]
fn incremental_sweeps_with_manual_clock() {
    let clock = Rc::new(ManualClock::new(NOW - days(1.5)));
    let mut b = rollup_builder(1, Some(2.0)).with_clock(Rc::clone(&clock));
    play_data(&mut b);

    // id 2: cutoff day -2, latest sighting at or before it is day -3 (count 2).
    // id 4: cutoff day -3, no sighting that early -> 0, suppressed.
    // id 3: cutoff day +1, still pending.
    b.finalize_with_clock().unwrap();
    assert_eq!(b.pending_rollups(), 1);
    assert_eq!(b.stats().rollups_suppressed, 1);

    // A late sighting of an emitted id does not reopen it.
    b.handle_status(&status(json!({
        "created_at": ago(-0.5),
        "retweeted_status": { "id": 2, "created_at": ago(4.0), "retweet_count": 50 }
    })))
    .unwrap();
    assert_eq!(b.stats().sightings_ignored, 1);

    // id 3 becomes eligible exactly at its cutoff, day +1.
    clock.set(NOW + days(1.0) - Duration::seconds(1));
    b.finalize_with_clock().unwrap();
    assert_eq!(b.pending_rollups(), 1);
    clock.advance(Duration::seconds(1));
    b.finalize_with_clock().unwrap();
    b.finalize_with_clock().unwrap();
    assert_eq!(b.pending_rollups(), 0);
    assert_eq!(output(b), "\"2\",\"2\"\n\"3\",\"1\"\n");
}

/// Plain statuses never produce rows in roll-up mode, and reposts missing a timestamp,
/// id or count are skipped without creating state.
#[test]
fn plain_and_incomplete_statuses_are_not_tracked() {
    let mut b = rollup_builder(0, None);
    b.handle_status(&status(json!({ "id": 1, "created_at": ago(1.0), "retweet_count": 9 }))).unwrap();
    b.handle_status(&status(json!({ "retweeted_status": { "id": 2, "created_at": ago(2.0), "retweet_count": 1 } }))).unwrap();
    b.handle_status(&status(json!({ "created_at": ago(1.0), "retweeted_status": { "created_at": ago(2.0), "retweet_count": 1 } }))).unwrap();
    b.handle_status(&status(json!({ "created_at": ago(1.0), "retweeted_status": { "id": 3, "created_at": "yesterday", "retweet_count": 1 } }))).unwrap();
    b.handle_status(&status(json!({ "created_at": ago(1.0), "retweeted_status": { "id": 4, "created_at": ago(2.0) } }))).unwrap();
    b.handle_status(&status(json!({ "created_at": ago(1.0), "retweeted_status": null }))).unwrap();
    assert_eq!(b.pending_rollups(), 0);
    assert_eq!(b.stats().sightings_ignored, 4);
    b.finalize(NOW).unwrap();
    assert_eq!(output(b), "");
}

/// Rows carry the original status's other fields, and per-offset counts when configured.
#[test]
fn rollup_rows_include_original_fields_and_offset_counts() {
    let mut b = csv_builder(
        CsvOptions::default()
            .with_fields(["id", "text", "retweet_count"])
            .with_word_count(true)
            .with_retweet_rollup(1, None)
            .with_retweet_counts_at([24, 72]),
    );
    b.log_csv_header().unwrap();
    b.handle_status(&status(json!({
        "created_at": ago(1.0),
        "retweeted_status": { "id": 2, "created_at": ago(4.0), "retweet_count": 3, "text": "the original" }
    })))
    .unwrap();
    b.handle_status(&status(json!({
        "created_at": ago(3.0),
        "retweeted_status": { "id": 2, "created_at": ago(4.0), "retweet_count": 2, "text": "the original" }
    })))
    .unwrap();
    b.finalize(NOW).unwrap();
    assert_eq!(
        output(b),
        "\"id\",\"text\",\"retweet_count\",\"word_count\",\"retweets_at_24_hours\",\"retweets_at_72_hours\"\n\
         \"2\",\"the original\",\"3\",\"2\",\"2\",\"3\"\n"
    );
}

/// Driving the aggregator directly: observations are kept in arrival order, `created_at`
/// comes from the first sighting, and the latest observation wins regardless of arrival order.
#[test]
fn aggregator_tracks_observations_in_arrival_order() {
    let sighting = |observed: f64, created: f64, count: u64| Sighting {
        id: "42".into(),
        created_at: NOW - days(created),
        observed_at: NOW - days(observed),
        count,
        snapshot: Record::map([("id", Record::from(42u64))]),
    };
    let mut agg = RetweetRollup::new(0, Some(days(2.0)));
    assert!(agg.observe(sighting(1.0, 4.0, 9)));
    assert!(agg.observe(sighting(3.0, 3.0, 5)));
    assert!(agg.observe(sighting(2.5, 4.0, 7)));

    let t = &agg.tracked()[0];
    assert_eq!(t.created_at, NOW - days(4.0));
    let counts: Vec<u64> = t.observations().iter().map(|o| o.count).collect();
    assert_eq!(counts, vec![9, 5, 7]);
    assert_eq!(t.count_at(Some(NOW - days(2.0))), 7);
    assert_eq!(t.count_at(None), 9);
    assert_eq!(t.count_at(Some(NOW - days(10.0))), 0);

    let mut rows = Vec::new();
    let (emitted, suppressed) = agg
        .finalize(NOW, |r| {
            rows.push(r);
            Ok(())
        })
        .unwrap();
    assert_eq!((emitted, suppressed), (1, 0));
    assert_eq!(rows[0].record.get("retweet_count").and_then(Record::as_u64), Some(7));
    assert!(!agg.observe(sighting(0.5, 4.0, 11)));
}

/// A failing row leaves its id pending so a later sweep can retry it.
#[test]
fn failed_emit_keeps_id_pending() {
    let mut agg = RetweetRollup::new(0, None);
    agg.observe(Sighting {
        id: "1".into(),
        created_at: NOW - days(2.0),
        observed_at: NOW - days(1.0),
        count: 4,
        snapshot: Record::map([("id", Record::from(1u64))]),
    });
    assert!(agg.finalize(NOW, |_| anyhow::bail!("sink closed")).is_err());
    assert_eq!(agg.pending(), 1);

    let (emitted, _) = agg.finalize(NOW, |_| Ok(())).unwrap();
    assert_eq!(emitted, 1);
    assert_eq!(agg.pending(), 0);
}

/// Eligibility starts at exactly `created_at + window`, and observations sharing the latest
/// timestamp report the one that arrived last.
#[test]
fn cutoff_is_inclusive_and_ties_go_to_the_last_arrival() {
    let created = NOW - days(2.0);
    let sighting = |count: u64| Sighting {
        id: "7".into(),
        created_at: created,
        observed_at: created + Duration::hours(1),
        count,
        snapshot: Record::map([("id", Record::from(7u64))]),
    };
    let mut agg = RetweetRollup::new(0, Some(days(2.0)));
    agg.observe(sighting(5));
    agg.observe(sighting(8));

    let mut rows = Vec::new();
    let swept = agg
        .finalize(NOW - Duration::nanoseconds(1), |r| {
            rows.push(r);
            Ok(())
        })
        .unwrap();
    assert_eq!(swept, (0, 0));
    assert_eq!(agg.pending(), 1);

    let swept = agg
        .finalize(created + days(2.0), |r| {
            rows.push(r);
            Ok(())
        })
        .unwrap();
    assert_eq!(swept, (1, 0));
    assert_eq!(rows[0].record.get("retweet_count").and_then(Record::as_u64), Some(8));
}

/// Originals dated at the end of the calendar stay pending instead of overflowing the cutoff,
/// and an hour offset past the representable range reports the latest count.
#[test]
fn out_of_range_cutoffs_are_never_reached() {
    let far_future = json!({
        "created_at": ago(0.0),
        "retweeted_status": { "id": 1, "created_at": "9999-12-31T00:00:00Z", "retweet_count": 3 }
    });

    let mut b = csv_builder(
        CsvOptions::default()
            .with_fields(["id", "retweet_count"])
            .with_retweet_rollup(0, Some(days(2.0)))
            .with_retweet_counts_at([24, u32::MAX]),
    );
    b.handle_status(&status(far_future.clone())).unwrap();
    b.handle_status(&status(json!({
        "created_at": ago(1.0),
        "retweeted_status": { "id": 2, "created_at": ago(4.0), "retweet_count": 3 }
    })))
    .unwrap();
    b.handle_status(&status(json!({
        "created_at": ago(3.5),
        "retweeted_status": { "id": 2, "created_at": ago(4.0), "retweet_count": 1 }
    })))
    .unwrap();
    b.finalize(NOW).unwrap();
    assert_eq!(b.pending_rollups(), 1);
    assert_eq!(output(b), "\"2\",\"1\",\"1\",\"3\"\n");

    // Unbounded window: the far-future original emits, its 24h offset has no cutoff.
    let mut b = csv_builder(
        CsvOptions::default()
            .with_fields(["id", "retweet_count"])
            .with_retweet_rollup(0, None)
            .with_retweet_counts_at([24]),
    );
    b.handle_status(&status(far_future)).unwrap();
    b.finalize(NOW).unwrap();
    assert_eq!(output(b), "\"1\",\"3\",\"3\"\n");
}
