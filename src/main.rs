use anyhow::{Context, Result};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tweet_csv::{
    create_with_backoff, discover_inputs, enumerate_leaves, for_each_status, init_tracing_once, input_progress,
    take_statuses, total_input_size, CsvBuilder, FieldCounts, RunConfig,
};

const DEFAULT_CONFIG: &str = "./tweet_csv.json";
const READ_BUF: usize = 256 * 1024;
const WRITE_BUF: usize = 256 * 1024;

fn main() -> Result<()> {
    init_tracing_once();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let cfg = RunConfig::load(&config_path)?;

    let files = discover_inputs(&cfg.inputs);
    if files.is_empty() {
        tracing::warn!("No status files found. Check `inputs` in {}.", config_path.display());
    } else {
        tracing::info!("Planned {} files for processing.", files.len());
    }

    if cfg.sample_fields > 0 {
        return print_field_sample(&files, cfg.sample_fields);
    }

    let sink: Box<dyn Write> = match &cfg.output {
        Some(p) => {
            let f = create_with_backoff(p, 16, 50).with_context(|| format!("create {}", p.display()))?;
            Box::new(BufWriter::with_capacity(WRITE_BUF, f))
        }
        None => Box::new(io::stdout().lock()),
    };

    let mut builder = CsvBuilder::new(cfg.to_options()?, sink)?;
    if cfg.header {
        builder.log_csv_header()?;
    }

    let pb = input_progress(total_input_size(&files), "Converting statuses", cfg.progress);
    let mut malformed = 0u64;
    for path in &files {
        malformed += for_each_status(path, READ_BUF, |delta| pb.inc(delta), |status| builder.handle_status(&status))
            .with_context(|| format!("processing {}", path.display()))?;
    }
    pb.finish_with_message("Converting statuses: done");

    builder.finalize_with_clock()?;
    let stats = builder.stats();
    let pending = builder.pending_rollups();
    builder.into_inner()?.flush()?;

    tracing::info!(
        "Done: {} statuses seen, {} rows written, {} skipped (language), {} skipped (time bounds), {} malformed lines",
        stats.seen, stats.written, stats.skipped_language, stats.skipped_time_bounds, malformed
    );
    if pending > 0 {
        tracing::info!("{} rolled-up statuses are still inside their retweet window", pending);
    }
    Ok(())
}

/// Count leaf paths over the first `limit` statuses and print `path<TAB>count`.
fn print_field_sample(files: &[PathBuf], limit: usize) -> Result<()> {
    let limit = limit as u64;
    let mut counts = FieldCounts::new();
    let mut sampled = 0u64;
    let mut malformed = 0u64;
    for path in files {
        let c = take_statuses(path, READ_BUF, limit - sampled, |status| {
            enumerate_leaves(&status, &mut counts);
            Ok(())
        })
        .with_context(|| format!("sampling {}", path.display()))?;
        sampled += c.statuses;
        malformed += c.malformed;
        if sampled >= limit {
            break;
        }
    }
    tracing::info!(
        "Sampled {} statuses, {} distinct leaf paths, {} malformed lines",
        sampled,
        counts.len(),
        malformed
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (path, n) in &counts {
        writeln!(out, "{}\t{}", path, n)?;
    }
    out.flush()?;
    Ok(())
}
