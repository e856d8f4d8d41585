use crate::record::Record;
use crate::util::open_with_backoff;
use anyhow::{Context, Result};
use serde_json::Value;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use zstd::stream::read::Decoder;

/// A `Read` wrapper that counts on-disk (possibly compressed) bytes read.
struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}
impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Line reader over a newline-delimited JSON status file, plain or `.zst`.
/// Strips trailing `\r?\n`.
pub struct StatusReader {
    rdr: Box<dyn BufRead>,
    counter: Arc<AtomicU64>,
    reported: u64,
}

impl StatusReader {
    pub fn open(path: &Path, buf_bytes: usize) -> Result<Self> {
        let f = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
        let counter = Arc::new(AtomicU64::new(0));
        let cnt = CountingReader { inner: f, counter: counter.clone() };
        let cap = buf_bytes.max(8 * 1024);
        let rdr: Box<dyn BufRead> = if is_zst(path) {
            let mut decoder = Decoder::new(cnt).with_context(|| format!("zstd decoder {}", path.display()))?;
            // Large frames need a wide window.
            decoder.window_log_max(31)?;
            Box::new(BufReader::with_capacity(cap, decoder))
        } else {
            Box::new(BufReader::with_capacity(cap, cnt))
        };
        Ok(Self { rdr, counter, reported: 0 })
    }

    /// Read the next line into `buf`. Returns the number of bytes read (0 on EOF).
    pub fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        buf.clear();
        let n = self.rdr.read_line(buf)?;
        if n == 0 { return Ok(0); }
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') { buf.pop(); }
        }
        Ok(n)
    }

    /// On-disk bytes consumed since the last call.
    pub fn take_progress(&mut self) -> u64 {
        let cur = self.counter.load(Ordering::Relaxed);
        let delta = cur.saturating_sub(self.reported);
        self.reported = cur;
        delta
    }
}

pub fn is_zst(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).map_or(false, |e| e.eq_ignore_ascii_case("zst"))
}

/// Parse one JSON line into a `Record`.
#[inline]
pub fn parse_status(line: &str) -> Result<Record> {
    let v: Value = serde_json::from_str(line)?;
    Ok(Record::from(v))
}

/// Tallies from streaming one file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamCounts {
    pub statuses: u64,
    pub malformed: u64,
}

/// Stream every status in `path` to `on_status`, reporting on-disk bytes via `on_progress`.
/// Blank lines are ignored; malformed lines are logged and skipped.
/// Returns the number of malformed lines.
pub fn for_each_status(
    path: &Path,
    read_buf_bytes: usize,
    on_progress: impl FnMut(u64),
    on_status: impl FnMut(Record) -> Result<()>,
) -> Result<u64> {
    stream_statuses(path, read_buf_bytes, u64::MAX, on_progress, on_status).map(|c| c.malformed)
}

/// Like `for_each_status`, but stops once `limit` statuses have been handed over.
pub fn take_statuses(
    path: &Path,
    read_buf_bytes: usize,
    limit: u64,
    on_status: impl FnMut(Record) -> Result<()>,
) -> Result<StreamCounts> {
    stream_statuses(path, read_buf_bytes, limit, |_| {}, on_status)
}

fn stream_statuses(
    path: &Path,
    read_buf_bytes: usize,
    limit: u64,
    mut on_progress: impl FnMut(u64),
    mut on_status: impl FnMut(Record) -> Result<()>,
) -> Result<StreamCounts> {
    let mut rdr = StatusReader::open(path, read_buf_bytes)?;
    let mut buf = String::with_capacity(16 * 1024);
    let mut counts = StreamCounts::default();
    let mut line_no = 0u64;
    while counts.statuses < limit {
        let n = rdr.read_line(&mut buf).with_context(|| format!("read {}", path.display()))?;
        if n == 0 { break; }
        line_no += 1;
        on_progress(rdr.take_progress());
        if buf.trim().is_empty() { continue; }
        match parse_status(&buf) {
            Ok(rec) => {
                counts.statuses += 1;
                on_status(rec)?;
            }
            Err(e) => {
                counts.malformed += 1;
                tracing::warn!("{}:{}: skipping malformed status: {}", path.display(), line_no, e);
            }
        }
    }
    on_progress(rdr.take_progress());
    Ok(counts)
}
