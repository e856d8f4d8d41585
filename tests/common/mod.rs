#![allow(dead_code)]

use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use time::OffsetDateTime;
use tweet_csv::{format_timestamp, CsvBuilder, CsvOptions, Lexicon, Record};

/// Builder writing into an in-memory buffer.
pub fn csv_builder(opts: CsvOptions) -> CsvBuilder<Vec<u8>> {
    CsvBuilder::new(opts, Vec::new()).unwrap()
}

/// Flush the builder and return everything it wrote.
pub fn output(builder: CsvBuilder<Vec<u8>>) -> String {
    String::from_utf8(builder.into_inner().unwrap()).unwrap()
}

pub fn status(v: Value) -> Record {
    Record::from(v)
}

pub fn ts(t: OffsetDateTime) -> String {
    format_timestamp(t).unwrap()
}

/// A tiny AFINN-style lexicon covering single words, spaced phrases and hyphenated phrases.
/// `kind` and `bitch` are present so that longer phrases must win over their parts.
pub fn small_lexicon() -> Arc<Lexicon> {
    Arc::new(Lexicon::from_pairs([
        ("love", 3),
        ("like", 2),
        ("cool", 1),
        ("kind", 2),
        ("bitch", -5),
        ("some kind", 0),
        ("once-in-a-lifetime", 3),
        ("right direction", 3),
        ("son-of-a-bitch", -5),
    ]))
}

/// Write newline-delimited lines to a plain file.
pub fn write_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    for l in lines {
        writeln!(&mut f, "{}", l).unwrap();
    }
}

/// Write a compressed `.zst` file containing the provided lines.
pub fn write_zst_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}
