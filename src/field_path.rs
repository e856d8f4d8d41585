//! Dot-path addressing over nested records, plus leaf-path discovery for schema sampling.

use crate::record::Record;
use anyhow::Result;
use std::collections::BTreeMap;

/// Leaf path -> number of times it was seen. Shared across calls to accumulate.
pub type FieldCounts = BTreeMap<String, u64>;

/// Walk `path` (e.g. `"user.lang"`) through nested maps.
/// Returns `None` as soon as a segment is missing or the current value is not a map.
pub fn lookup<'a>(record: &'a Record, path: &str) -> Option<&'a Record> {
    let mut cur = record;
    for seg in path.split('.') {
        cur = cur.get(seg)?;
    }
    Some(cur)
}

/// Resolve a dot-path to CSV text. Absent paths and non-scalar targets yield `""`.
pub fn resolve(record: &Record, path: &str) -> Result<String> {
    match lookup(record, path) {
        Some(v) => Ok(v.render_scalar()?.unwrap_or_default()),
        None => Ok(String::new()),
    }
}

/// Count every leaf path in `record` into `counts`. Intermediate map paths are not counted.
pub fn enumerate_leaves(record: &Record, counts: &mut FieldCounts) {
    if let Record::Map(m) = record {
        for (key, value) in m {
            visit(value, key.clone(), counts);
        }
    }
}

fn visit(value: &Record, path: String, counts: &mut FieldCounts) {
    match value {
        Record::Map(m) => {
            for (key, child) in m {
                visit(child, format!("{}.{}", path, key), counts);
            }
        }
        _ => *counts.entry(path).or_insert(0) += 1,
    }
}
