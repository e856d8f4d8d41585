use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const STATUS_EXTENSIONS: &[&str] = &["json", "jsonl", "ndjson", "zst"];

fn is_status_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| STATUS_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Expand `inputs` into the status files to read. Files are taken as given;
/// directories are walked recursively for `.json`/`.jsonl`/`.ndjson`/`.zst` files.
/// Each directory's matches are sorted by path; missing inputs are skipped with a warning.
pub fn discover_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
        } else if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .min_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_status_file(e.path()))
                .map(|e| e.path().to_path_buf())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            tracing::warn!("input {} does not exist; skipping", input.display());
        }
    }
    files
}

pub fn total_input_size(files: &[PathBuf]) -> u64 {
    files.iter().map(|p| fs::metadata(p).map(|m| m.len()).unwrap_or(0)).sum()
}
