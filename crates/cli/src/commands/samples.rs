//! JSON Lines training data.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reads one JSON value per non-blank line.
///
/// # Errors
/// Returns an error naming the file and line if the file cannot be read or a
/// line does not parse.
pub fn load_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_jsonl(BufReader::new(file)).with_context(|| format!("reading {}", path.display()))
}

fn read_jsonl<T: DeserializeOwned>(reader: impl BufRead) -> Result<Vec<T>> {
    let mut items = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).with_context(|| format!("line {}", index + 1))?;
        items.push(item);
    }
    Ok(items)
}
