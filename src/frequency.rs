//! Insertion-ordered frequency tables and the per-year statistics file format.
//!
//! A statistics file holds one entity per line, in extraction order:
//!
//! ```text
//! NER: Environmental Protection Agency	Frequency: 12
//! ```

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Entity counts that remember first-seen order.
///
/// Iteration follows the order in which keys were first added, so sorting
/// the entries with a stable sort breaks frequency ties by extraction order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    order: Vec<String>,
    counts: HashMap<String, u64>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` to `key`; counts saturate at `u64::MAX`.
    pub fn add(&mut self, key: &str, n: u64) {
        match self.counts.get_mut(key) {
            Some(count) => *count = count.saturating_add(n),
            None => {
                self.order.push(key.to_string());
                self.counts.insert(key.to_string(), n);
            }
        }
    }

    pub fn increment(&mut self, key: &str) {
        self.add(key, 1);
    }

    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().fold(0, |acc, n| acc.saturating_add(*n))
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.order.iter().map(|k| (k.as_str(), self.counts[k]))
    }

    /// Adds every entry of `other`, keeping this table's order for known keys.
    pub fn merge(&mut self, other: &FrequencyTable) {
        for (key, n) in other.iter() {
            self.add(key, n);
        }
    }

    ///Entries sorted by frequency, descending; ties keep first-seen order.
    /// # Example
    /// ```
    /// use entity_trends::FrequencyTable;
    /// let mut t = FrequencyTable::new();
    /// t.add("Shell", 2);
    /// t.add("EPA", 5);
    /// t.add("Exxon", 2);
    /// let sorted = t.sorted();
    /// assert_eq!(sorted, vec![("EPA".to_string(), 5), ("Shell".to_string(), 2), ("Exxon".to_string(), 2)]);
    /// ```
    pub fn sorted(&self) -> Vec<(String, u64)> {
        let mut vec_sorted: Vec<(String, u64)> =
            self.iter().map(|(k, n)| (k.to_string(), n)).collect();
        vec_sorted.sort_by(|a, b| b.1.cmp(&a.1));
        vec_sorted
    }

    /// The `n` most frequent entries (fewer if the table is smaller).
    pub fn top_n(&self, n: usize) -> Vec<(String, u64)> {
        let mut sorted = self.sorted();
        sorted.truncate(n);
        sorted
    }
}

fn stats_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"NER:\s*(.*?)\s*Frequency:\s*(\d+)").expect("static stats line pattern")
    })
}

/// Parses one `NER: <entity>\tFrequency: <n>` line.
pub fn parse_stats_line(line: &str) -> Option<(String, u64)> {
    let caps = stats_line_regex().captures(line)?;
    let entity = caps.get(1)?.as_str().to_string();
    let frequency = caps.get(2)?.as_str().parse().ok()?;
    Some((entity, frequency))
}

pub fn format_stats_line(entity: &str, frequency: u64) -> String {
    format!("NER: {entity}\tFrequency: {frequency}")
}

/// Writes a table as a statistics file, one line per entity in table order.
pub fn write_stats_file(path: &Path, table: &FrequencyTable) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut out = BufWriter::new(file);
    for (entity, frequency) in table.iter() {
        writeln!(out, "{}", format_stats_line(entity, frequency)).map_err(|e| Error::io(path, e))?;
    }
    out.flush().map_err(|e| Error::io(path, e))
}

/// Reads a statistics file. Lines that do not match the format are ignored;
/// an entity listed twice has its counts summed.
pub fn read_stats_file(path: &Path) -> Result<FrequencyTable> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut table = FrequencyTable::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| Error::io(path, e))?;
        if let Some((entity, frequency)) = parse_stats_line(&line) {
            table.add(&entity, frequency);
        }
    }
    Ok(table)
}
