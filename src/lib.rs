#![forbid(unsafe_code)]
//! # entity_trends
//!
//! Named-entity timelines for a corpus of legal and regulatory documents.
//!
//! The corpus is a directory of year folders (`data/2014/*.txt`). The batch
//! stages run in order, each reading complete files and writing complete files:
//!
//! 1. [`run_extraction`]: tag entities per document, write `<YYYY>_ner_statistics.txt`.
//! 2. [`run_combine`]: sum the yearly files, write the combined table and the top-N.
//! 3. [`run_timeline`]: resolve raw entity strings to canonical entities per year.
//! 4. [`run_ranking`]: find the document mentioning each entity most, per year.
//! 5. [`run_urls`]: turn those document names into source URLs.
//!
//! The [`dashboard`] module renders the resulting CSV files as a static HTML
//! dashboard with Plotly charts.

use std::fmt;
use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

pub mod alias;
pub mod charts;
pub mod combine;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod frequency;
pub mod map;
pub mod ner;
pub mod rank;
pub mod text;
pub mod timeline;
pub mod url;

pub use alias::{AliasTable, EntityClass, EntityRecord};
pub use combine::{CombineSummary, run_combine};
pub use config::{DashboardOptions, PipelineOptions};
pub use dashboard::render_dashboard;
pub use error::{Error, Result};
pub use extract::{ExtractionReport, YearStats, run_extraction};
pub use frequency::FrequencyTable;
pub use ner::{CommandRecognizer, Entity, EntityRecognizer, HeuristicRecognizer};
pub use rank::{DocumentTable, run_ranking};
pub use text::preprocess_text;
pub use timeline::{Timeline, run_timeline};
pub use url::{HttpHeadCheck, LinkCheck, Offline, UrlResolver, run_urls};

/// A document left out of a stage, with the reason.
#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

impl SkippedFile {
    pub fn new(path: &Path, reason: impl fmt::Display) -> Self {
        SkippedFile {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Prints skipped documents to stderr.
pub fn print_skipped_files(skipped: &[SkippedFile]) {
    eprintln!("\nSkipped {} file(s):", skipped.len());
    for s in skipped {
        eprintln!("  {}: {}", s.path.display(), s.reason);
    }
}

/// Year folders directly under `data_dir` (four-digit names), ascending.
pub fn year_folders(data_dir: &Path) -> Result<Vec<(i32, PathBuf)>> {
    if !data_dir.is_dir() {
        return Err(Error::io(
            data_dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "corpus directory not found"),
        ));
    }
    let mut years: Vec<(i32, PathBuf)> = WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| {
            let year = parse_year(entry.file_name().to_str()?)?;
            Some((year, entry.into_path()))
        })
        .collect();
    years.sort();
    Ok(years)
}

fn parse_year(name: &str) -> Option<i32> {
    if name.len() == 4 && name.bytes().all(|b| b.is_ascii_digit()) {
        name.parse().ok()
    } else {
        None
    }
}

/// `.txt` documents directly inside `folder`, sorted by file name.
pub fn collect_documents(folder: &Path) -> Vec<PathBuf> {
    WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Cannot list {}: {e}", folder.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .collect()
}

/// Neutralizes cells a spreadsheet would evaluate as a formula by prefixing
/// a single quote.
///
/// Cells already starting with a quote get one more, so distinct entities stay
/// distinct and stripping one leading `'` restores the original text.
pub fn csv_safe_cell(cell: String) -> String {
    if cell.starts_with(['=', '+', '-', '@', '\t', '\r', '\'']) {
        format!("'{cell}")
    } else {
        cell
    }
}
