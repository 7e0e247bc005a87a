//! Entity extraction over a year-partitioned corpus.

use std::path::Path;

use log::{error, info, warn};

use crate::config::PipelineOptions;
use crate::error::{Error, Result};
use crate::frequency::{FrequencyTable, write_stats_file};
use crate::ner::EntityRecognizer;
use crate::text::{preprocess_text, read_document};
use crate::{SkippedFile, collect_documents, year_folders};

/// Entity counts of one year folder.
#[derive(Debug, Clone)]
pub struct YearStats {
    pub year: i32,
    pub documents: usize,
    pub entities: FrequencyTable,
}

/// Outcome of an extraction run.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub years: Vec<YearStats>,
    /// Counts over every processed document of every year.
    pub all_years: FrequencyTable,
    pub skipped: Vec<SkippedFile>,
}

/// Extracts one cleaned document, keeping entities whose label is not excluded.
pub fn extract_document(
    text: &str,
    recognizer: &dyn EntityRecognizer,
    opts: &PipelineOptions,
) -> Result<Vec<String>> {
    let cleaned = preprocess_text(text);
    let len = cleaned.chars().count();
    if len > opts.max_length {
        return Err(Error::TooLong {
            len,
            max: opts.max_length,
        });
    }
    let entities = recognizer.recognize(&cleaned)?;
    Ok(entities
        .into_iter()
        .filter(|e| !opts.is_excluded(&e.label))
        .map(|e| e.text)
        .collect())
}

/// Counts the entities of every `.txt` document in one year folder.
///
/// Unreadable, oversized and untaggable documents are logged, appended to
/// `skipped`, and left out of the counts.
pub fn extract_year(
    year: i32,
    folder: &Path,
    recognizer: &dyn EntityRecognizer,
    opts: &PipelineOptions,
    skipped: &mut Vec<SkippedFile>,
) -> YearStats {
    let mut stats = YearStats {
        year,
        documents: 0,
        entities: FrequencyTable::new(),
    };

    for path in collect_documents(folder) {
        let outcome = read_document(&path).and_then(|text| extract_document(&text, recognizer, opts));
        match outcome {
            Ok(entities) => {
                for entity in &entities {
                    stats.entities.increment(entity);
                }
                stats.documents += 1;
            }
            Err(e @ Error::TooLong { .. }) => {
                warn!("{e} for file {}, skipping", path.display());
                skipped.push(SkippedFile::new(&path, e));
            }
            Err(e) => {
                error!("Error occurred in processing of the file {}: {e}", path.display());
                skipped.push(SkippedFile::new(&path, e));
            }
        }
    }
    stats
}

/// Runs extraction over every year folder of `opts.data_dir` and writes one
/// statistics file per year into `opts.stats_dir`.
pub fn run_extraction(
    opts: &PipelineOptions,
    recognizer: &dyn EntityRecognizer,
) -> Result<ExtractionReport> {
    let mut report = ExtractionReport::default();

    for (year, folder) in year_folders(&opts.data_dir)? {
        let stats = extract_year(year, &folder, recognizer, opts, &mut report.skipped);
        let out = opts.stats_file(year);
        write_stats_file(&out, &stats.entities)?;
        info!(
            "NER statistics for {year} ({} documents, {} entities) saved to {}",
            stats.documents,
            stats.entities.len(),
            out.display()
        );
        report.all_years.merge(&stats.entities);
        report.years.push(stats);
    }
    Ok(report)
}
