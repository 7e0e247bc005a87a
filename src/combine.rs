//! Merges the per-year statistics files into all-time totals.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use csv::WriterBuilder;
use log::info;
use regex::Regex;
use walkdir::WalkDir;

use crate::config::PipelineOptions;
use crate::csv_safe_cell;
use crate::error::{Error, Result};
use crate::frequency::{FrequencyTable, read_stats_file};

#[derive(Debug)]
pub struct CombineSummary {
    pub years: Vec<i32>,
    pub combined: FrequencyTable,
    pub top: Vec<(String, u64)>,
    pub combined_csv: PathBuf,
    pub top_csv: PathBuf,
}

fn stats_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})_ner_statistics\.txt$").expect("static file pattern"))
}

/// Statistics files in `stats_dir`, keyed by year, ascending.
pub fn stats_files(stats_dir: &Path) -> Result<Vec<(i32, PathBuf)>> {
    if !stats_dir.is_dir() {
        return Err(Error::io(
            stats_dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "statistics directory not found"),
        ));
    }
    let mut files: Vec<(i32, PathBuf)> = WalkDir::new(stats_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let caps = stats_name_regex().captures(entry.file_name().to_str()?)?;
            let year = caps[1].parse().ok()?;
            Some((year, entry.into_path()))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Per-year tables read back from the statistics files.
pub fn read_year_tables(stats_dir: &Path) -> Result<Vec<(i32, FrequencyTable)>> {
    stats_files(stats_dir)?
        .into_iter()
        .map(|(year, path)| -> Result<(i32, FrequencyTable)> {
            Ok((year, read_stats_file(&path)?))
        })
        .collect()
}

/// Sums per-year tables; the result lists entities in first-seen order.
pub fn combine_tables(tables: &[(i32, FrequencyTable)]) -> FrequencyTable {
    let mut combined = FrequencyTable::new();
    for (_, table) in tables {
        combined.merge(table);
    }
    combined
}

/// Writes `NER,Frequency` rows.
pub fn write_frequency_csv(path: &Path, rows: &[(String, u64)]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record(["NER", "Frequency"])?;
    for (entity, frequency) in rows {
        wtr.write_record([csv_safe_cell(entity.clone()), frequency.to_string()])?;
    }
    wtr.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Combines every `<YYYY>_ner_statistics.txt` and writes the full table and the top-N.
pub fn run_combine(opts: &PipelineOptions) -> Result<CombineSummary> {
    let tables = read_year_tables(&opts.stats_dir)?;
    let combined = combine_tables(&tables);

    let all: Vec<(String, u64)> = combined.iter().map(|(k, n)| (k.to_string(), n)).collect();
    let combined_csv = opts.combined_csv();
    write_frequency_csv(&combined_csv, &all)?;
    info!("Saved {} combined entities to {}", all.len(), combined_csv.display());

    let top = combined.top_n(opts.top_n);
    let top_csv = opts.top_csv();
    write_frequency_csv(&top_csv, &top)?;
    info!("Saved top {} to {}", top.len(), top_csv.display());

    Ok(CombineSummary {
        years: tables.iter().map(|(y, _)| *y).collect(),
        combined,
        top,
        combined_csv,
        top_csv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::write_stats_file;

    fn table(entries: &[(&str, u64)]) -> FrequencyTable {
        let mut t = FrequencyTable::new();
        for (k, n) in entries {
            t.add(k, *n);
        }
        t
    }

    #[test]
    fn combined_equals_sum_of_years() {
        let tables = vec![
            (2010, table(&[("EPA", 3), ("Shell", 1)])),
            (2011, table(&[("Shell", 4), ("FERC", 2)])),
            (2012, table(&[("EPA", 1)])),
        ];
        let combined = combine_tables(&tables);
        for (entity, _) in combined.iter() {
            let per_year: u64 = tables.iter().map(|(_, t)| t.get(entity)).sum();
            assert_eq!(combined.get(entity), per_year, "{entity}");
        }
        let order: Vec<&str> = combined.iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["EPA", "Shell", "FERC"]);
    }

    #[test]
    fn run_combine_writes_both_tables() {
        let root = tempfile::tempdir().unwrap();
        let opts = PipelineOptions {
            stats_dir: root.path().join("stats"),
            output_dir: root.path().join("output"),
            top_n: 2,
            ..PipelineOptions::default()
        };
        write_stats_file(&opts.stats_file(2011), &table(&[("Shell", 2), ("=cmd", 1)])).unwrap();
        write_stats_file(&opts.stats_file(2010), &table(&[("EPA", 2), ("Shell", 1)])).unwrap();
        fs::write(opts.stats_dir.join("notes.txt"), "NER: Bogus\tFrequency: 99\n").unwrap();

        let summary = run_combine(&opts).unwrap();
        assert_eq!(summary.years, vec![2010, 2011]);
        assert_eq!(
            summary.top,
            vec![("Shell".to_string(), 3), ("EPA".to_string(), 2)]
        );

        let combined = fs::read_to_string(&summary.combined_csv).unwrap();
        assert_eq!(combined, "NER,Frequency\nEPA,2\nShell,3\n'=cmd,1\n");
        let top = fs::read_to_string(root.path().join("output").join("top_2.csv")).unwrap();
        assert_eq!(top, "NER,Frequency\nShell,3\nEPA,2\n");
    }

    #[test]
    fn escaped_entities_keep_distinct_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output_data.csv");
        let rows = vec![("=x".to_string(), 2), ("'=x".to_string(), 1)];
        write_frequency_csv(&path, &rows).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "NER,Frequency\n'=x,2\n''=x,1\n"
        );
    }

    #[test]
    fn missing_stats_dir_is_error() {
        let root = tempfile::tempdir().unwrap();
        assert!(stats_files(&root.path().join("missing")).is_err());
    }
}
