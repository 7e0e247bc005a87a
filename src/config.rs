use std::path::{Path, PathBuf};

use crate::ner::DEFAULT_EXCLUDED_LABELS;

/// spaCy's default `max_length` raised to fit long court filings.
pub const DEFAULT_MAX_LENGTH: usize = 5_000_000;
pub const DEFAULT_TOP_N: usize = 50;
pub const DEFAULT_BUBBLE_FROM_YEAR: i32 = 2004;

/// Options shared by the batch stages.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Corpus root holding one folder per year (`<data_dir>/2014/*.txt`).
    pub data_dir: PathBuf,
    /// Where the per-year `<YYYY>_ner_statistics.txt` files go.
    pub stats_dir: PathBuf,
    /// Where the CSV tables go.
    pub output_dir: PathBuf,
    /// Documents whose cleaned text is longer than this many characters are skipped.
    pub max_length: usize,
    /// Entity labels dropped before counting.
    pub excluded_labels: Vec<String>,
    /// Size of the combined top list.
    pub top_n: usize,
    /// Optional year range for document ranking; `None` means all year folders.
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            data_dir: PathBuf::from("data"),
            stats_dir: PathBuf::from("stats"),
            output_dir: PathBuf::from("output"),
            max_length: DEFAULT_MAX_LENGTH,
            excluded_labels: DEFAULT_EXCLUDED_LABELS
                .iter()
                .map(|l| l.to_string())
                .collect(),
            top_n: DEFAULT_TOP_N,
            from_year: None,
            to_year: None,
        }
    }
}

impl PipelineOptions {
    pub fn is_excluded(&self, label: &str) -> bool {
        self.excluded_labels.iter().any(|l| l == label)
    }

    pub fn in_year_range(&self, year: i32) -> bool {
        self.from_year.is_none_or(|from| year >= from) && self.to_year.is_none_or(|to| year <= to)
    }

    pub fn stats_file(&self, year: i32) -> PathBuf {
        self.stats_dir.join(format!("{year}_ner_statistics.txt"))
    }

    pub fn combined_csv(&self) -> PathBuf {
        self.output_dir.join("output_data.csv")
    }

    pub fn top_csv(&self) -> PathBuf {
        self.output_dir.join(format!("top_{}.csv", self.top_n))
    }

    pub fn timeline_csv(&self) -> PathBuf {
        self.output_dir.join("entities_timeline.csv")
    }

    pub fn docnames_csv(&self) -> PathBuf {
        self.output_dir.join("entity_docnames.csv")
    }

    pub fn urls_csv(&self) -> PathBuf {
        self.output_dir.join("entity_urls.csv")
    }
}

/// Inputs and output location of the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub timeline_csv: PathBuf,
    /// `Country,Year,Frequency` table of grouped word counts.
    pub word_frequencies_csv: Option<PathBuf>,
    /// Folder holding pre-rendered `lda_vis_<year>.0.html` pages.
    pub topics_dir: Option<PathBuf>,
    pub topic_years: Vec<i32>,
    /// `latitude,longitude,country,ESG-term,link` table for the map.
    pub map_csv: Option<PathBuf>,
    pub bubble_from_year: i32,
    pub out_dir: PathBuf,
    pub title: String,
}

impl DashboardOptions {
    pub fn new(timeline_csv: &Path, out_dir: &Path) -> Self {
        DashboardOptions {
            timeline_csv: timeline_csv.to_path_buf(),
            word_frequencies_csv: None,
            topics_dir: None,
            topic_years: (2013..=2023).collect(),
            map_csv: None,
            bubble_from_year: DEFAULT_BUBBLE_FROM_YEAR,
            out_dir: out_dir.to_path_buf(),
            title: "ESG Dashboard".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_exclude_numeric_and_location_labels() {
        let o = PipelineOptions::default();
        for label in ["CARDINAL", "DATE", "GPE", "LOC", "MONEY"] {
            assert!(o.is_excluded(label), "{label}");
        }
        assert!(!o.is_excluded("ORG"));
        assert!(!o.is_excluded("PERSON"));
        assert_eq!(o.top_csv(), PathBuf::from("output").join("top_50.csv"));
    }

    #[test]
    fn year_range_bounds_are_inclusive() {
        let mut o = PipelineOptions::default();
        assert!(o.in_year_range(1990));
        o.from_year = Some(2004);
        o.to_year = Some(2023);
        assert!(!o.in_year_range(2003));
        assert!(o.in_year_range(2004));
        assert!(o.in_year_range(2023));
        assert!(!o.in_year_range(2024));
    }
}
