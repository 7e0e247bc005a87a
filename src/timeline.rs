//! Canonical entity counts per year (`entities_timeline.csv`).

use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use log::info;

use crate::alias::AliasTable;
use crate::combine::read_year_tables;
use crate::config::PipelineOptions;
use crate::error::{Error, Result};
use crate::frequency::FrequencyTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineRow {
    pub entity: String,
    /// One count per year of [`Timeline::years`].
    pub counts: Vec<u64>,
}

impl TimelineRow {
    pub fn total(&self) -> u64 {
        self.counts.iter().fold(0, |acc, n| acc.saturating_add(*n))
    }
}

/// Entity × year count matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    pub years: Vec<i32>,
    pub rows: Vec<TimelineRow>,
}

impl Timeline {
    /// Resolves raw per-year tables through the alias table.
    ///
    /// Years are ascending, every entity gets a (possibly zero) count for each
    /// year, and rows are ordered by total, descending; ties keep alias-table order.
    pub fn build(aliases: &AliasTable, tables: &[(i32, FrequencyTable)]) -> Self {
        let mut tables: Vec<&(i32, FrequencyTable)> = tables.iter().collect();
        tables.sort_by_key(|(year, _)| *year);

        let per_year: Vec<Vec<u64>> = tables.iter().map(|(_, t)| aliases.tally(t.iter())).collect();

        let mut rows: Vec<TimelineRow> = aliases
            .records()
            .iter()
            .enumerate()
            .map(|(i, record)| TimelineRow {
                entity: record.key.clone(),
                counts: per_year.iter().map(|counts| counts[i]).collect(),
            })
            .collect();
        rows.sort_by(|a, b| b.total().cmp(&a.total()));

        Timeline {
            years: tables.iter().map(|(year, _)| *year).collect(),
            rows,
        }
    }

    pub fn row(&self, entity: &str) -> Option<&TimelineRow> {
        self.rows.iter().find(|r| r.entity == entity)
    }

    /// Sum over all entities for the year at `index`.
    pub fn year_total(&self, index: usize) -> u64 {
        self.rows
            .iter()
            .fold(0, |acc, r| acc.saturating_add(r.counts[index]))
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let mut wtr = WriterBuilder::new().from_path(path)?;
        let mut header = vec!["Entity".to_string()];
        header.extend(self.years.iter().map(|y| y.to_string()));
        wtr.write_record(&header)?;
        for row in &self.rows {
            let mut record = vec![row.entity.clone()];
            record.extend(row.counts.iter().map(|c| c.to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush().map_err(|e| Error::io(path, e))?;
        Ok(())
    }

    /// Reads a timeline CSV (`Entity,<year>...`).
    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().from_path(path)?;
        let headers = rdr.headers()?.clone();
        if headers.get(0) != Some("Entity") {
            return Err(Error::Invalid(format!(
                "{}: first column must be Entity",
                path.display()
            )));
        }
        let years = headers
            .iter()
            .skip(1)
            .map(|h| {
                h.trim()
                    .parse::<i32>()
                    .map_err(|_| Error::Invalid(format!("{}: bad year column {h:?}", path.display())))
            })
            .collect::<Result<Vec<i32>>>()?;

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let entity = record.get(0).unwrap_or_default().to_string();
            let counts = record
                .iter()
                .skip(1)
                .map(|c| {
                    c.trim()
                        .parse::<u64>()
                        .map_err(|_| Error::Invalid(format!("{}: bad count {c:?} for {entity}", path.display())))
                })
                .collect::<Result<Vec<u64>>>()?;
            rows.push(TimelineRow { entity, counts });
        }
        Ok(Timeline { years, rows })
    }
}

/// Builds `entities_timeline.csv` from the statistics files.
pub fn run_timeline(opts: &PipelineOptions, aliases: &AliasTable) -> Result<Timeline> {
    let tables = read_year_tables(&opts.stats_dir)?;
    let timeline = Timeline::build(aliases, &tables);
    let path = opts.timeline_csv();
    timeline.write_csv(&path)?;
    info!(
        "Saved timeline of {} entities over {} years to {}",
        timeline.rows.len(),
        timeline.years.len(),
        path.display()
    );
    Ok(timeline)
}
