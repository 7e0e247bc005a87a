//! Finds, per year and entity, the document that mentions the entity most.

use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use log::{error, info, warn};

use crate::alias::{AliasTable, EntityRecord};
use crate::config::PipelineOptions;
use crate::error::{Error, Result};
use crate::text::read_document;
use crate::{SkippedFile, collect_documents, year_folders};

/// Literal, case-sensitive, non-overlapping occurrences of every alias, summed.
pub fn count_occurrences(text: &str, record: &EntityRecord) -> usize {
    record
        .aliases
        .iter()
        .map(|alias| text.matches(alias.as_str()).count())
        .sum()
}

/// Best document per entity (alias-table order) for one year folder.
///
/// Documents are scanned in file-name order; on equal counts the later
/// document replaces the earlier one. An entity never mentioned gets `None`.
pub fn rank_folder(
    folder: &Path,
    aliases: &AliasTable,
    skipped: &mut Vec<SkippedFile>,
) -> Vec<Option<String>> {
    let mut best: Vec<(usize, Option<String>)> = vec![(0, None); aliases.len()];

    for path in collect_documents(folder) {
        let text = match read_document(&path) {
            Ok(text) => text,
            Err(e) => {
                error!("Cannot rank {}: {e}", path.display());
                skipped.push(SkippedFile::new(&path, e));
                continue;
            }
        };
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        for (slot, record) in best.iter_mut().zip(aliases.records()) {
            let count = count_occurrences(&text, record);
            if count > 0 && count >= slot.0 {
                *slot = (count, Some(name.to_string()));
            }
        }
    }
    best.into_iter().map(|(_, doc)| doc).collect()
}

/// Entity × year table of document names; empty cells mean no match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTable {
    pub years: Vec<i32>,
    pub entities: Vec<String>,
    /// `cells[entity][year]`
    pub cells: Vec<Vec<Option<String>>>,
}

impl DocumentTable {
    pub fn get(&self, entity: &str, year: i32) -> Option<&str> {
        let e = self.entities.iter().position(|x| x == entity)?;
        let y = self.years.iter().position(|&x| x == year)?;
        self.cells[e][y].as_deref()
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let mut wtr = WriterBuilder::new().from_path(path)?;
        let mut header = vec!["Entity".to_string()];
        header.extend(self.years.iter().map(|y| y.to_string()));
        wtr.write_record(&header)?;
        for (entity, row) in self.entities.iter().zip(&self.cells) {
            let mut record = vec![entity.clone()];
            record.extend(row.iter().map(|c| c.clone().unwrap_or_default()));
            wtr.write_record(&record)?;
        }
        wtr.flush().map_err(|e| Error::io(path, e))?;
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().from_path(path)?;
        let headers = rdr.headers()?.clone();
        let years = headers
            .iter()
            .skip(1)
            .map(|h| {
                h.trim()
                    .parse::<i32>()
                    .map_err(|_| Error::Invalid(format!("{}: bad year column {h:?}", path.display())))
            })
            .collect::<Result<Vec<i32>>>()?;
        let mut entities = Vec::new();
        let mut cells = Vec::new();
        for record in rdr.records() {
            let record = record?;
            entities.push(record.get(0).unwrap_or_default().to_string());
            cells.push(
                record
                    .iter()
                    .skip(1)
                    .map(|c| (!c.is_empty()).then(|| c.to_string()))
                    .collect(),
            );
        }
        Ok(DocumentTable {
            years,
            entities,
            cells,
        })
    }
}

/// Ranks documents for every year in range and writes `entity_docnames.csv`.
///
/// Years come from the corpus folders, limited by `from_year`/`to_year`. When
/// both bounds are given, a year inside the range without a folder still gets
/// a column of empty cells.
pub fn run_ranking(
    opts: &PipelineOptions,
    aliases: &AliasTable,
) -> Result<(DocumentTable, Vec<SkippedFile>)> {
    let folders: Vec<(i32, std::path::PathBuf)> = year_folders(&opts.data_dir)?
        .into_iter()
        .filter(|(year, _)| opts.in_year_range(*year))
        .collect();

    let years: Vec<i32> = match (opts.from_year, opts.to_year) {
        (Some(from), Some(to)) => (from..=to).collect(),
        _ => folders.iter().map(|(y, _)| *y).collect(),
    };

    let mut skipped = Vec::new();
    let mut columns = Vec::with_capacity(years.len());
    for year in &years {
        match folders.iter().find(|(y, _)| y == year) {
            Some((_, folder)) => columns.push(rank_folder(folder, aliases, &mut skipped)),
            None => {
                warn!("No folder for year {year} in {}", opts.data_dir.display());
                columns.push(vec![None; aliases.len()]);
            }
        }
    }

    let cells = (0..aliases.len())
        .map(|e| columns.iter().map(|col| col[e].clone()).collect())
        .collect();
    let table = DocumentTable {
        years,
        entities: aliases.records().iter().map(|r| r.key.clone()).collect(),
        cells,
    };

    let path = opts.docnames_csv();
    table.write_csv(&path)?;
    info!("Saved document overview to {}", path.display());
    Ok((table, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::EntityClass;

    fn aliases() -> AliasTable {
        AliasTable::new(vec![
            EntityRecord::new("EPA", "Environmental Protection Agency", EntityClass::RegulatoryAuthority, &[
                "EPA",
                "Environmental Protection Agency",
            ]),
            EntityRecord::new("Shell", "Shell", EntityClass::Corporate, &["Shell", "Royal Dutch Shell"]),
            EntityRecord::new("DOE", "Department of Energy", EntityClass::RegulatoryAuthority, &["DOE"]),
        ])
        .unwrap()
    }

    #[test]
    fn counts_are_literal_and_summed_over_aliases() {
        let a = aliases();
        let shell = a.get("Shell").unwrap();
        // "Royal Dutch Shell" also contains "Shell": both aliases count
        assert_eq!(count_occurrences("Royal Dutch Shell and Shell", shell), 3);
        assert_eq!(count_occurrences("shell", shell), 0);
        let epa = a.get("EPA").unwrap();
        assert_eq!(count_occurrences("EPAEPA EPA", epa), 3);
    }

    #[test]
    fn best_document_and_last_match_wins_ties() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "EPA EPA Shell").unwrap();
        fs::write(dir.path().join("b.txt"), "EPA Shell").unwrap();
        fs::write(dir.path().join("c.txt"), "Environmental Protection Agency EPA").unwrap();
        fs::write(dir.path().join("d.pdf"), "EPA EPA EPA EPA").unwrap();

        let mut skipped = Vec::new();
        let ranked = rank_folder(dir.path(), &aliases(), &mut skipped);
        assert_eq!(ranked[0].as_deref(), Some("c.txt"));
        assert_eq!(ranked[1].as_deref(), Some("b.txt"));
        assert_eq!(ranked[2], None);
        assert!(skipped.is_empty());
    }

    #[test]
    fn run_ranking_fills_missing_years_with_empty_cells() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("data");
        fs::create_dir_all(data.join("2010")).unwrap();
        fs::create_dir_all(data.join("2012")).unwrap();
        fs::write(data.join("2010").join("2010-1.txt"), "Shell DOE").unwrap();
        fs::write(data.join("2012").join("2012-7.txt"), "EPA").unwrap();

        let opts = PipelineOptions {
            data_dir: data.clone(),
            output_dir: root.path().join("output"),
            from_year: Some(2010),
            to_year: Some(2012),
            ..PipelineOptions::default()
        };
        let (table, skipped) = run_ranking(&opts, &aliases()).unwrap();
        assert!(skipped.is_empty());
        assert_eq!(table.years, vec![2010, 2011, 2012]);
        assert_eq!(table.get("Shell", 2010), Some("2010-1.txt"));
        assert_eq!(table.get("EPA", 2011), None);
        assert_eq!(table.get("EPA", 2012), Some("2012-7.txt"));

        // every non-empty cell names a file of that year's folder
        for (e, row) in table.cells.iter().enumerate() {
            for (y, cell) in row.iter().enumerate() {
                if let Some(name) = cell {
                    let folder = data.join(table.years[y].to_string());
                    assert!(folder.join(name).is_file(), "{} {}", table.entities[e], name);
                }
            }
        }

        let raw = fs::read_to_string(opts.docnames_csv()).unwrap();
        assert_eq!(
            raw,
            "Entity,2010,2011,2012\nEPA,,,2012-7.txt\nShell,2010-1.txt,,\nDOE,2010-1.txt,,\n"
        );
        assert_eq!(DocumentTable::read_csv(&opts.docnames_csv()).unwrap(), table);
    }
}
