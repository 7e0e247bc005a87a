//! Integration tests for `entity_trends`.
//
// This suite verifies:
// - The library stages end to end on a small corpus (extract -> combine -> timeline -> documents -> urls)
// - The invariants between stages (combined totals, top-N size, ranked files exist, offline URLs)
// - CLI behavior: subcommands, exit codes, alias files, dashboard output
//
// Notes:
// - CLI tests run the binary with a per-process working directory (no global CWD change).
// - Tests that change global CWD (library calls with relative default paths) are marked #[serial].

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use regex::Regex;
use serde_json::json;
use serial_test::serial;
use tempfile::tempdir;

use entity_trends::combine::read_year_tables;
use entity_trends::{
    AliasTable, DocumentTable, HeuristicRecognizer, Offline, PipelineOptions, Timeline,
    UrlResolver, run_combine, run_extraction, run_ranking, run_timeline, run_urls,
};

// --------------------- helpers ---------------------

/// Create a file with content in a temp dir (parents included).
fn write_file(dir: &assert_fs::TempDir, name: &str, content: &str) -> PathBuf {
    let f = dir.child(name);
    f.write_str(content).unwrap();
    f.path().to_path_buf()
}

/// Read file to string.
fn read_to_string<P: AsRef<Path>>(p: P) -> String {
    fs::read_to_string(p).unwrap()
}

/// Two-year corpus under `data/`.
fn write_corpus(dir: &assert_fs::TempDir) {
    write_file(
        dir,
        "data/2013/20130101_complaint.txt",
        "The Sierra Club sued the Environmental Protection Agency over coal ash. \
         The Environmental Protection Agency denied the claims.",
    );
    write_file(
        dir,
        "data/2013/notes.txt",
        "Shell Oil Company filed a reply in Texas.",
    );
    write_file(
        dir,
        "data/2014/2014-13726.txt",
        "Lawyers for Exxon and the EPA met with Shell Oil Company twice. EPA issued a permit.",
    );
    write_file(dir, "data/2014/readme.md", "EPA EPA EPA EPA EPA");
}

/// Pipeline options rooted in a temp dir.
fn opts(dir: &Path) -> PipelineOptions {
    PipelineOptions {
        data_dir: dir.join("data"),
        stats_dir: dir.join("stats"),
        output_dir: dir.join("output"),
        ..PipelineOptions::default()
    }
}

/// Run CLI successfully with a specific working directory.
fn run_cli_ok_in(dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = assert_cmd::Command::cargo_bin("entity_trends").unwrap();
    cmd.current_dir(dir);
    cmd.args(args).assert().success()
}

/// Run CLI expecting failure with a specific working directory.
fn run_cli_fail_in(dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = assert_cmd::Command::cargo_bin("entity_trends").unwrap();
    cmd.current_dir(dir);
    cmd.args(args).assert().failure()
}

// --------------------- library tests ---------------------

#[test]
fn lib_extraction_writes_expected_yearly_stats() {
    let td = assert_fs::TempDir::new().unwrap();
    write_corpus(&td);
    let o = opts(td.path());

    let report = run_extraction(&o, &HeuristicRecognizer).expect("extraction");
    assert!(report.skipped.is_empty());
    assert_eq!(report.years.len(), 2);

    assert_eq!(
        read_to_string(o.stats_file(2013)),
        "NER: Sierra Club\tFrequency: 1\n\
         NER: Environmental Protection Agency\tFrequency: 2\n\
         NER: Shell Oil Company\tFrequency: 1\n"
    );
    assert_eq!(
        read_to_string(o.stats_file(2014)),
        "NER: Exxon\tFrequency: 1\n\
         NER: EPA\tFrequency: 2\n\
         NER: Shell Oil Company\tFrequency: 1\n"
    );
}

#[test]
fn lib_combined_totals_equal_sum_of_years() {
    let td = assert_fs::TempDir::new().unwrap();
    write_corpus(&td);
    let mut o = opts(td.path());
    o.top_n = 3;
    run_extraction(&o, &HeuristicRecognizer).unwrap();

    let summary = run_combine(&o).expect("combine");
    let tables = read_year_tables(&o.stats_dir).unwrap();
    for (entity, total) in summary.combined.iter() {
        let per_year: u64 = tables.iter().map(|(_, t)| t.get(entity)).sum();
        assert_eq!(total, per_year, "{entity}");
    }

    // exactly min(N, distinct) entries, descending
    assert_eq!(summary.top.len(), 3.min(summary.combined.len()));
    assert!(summary.top.windows(2).all(|w| w[0].1 >= w[1].1));
    assert_eq!(summary.top[0], ("Environmental Protection Agency".to_string(), 2));

    let top = read_to_string(o.output_dir.join("top_3.csv"));
    assert_eq!(
        top,
        "NER,Frequency\nEnvironmental Protection Agency,2\nShell Oil Company,2\nEPA,2\n"
    );
}

#[test]
fn lib_timeline_resolves_aliases() {
    let td = assert_fs::TempDir::new().unwrap();
    write_corpus(&td);
    let o = opts(td.path());
    run_extraction(&o, &HeuristicRecognizer).unwrap();

    let aliases = AliasTable::builtin();
    let timeline = run_timeline(&o, &aliases).expect("timeline");
    assert_eq!(timeline.years, vec![2013, 2014]);
    assert_eq!(timeline.rows.len(), aliases.len());

    let order: Vec<&str> = timeline.rows.iter().take(4).map(|r| r.entity.as_str()).collect();
    assert_eq!(order, vec!["EPA", "Shell", "Exxon", "Sierra Club"]);
    assert_eq!(timeline.row("EPA").unwrap().counts, vec![2, 2]);
    assert_eq!(timeline.row("Shell").unwrap().counts, vec![1, 1]);
    assert_eq!(timeline.row("DOE").unwrap().counts, vec![0, 0]);

    assert_eq!(Timeline::read_csv(&o.timeline_csv()).unwrap(), timeline);
}

#[test]
fn lib_ranking_and_offline_urls() {
    let td = assert_fs::TempDir::new().unwrap();
    write_corpus(&td);
    let o = opts(td.path());
    let aliases = AliasTable::builtin();

    let (table, skipped) = run_ranking(&o, &aliases).expect("ranking");
    assert!(skipped.is_empty());
    assert_eq!(table.get("EPA", 2013), Some("20130101_complaint.txt"));
    assert_eq!(table.get("Shell", 2013), Some("notes.txt"));
    assert_eq!(table.get("Sierra Club", 2014), None);
    assert_eq!(table.get("Exxon", 2014), Some("2014-13726.txt"));

    for (e, row) in table.cells.iter().enumerate() {
        for (y, cell) in row.iter().enumerate() {
            if let Some(name) = cell {
                let path = o.data_dir.join(table.years[y].to_string()).join(name);
                assert!(path.is_file(), "{}: {}", table.entities[e], path.display());
            }
        }
    }
    assert_eq!(DocumentTable::read_csv(&o.docnames_csv()).unwrap(), table);

    let mut resolver = UrlResolver::new(Offline);
    let resolved = run_urls(&o, &mut resolver).expect("urls");
    // only the override for 2014-13726.txt survives without network access
    assert_eq!(resolved, 3);
    let urls = read_to_string(o.urls_csv());
    assert!(urls.contains("http://www.gpo.gov/fdsys/pkg/FR-2014-06-18/pdf/2014-13726.pdf"));
    assert!(!urls.contains(".txt"));
}

#[test]
#[serial]
fn lib_default_paths_are_relative_to_cwd() {
    let td = assert_fs::TempDir::new().unwrap();
    write_corpus(&td);
    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(td.path()).unwrap();

    let o = PipelineOptions::default();
    let result = run_extraction(&o, &HeuristicRecognizer).and_then(|_| run_combine(&o));
    std::env::set_current_dir(previous).unwrap();

    result.expect("pipeline with default paths");
    td.child("stats/2013_ner_statistics.txt")
        .assert(predicate::path::exists());
    td.child("output/output_data.csv")
        .assert(predicate::str::starts_with("NER,Frequency\n"));
    td.child("output/top_50.csv").assert(predicate::path::exists());
}

// --------------------- CLI tests ---------------------

#[test]
fn cli_nonexistent_data_dir_fails() {
    let td = tempdir().unwrap();
    let bad = td.path().join("does_not_exist_here");
    run_cli_fail_in(
        td.path(),
        &["--data-dir", bad.to_string_lossy().as_ref(), "extract"],
    );
}

#[test]
fn cli_run_offline_produces_all_tables() {
    let td = assert_fs::TempDir::new().unwrap();
    write_corpus(&td);

    run_cli_ok_in(td.path(), &["run", "--offline", "--top", "2"])
        .stdout(predicate::str::contains("Top 2 entities:"))
        .stdout(predicate::str::contains("2013: 2 documents"));

    let re = Regex::new(r"^\d{4}_ner_statistics\.txt$").unwrap();
    let stats = fs::read_dir(td.path().join("stats"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| re.is_match(e.file_name().to_string_lossy().as_ref()))
        .count();
    assert_eq!(stats, 2);

    for name in [
        "output_data.csv",
        "top_2.csv",
        "entities_timeline.csv",
        "entity_docnames.csv",
        "entity_urls.csv",
    ] {
        td.child("output").child(name).assert(predicate::path::is_file());
    }
    td.child("output/entities_timeline.csv")
        .assert(predicate::str::starts_with("Entity,2013,2014\nEPA,2,2\n"));
}

#[test]
fn cli_excluded_labels_can_be_replaced() {
    let td = assert_fs::TempDir::new().unwrap();
    write_file(&td, "data/2015/a.txt", "Regulators in California met the EPA.");

    run_cli_ok_in(td.path(), &["extract", "--exclude-labels", "ORG"]);
    let stats = read_to_string(td.path().join("stats/2015_ner_statistics.txt"));
    assert!(stats.contains("NER: California\tFrequency: 1"), "{stats}");
    assert!(!stats.contains("EPA"), "{stats}");
}

#[test]
fn cli_custom_alias_file() {
    let td = assert_fs::TempDir::new().unwrap();
    write_corpus(&td);
    let aliases = json!([
        { "key": "Oil majors", "name": "Oil majors", "class": "Corporate", "aliases": ["Shell", "Exxon"] },
        { "key": "Green groups", "name": "Green groups", "class": "NGO", "aliases": ["Sierra"] }
    ]);
    let alias_file = write_file(&td, "aliases.json", &aliases.to_string());

    run_cli_ok_in(td.path(), &["extract"]);
    run_cli_ok_in(
        td.path(),
        &["--aliases", alias_file.to_str().unwrap(), "timeline"],
    )
    .stdout(predicate::str::contains("Oil majors"));

    assert_eq!(
        read_to_string(td.path().join("output/entities_timeline.csv")),
        "Entity,2013,2014\nOil majors,1,2\nGreen groups,1,0\n"
    );
}

#[test]
fn cli_bad_alias_file_fails() {
    let td = assert_fs::TempDir::new().unwrap();
    write_corpus(&td);
    let alias_file = write_file(&td, "aliases.json", "{ not json");
    run_cli_ok_in(td.path(), &["extract"]);
    run_cli_fail_in(
        td.path(),
        &["--aliases", alias_file.to_str().unwrap(), "timeline"],
    );
}

#[test]
fn cli_documents_year_range() {
    let td = assert_fs::TempDir::new().unwrap();
    write_corpus(&td);
    run_cli_ok_in(
        td.path(),
        &["documents", "--from-year", "2014", "--to-year", "2015"],
    );
    let overview = read_to_string(td.path().join("output/entity_docnames.csv"));
    let mut lines = overview.lines();
    assert_eq!(lines.next(), Some("Entity,2014,2015"));
    assert!(overview.contains("\nEPA,2014-13726.txt,\n"), "{overview}");
}

#[test]
fn cli_dashboard_after_run() {
    let td = assert_fs::TempDir::new().unwrap();
    write_corpus(&td);
    write_file(
        &td,
        "words.csv",
        "Country,Year,Frequency\nUS,2014.0,\"[(4, 'permit'), (2, 'coal')]\"\n",
    );

    run_cli_ok_in(td.path(), &["run", "--offline"]);
    run_cli_ok_in(
        td.path(),
        &[
            "dashboard",
            "--out",
            "site",
            "--word-frequencies",
            "words.csv",
            "--title",
            "Litigation Dashboard",
        ],
    )
    .stdout(predicate::str::contains("Dashboard written to"));

    let index = read_to_string(td.path().join("site/index.html"));
    assert!(index.contains("<title>Litigation Dashboard</title>"));
    assert!(index.contains("Entity Proportional Frequencies for 2013"));
    assert!(index.contains("Top Words for US - 2014"));
    td.child("site/proportional_frequencies.html")
        .assert(predicate::path::is_file());
}

#[test]
fn cli_dashboard_without_timeline_fails() {
    let td = tempdir().unwrap();
    run_cli_fail_in(td.path(), &["dashboard", "--out", "site"]);
}
