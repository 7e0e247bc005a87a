//! Source URLs for corpus documents.
//!
//! Most documents were downloaded from the Climate Change Litigation database,
//! whose PDF paths are derived from the year prefix of the file name. Names
//! that do not follow that pattern, or whose derived URL is dead, are listed
//! in an override table.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use log::{debug, info, warn};

use crate::config::PipelineOptions;
use crate::error::{Error, Result};

pub const DEFAULT_URL_TEMPLATE: &str =
    "http://climatecasechart.com/wp-content/uploads/sites/16/case-documents/{year}/{file}";

/// Answers whether a URL points at an existing resource.
pub trait LinkCheck {
    fn exists(&self, url: &str) -> bool;
}

impl<T: LinkCheck + ?Sized> LinkCheck for Box<T> {
    fn exists(&self, url: &str) -> bool {
        (**self).exists(url)
    }
}

/// Issues a blocking HTTP HEAD request; any 2xx status means the URL exists.
///
/// Redirects are not followed: a 3xx reply counts as absent.
pub struct HttpHeadCheck {
    client: reqwest::blocking::Client,
}

impl HttpHeadCheck {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Invalid(format!("cannot build HTTP client: {e}")))?;
        Ok(HttpHeadCheck { client })
    }
}

impl LinkCheck for HttpHeadCheck {
    fn exists(&self, url: &str) -> bool {
        match self.client.head(url).send() {
            Ok(resp) => {
                debug!("HEAD {url} -> {}", resp.status());
                resp.status().is_success()
            }
            Err(e) => {
                warn!("HEAD {url} failed: {e}");
                false
            }
        }
    }
}

/// Treats every URL as unreachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct Offline;

impl LinkCheck for Offline {
    fn exists(&self, _url: &str) -> bool {
        false
    }
}

/// Documents whose derived URL is known to be wrong.
pub fn builtin_overrides() -> HashMap<String, String> {
    [
        (
            "2014-13726.txt",
            "http://www.gpo.gov/fdsys/pkg/FR-2014-06-18/pdf/2014-13726.pdf",
        ),
        (
            "2016-24215.txt",
            "https://www.govinfo.gov/content/pkg/FR-2016-11-18/pdf/2016-24215.pdf",
        ),
        (
            "2014-18742.txt",
            "https://www.govinfo.gov/content/pkg/FR-2014-08-07/pdf/2014-18742.pdf",
        ),
        (
            "20210526_8918_judgment-1.txt",
            "http://climatecasechart.com/wp-content/uploads/sites/16/non-us-case-documents/2021/20210526_8918_judgment-1.pdf",
        ),
        (
            "2011-20740.txt",
            "https://www.govinfo.gov/content/pkg/FR-2011-09-15/pdf/2011-20740.pdf",
        ),
        (
            "20191113_8918_reply.txt",
            "http://climatecasechart.com/wp-content/uploads/sites/16/non-us-case-documents/2019/20191113_8918_reply.pdf",
        ),
        (
            "2010-3851.txt",
            "https://www.govinfo.gov/content/pkg/FR-2010-03-26/pdf/2010-3851.pdf",
        ),
    ]
    .into_iter()
    .map(|(name, url)| (name.to_string(), url.to_string()))
    .collect()
}

/// Loads extra overrides from a JSON object of `file name -> URL`.
pub fn overrides_from_json_file(path: &Path) -> Result<HashMap<String, String>> {
    let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(serde_json::from_str(&raw)?)
}

pub struct UrlResolver<C: LinkCheck> {
    overrides: HashMap<String, String>,
    template: String,
    checker: C,
    cache: HashMap<String, Option<String>>,
}

impl<C: LinkCheck> UrlResolver<C> {
    pub fn new(checker: C) -> Self {
        UrlResolver {
            overrides: builtin_overrides(),
            template: DEFAULT_URL_TEMPLATE.to_string(),
            checker,
            cache: HashMap::new(),
        }
    }

    /// Uses `template` instead of the default; `{year}` and `{file}` are substituted.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Adds (or replaces) overrides.
    pub fn with_overrides(mut self, extra: HashMap<String, String>) -> Self {
        self.overrides.extend(extra);
        self
    }

    /// Candidate URL derived from the name, before any network check.
    ///
    /// Only names starting with four ASCII digits have one.
    pub fn candidate(&self, name: &str) -> Option<String> {
        let year = name.get(..4)?;
        if !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let file = name.replace(".txt", ".pdf");
        Some(self.template.replace("{year}", year).replace("{file}", &file))
    }

    /// Resolved URL for a document name, or `None`.
    ///
    /// Overrides win without a network check; derived candidates must pass
    /// the link check. Answers are cached for the lifetime of the resolver.
    pub fn resolve(&mut self, name: &str) -> Option<String> {
        let name = name.trim_matches('\'');
        if let Some(url) = self.overrides.get(name) {
            return Some(url.clone());
        }
        if let Some(cached) = self.cache.get(name) {
            return cached.clone();
        }
        let resolved = self
            .candidate(name)
            .filter(|url| self.checker.exists(url));
        if resolved.is_none() {
            debug!("No URL for {name}");
        }
        self.cache.insert(name.to_string(), resolved.clone());
        resolved
    }

    /// Copies a document-name table, replacing every `.txt` cell after the
    /// first column with its URL (empty when unresolved).
    pub fn resolve_table(&mut self, input: &Path, output: &Path) -> Result<usize> {
        let mut rdr = ReaderBuilder::new().has_headers(false).flexible(true).from_path(input)?;
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let mut wtr = WriterBuilder::new().flexible(true).from_path(output)?;

        let mut resolved = 0;
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            if i == 0 {
                wtr.write_record(&record)?;
                continue;
            }
            let mut row: Vec<String> = Vec::with_capacity(record.len());
            for (col, cell) in record.iter().enumerate() {
                if col > 0 && cell.ends_with(".txt") {
                    let url = self.resolve(cell);
                    if url.is_some() {
                        resolved += 1;
                    }
                    row.push(url.unwrap_or_default());
                } else {
                    row.push(cell.to_string());
                }
            }
            wtr.write_record(&row)?;
        }
        wtr.flush().map_err(|e| Error::io(output, e))?;
        Ok(resolved)
    }
}

/// Turns `entity_docnames.csv` into `entity_urls.csv`.
pub fn run_urls<C: LinkCheck>(opts: &PipelineOptions, resolver: &mut UrlResolver<C>) -> Result<usize> {
    let input = opts.docnames_csv();
    let output = opts.urls_csv();
    let resolved = resolver.resolve_table(&input, &output)?;
    info!("Resolved {resolved} document URLs into {}", output.display());
    Ok(resolved)
}
