//! Plotly figures built from the pipeline's CSV tables.
//!
//! Every function here is a pure transformation from tabular input to a
//! [`Figure`]; rendering to HTML happens in [`Figure::div`] and
//! [`Figure::to_html`], which load plotly.js from its CDN.

use std::path::Path;
use std::sync::OnceLock;

use csv::ReaderBuilder;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::alias::{AliasTable, EntityClass};
use crate::error::{Error, Result};
use crate::timeline::Timeline;

pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const BAR_COLOR: &str = "rgba(178, 52, 39, 0.95)";

/// A Plotly figure: trace objects plus a layout object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Value,
}

impl Figure {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// A `<div>` plus the script that draws the figure into it.
    pub fn div(&self, id: &str) -> Result<String> {
        let data = script_json(&serde_json::to_string(&self.data)?);
        let layout = script_json(&serde_json::to_string(&self.layout)?);
        Ok(format!(
            "<div id=\"{id}\" class=\"chart\"></div>\n<script>Plotly.newPlot(\"{id}\", {data}, {layout});</script>\n",
            id = escape_html(id)
        ))
    }

    /// A standalone HTML page showing only this figure.
    pub fn to_html(&self, title: &str) -> Result<String> {
        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<script src=\"{PLOTLY_CDN}\"></script>\n</head>\n<body>\n{}</body>\n</html>\n",
            escape_html(title),
            self.div("figure")?
        ))
    }
}

/// Keeps JSON from closing the surrounding `<script>` element.
pub(crate) fn script_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn proportion(count: u64, total: u64) -> f64 {
    if total == 0 { 0.0 } else { count as f64 / total as f64 }
}

/// Horizontal bars of each entity's share of the year's mentions, one trace
/// per year, switched by a year slider.
pub fn timeline_bar(timeline: &Timeline, aliases: &AliasTable) -> Figure {
    let entities: Vec<&str> = timeline.rows.iter().map(|r| r.entity.as_str()).collect();
    let totals: Vec<u64> = (0..timeline.years.len()).map(|i| timeline.year_total(i)).collect();
    let title = |year: i32, total: u64| {
        format!("<b>Entity Proportional Frequencies for {year} (total: {total})</b>")
    };

    let mut data = Vec::with_capacity(timeline.years.len());
    let mut steps = Vec::with_capacity(timeline.years.len());
    for (i, &year) in timeline.years.iter().enumerate() {
        let proportions: Vec<f64> = timeline
            .rows
            .iter()
            .map(|r| proportion(r.counts[i], totals[i]))
            .collect();
        let hovertext: Vec<String> = entities
            .iter()
            .zip(&proportions)
            .map(|(entity, p)| {
                format!(
                    "<b>{}</b><br>Proportion: {p:.2}<br>Year: {year}",
                    aliases.display_name(entity)
                )
            })
            .collect();

        data.push(json!({
            "type": "bar",
            "x": proportions,
            "y": entities,
            "name": year.to_string(),
            "orientation": "h",
            "visible": i == 0,
            "marker": { "color": BAR_COLOR },
            "hovertemplate": "%{hovertext}<extra></extra>",
            "hovertext": hovertext,
        }));

        let visible: Vec<bool> = (0..timeline.years.len()).map(|j| j == i).collect();
        steps.push(json!({
            "method": "update",
            "args": [
                { "visible": visible },
                { "title.text": title(year, totals[i]) },
            ],
            "value": year.to_string(),
            "label": year.to_string(),
        }));
    }

    let first_title = timeline
        .years
        .first()
        .map(|&y| title(y, totals[0]))
        .unwrap_or_default();

    Figure {
        data,
        layout: json!({
            "title": { "text": first_title },
            "barmode": "group",
            "sliders": [{
                "active": 0,
                "currentvalue": { "prefix": "<b>Year:</b> " },
                "pad": { "t": 50 },
                "steps": steps,
                "font": { "size": 12 },
            }],
            "height": 1000,
            "width": 1200,
            "margin": { "l": 100, "r": 100, "t": 100, "b": 100 },
            "yaxis": {
                "range": [-0.5, entities.len() as f64 - 0.5],
                "title": { "text": "<b>Name of Entity</b>", "font": { "size": 20 } },
                "ticksuffix": "    ",
                "tickfont": { "size": 16 },
                "automargin": true,
            },
            "xaxis": {
                "range": [0, 1],
                "title": { "text": "<b>Proportional Frequency</b>", "font": { "size": 18 } },
                "tickfont": { "size": 20 },
            },
        }),
    }
}

/// Entities × years bubbles sized by frequency and colored by entity class.
///
/// Years before `from_year` are left out. One legend-only trace per class
/// provides the color key.
pub fn bubble_chart(timeline: &Timeline, aliases: &AliasTable, from_year: i32) -> Figure {
    let entities: Vec<&str> = timeline.rows.iter().map(|r| r.entity.as_str()).collect();
    let colors: Vec<&str> = entities
        .iter()
        .map(|e| aliases.get(e).map(|r| r.class.color()).unwrap_or("gray"))
        .collect();
    let names: Vec<&str> = entities.iter().map(|e| aliases.display_name(e)).collect();

    let mut data = Vec::new();
    for (i, &year) in timeline.years.iter().enumerate() {
        if year < from_year {
            continue;
        }
        let sizes: Vec<u64> = timeline.rows.iter().map(|r| r.counts[i]).collect();
        let hovertext: Vec<String> = names
            .iter()
            .zip(&sizes)
            .map(|(name, f)| format!("<b>{name}</b><br>Frequency: {f}<br>Year: {year}"))
            .collect();
        data.push(json!({
            "type": "scatter",
            "x": vec![year.to_string(); entities.len()],
            "y": entities,
            "mode": "markers",
            "marker": {
                "size": sizes,
                "sizemode": "diameter",
                "sizeref": 350,
                "color": colors,
                "opacity": 0.5,
                "showscale": false,
            },
            "hovertemplate": "%{hovertext}<extra></extra>",
            "hovertext": hovertext,
            "legendgroup": "Entity Classes",
            "showlegend": false,
            "text": names,
        }));
    }

    for class in EntityClass::ALL {
        data.push(json!({
            "type": "scatter",
            "x": [null],
            "y": [null],
            "mode": "markers",
            "marker": { "size": 10, "color": class.color() },
            "showlegend": true,
            "legendgroup": class.as_str(),
            "hoverinfo": "none",
            "name": class.as_str(),
            "opacity": 0.5,
        }));
    }

    Figure {
        data,
        layout: json!({
            "xaxis": { "title": { "text": "<b>Year</b>", "font": { "size": 20 } }, "type": "category" },
            "yaxis": {
                "title": { "text": "<b>Name of Entity</b>", "font": { "size": 20 } },
                "type": "category",
                "ticksuffix": "   ",
            },
            "height": 1000,
            "width": 1200,
            "margin": { "l": 100, "r": 100, "t": 100, "pad": 10 },
            "hovermode": "closest",
            "showlegend": true,
            "legend": {
                "itemsizing": "constant",
                "title": { "text": "<b> Entity Classes</b>", "font": { "size": 18 } },
                "bgcolor": "rgba(255, 255, 255, 0.7)",
                "bordercolor": "gray",
                "borderwidth": 1,
                "itemclick": false,
                "itemdoubleclick": false,
                "font": { "size": 16 },
            },
        }),
    }
}

/// One row of the grouped word-frequency table.
#[derive(Debug, Clone, PartialEq)]
pub struct WordFrequencyRow {
    pub country: String,
    pub year: i32,
    /// `(count, word)` pairs, most frequent first.
    pub words: Vec<(u64, String)>,
}

#[derive(Debug, Deserialize)]
struct RawWordFrequencyRow {
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "Year")]
    year: String,
    #[serde(rename = "Frequency")]
    frequency: String,
}

fn pair_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\(\s*(\d+)\s*,\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")\s*\)"#)
            .expect("static pair pattern")
    })
}

/// Parses a literal list of `(count, 'word')` tuples such as
/// `[(12, 'climate'), (7, "emission")]`. Anything else yields no pairs.
pub fn parse_frequency_list(raw: &str) -> Vec<(u64, String)> {
    pair_regex()
        .captures_iter(raw)
        .filter_map(|caps| {
            let count = caps[1].parse().ok()?;
            let word = caps.get(2).or_else(|| caps.get(3))?.as_str();
            Some((count, word.replace("\\'", "'").replace("\\\"", "\"")))
        })
        .collect()
}

/// A whole-number year, also in the float form pandas writes (`2013.0`).
fn parse_year(raw: &str) -> Option<i32> {
    let value = raw.trim().parse::<f64>().ok()?;
    let whole = value.is_finite() && value.fract() == 0.0;
    (whole && (i32::MIN as f64..=i32::MAX as f64).contains(&value)).then_some(value as i32)
}

/// Reads a `Country,Year,Frequency` CSV; other columns are ignored.
pub fn read_word_frequencies(path: &Path) -> Result<Vec<WordFrequencyRow>> {
    let mut rdr = ReaderBuilder::new().from_path(path)?;
    let mut rows = Vec::new();
    for raw in rdr.deserialize() {
        let raw: RawWordFrequencyRow = raw?;
        let year = parse_year(&raw.year)
            .ok_or_else(|| Error::Invalid(format!("{}: bad year {:?}", path.display(), raw.year)))?;
        rows.push(WordFrequencyRow {
            country: raw.country,
            year,
            words: parse_frequency_list(&raw.frequency),
        });
    }
    Ok(rows)
}

/// Distinct countries in first-seen order.
pub fn countries(rows: &[WordFrequencyRow]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for row in rows {
        if !out.contains(&row.country.as_str()) {
            out.push(&row.country);
        }
    }
    out
}

/// Sorted distinct years available for a country.
pub fn years_for(rows: &[WordFrequencyRow], country: &str) -> Vec<i32> {
    let mut years: Vec<i32> = rows
        .iter()
        .filter(|r| r.country == country)
        .map(|r| r.year)
        .collect();
    years.sort_unstable();
    years.dedup();
    years
}

/// Top-word bars for one country and year.
pub fn grouped_frequency(rows: &[WordFrequencyRow], country: &str, year: i32) -> Figure {
    let (frequencies, words): (Vec<u64>, Vec<&str>) = rows
        .iter()
        .filter(|r| r.country == country && r.year == year)
        .flat_map(|r| r.words.iter().map(|(f, w)| (*f, w.as_str())))
        .unzip();

    if words.is_empty() {
        return Figure {
            data: Vec::new(),
            layout: json!({
                "annotations": [{
                    "text": "No words available for the selected country and year",
                    "xref": "paper",
                    "yref": "paper",
                    "x": 0.5,
                    "y": 0.5,
                    "showarrow": false,
                    "font": { "size": 14 },
                }],
            }),
        };
    }

    Figure {
        data: vec![json!({
            "type": "bar",
            "x": frequencies,
            "y": words,
            "orientation": "h",
            "marker": { "color": BAR_COLOR },
        })],
        layout: json!({
            "title": { "text": format!("Top Words for {country} - {year}"), "font": { "size": 18 } },
            "xaxis": { "title": { "text": "Frequency" } },
            "yaxis": { "title": { "text": "Word" }, "autorange": "reversed" },
            "width": 1200,
            "height": 800,
            "font": { "size": 16 },
        }),
    }
}
