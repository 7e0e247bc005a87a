//! Static HTML dashboard over the pipeline's CSV outputs.
//!
//! Every view is precomputed at build time: the page's controls (menu, year
//! dropdown, country dropdown, year slider, map checkbox) only toggle which
//! prerendered element is visible.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{info, warn};

use crate::alias::AliasTable;
use crate::charts::{
    PLOTLY_CDN, bubble_chart, countries, escape_html, grouped_frequency, read_word_frequencies,
    timeline_bar, years_for,
};
use crate::config::DashboardOptions;
use crate::error::{Error, Result};
use crate::map::{cluster_map, head_includes, read_markers};
use crate::timeline::Timeline;

/// Loads the pre-rendered topic-model page for a year (`lda_vis_<year>.0.html`).
pub fn topic_html(topics_dir: &Path, year: i32) -> Result<String> {
    let path = topics_dir.join(format!("lda_vis_{year}.0.html"));
    fs::read_to_string(&path).map_err(|e| Error::io(path, e))
}

struct Page {
    id: &'static str,
    group: &'static str,
    title: &'static str,
    body: String,
}

const GROUPS: [&str; 4] = ["About", "ESG Entities", "ESG Topics", "ESG Sentiment"];

fn notice(text: &str) -> String {
    format!("<p class=\"notice\">{}</p>\n", escape_html(text))
}

fn topics_body(opts: &DashboardOptions) -> String {
    let Some(dir) = &opts.topics_dir else {
        return notice("No topic-model directory configured.");
    };
    let mut options = String::new();
    let mut frames = String::new();
    for &year in &opts.topic_years {
        match topic_html(dir, year) {
            Ok(html) => {
                let first = frames.is_empty();
                options.push_str(&format!("<option value=\"{year}\">{year}</option>"));
                frames.push_str(&format!(
                    "<iframe class=\"topic\" data-year=\"{year}\" srcdoc=\"{}\" width=\"1200\" height=\"1200\"{}></iframe>\n",
                    escape_html(&html),
                    if first { "" } else { " hidden" }
                ));
            }
            Err(e) => warn!("Skipping topic page for {year}: {e}"),
        }
    }
    if frames.is_empty() {
        return notice("No topic-model pages found.");
    }
    format!(
        "<label>Select a year: <select id=\"topic-year\">{options}</select></label>\n{frames}"
    )
}

fn words_body(opts: &DashboardOptions) -> Result<String> {
    let Some(path) = &opts.word_frequencies_csv else {
        return Ok(notice("No word-frequency table configured."));
    };
    if !path.is_file() {
        warn!("Word-frequency table {} not found", path.display());
        return Ok(notice("Word-frequency table not found."));
    }
    let rows = read_word_frequencies(path)?;
    let countries = countries(&rows);
    if countries.is_empty() {
        return Ok(notice("The word-frequency table is empty."));
    }

    let mut select = String::from("<label>Select country: <select id=\"words-country\">");
    let mut figures = String::new();
    for (ci, country) in countries.iter().enumerate() {
        let years = years_for(&rows, country);
        select.push_str(&format!(
            "<option value=\"{ci}\" data-years=\"{}\">{}</option>",
            years.iter().map(|y| y.to_string()).collect::<Vec<_>>().join(","),
            escape_html(country)
        ));
        for (yi, &year) in years.iter().enumerate() {
            let hidden = if ci == 0 && yi == 0 { "" } else { " hidden" };
            figures.push_str(&format!(
                "<div class=\"words-view\" data-country=\"{ci}\" data-year=\"{year}\"{hidden}>\n{}</div>\n",
                grouped_frequency(&rows, country, year).div(&format!("words-{ci}-{yi}"))?
            ));
        }
    }
    select.push_str("</select></label>\n");
    let first_years = years_for(&rows, countries[0]);
    let slider = format!(
        "<label>Select Year: <input type=\"range\" id=\"words-year\" min=\"0\" max=\"{}\" value=\"0\"> <span id=\"words-year-label\">{}</span></label>\n",
        first_years.len().saturating_sub(1),
        first_years.first().map(|y| y.to_string()).unwrap_or_default()
    );
    Ok(format!("{select}{slider}{figures}"))
}

fn map_body(opts: &DashboardOptions) -> Result<String> {
    let Some(path) = &opts.map_csv else {
        return Ok(notice("No map table configured."));
    };
    if !path.is_file() {
        warn!("Map table {} not found", path.display());
        return Ok(notice("Map table not found."));
    }
    let markers = read_markers(path)?;
    Ok(format!(
        "<label><input type=\"checkbox\" id=\"map-toggle\" checked> Show map ({} locations)</label>\n<div id=\"map-wrap\">\n{}</div>\n",
        markers.len(),
        cluster_map(&markers, "esg-map")?
    ))
}

const STYLE: &str = "body { margin: 0; font-family: sans-serif; display: flex; }
nav { width: 240px; min-height: 100vh; background: #f0f2f6; padding: 1rem; box-sizing: border-box; }
nav h2 { font-size: 1.1rem; }
nav details { margin-bottom: .5rem; }
nav button { display: block; width: 100%; margin: .25rem 0; padding: .4rem; text-align: left; cursor: pointer; }
main { flex: 1; padding: 1rem 2rem; }
.notice { color: #666; font-style: italic; }
footer { margin-top: 3rem; color: #999; font-size: .8rem; }
";

const SCRIPT: &str = r#"(function () {
  function show(id) {
    document.querySelectorAll("section.page").forEach(function (s) { s.hidden = s.id !== id; });
  }
  document.querySelectorAll("nav button").forEach(function (b) {
    b.addEventListener("click", function () { show(b.dataset.page); });
  });
  var topic = document.getElementById("topic-year");
  if (topic) topic.addEventListener("change", function () {
    document.querySelectorAll("iframe.topic").forEach(function (f) { f.hidden = f.dataset.year !== topic.value; });
  });
  var country = document.getElementById("words-country");
  var year = document.getElementById("words-year");
  var label = document.getElementById("words-year-label");
  function updateWords(resetYear) {
    var years = country.selectedOptions[0].dataset.years.split(",");
    if (resetYear) { year.max = years.length - 1; year.value = 0; }
    var y = years[year.value];
    label.textContent = y;
    document.querySelectorAll("div.words-view").forEach(function (d) {
      d.hidden = !(d.dataset.country === country.value && d.dataset.year === y);
    });
  }
  if (country && year) {
    country.addEventListener("change", function () { updateWords(true); });
    year.addEventListener("input", function () { updateWords(false); });
  }
  var toggle = document.getElementById("map-toggle");
  if (toggle) toggle.addEventListener("change", function () {
    document.getElementById("map-wrap").hidden = !toggle.checked;
  });
})();
"#;

fn render_page(opts: &DashboardOptions, pages: &[Page]) -> String {
    let mut nav = format!("<nav>\n<h2>{}</h2>\n<h3>Menu</h3>\n", escape_html(&opts.title));
    for group in GROUPS {
        nav.push_str(&format!("<details>\n<summary>{}</summary>\n", escape_html(group)));
        for page in pages.iter().filter(|p| p.group == group) {
            nav.push_str(&format!(
                "<button data-page=\"{}\">{}</button>\n",
                page.id,
                escape_html(page.title)
            ));
        }
        nav.push_str("</details>\n");
    }
    nav.push_str("</nav>\n");

    let mut main = format!(
        "<main>\n<h1>{}</h1>\n<h2>Environmental, Social and Governance</h2>\n<section class=\"page\" id=\"welcome\">\n<p>Welcome to the {}! Please select a topic from the menu to display.</p>\n<hr>\n</section>\n",
        escape_html(&opts.title),
        escape_html(&opts.title)
    );
    for page in pages {
        main.push_str(&format!(
            "<section class=\"page\" id=\"{}\" hidden>\n<h3>{}: {}</h3>\n{}<hr>\n</section>\n",
            page.id,
            escape_html(page.group),
            escape_html(page.title),
            page.body
        ));
    }
    main.push_str(&format!(
        "<footer>Generated {}</footer>\n</main>\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<script src=\"{PLOTLY_CDN}\"></script>\n{}<style>\n{STYLE}</style>\n</head>\n<body>\n{nav}{main}<script>\n{SCRIPT}</script>\n</body>\n</html>\n",
        escape_html(&opts.title),
        head_includes()
    )
}

/// Builds the dashboard and writes `index.html` (plus one standalone page per
/// entity chart) into `opts.out_dir`. Returns the path of `index.html`.
pub fn render_dashboard(opts: &DashboardOptions, aliases: &AliasTable) -> Result<PathBuf> {
    let timeline = Timeline::read_csv(&opts.timeline_csv)?;
    let proportions = timeline_bar(&timeline, aliases);
    let bubbles = bubble_chart(&timeline, aliases, opts.bubble_from_year);

    let pages = vec![
        Page {
            id: "project",
            group: "About",
            title: "The Project",
            body: format!(
                "<p>Mentions of {} canonical entities across {} years of legal and regulatory documents, resolved from raw named-entity extractions through hand-curated alias lists.</p>\n",
                timeline.rows.len(),
                timeline.years.len()
            ),
        },
        Page {
            id: "proportional",
            group: "ESG Entities",
            title: "Proportional Frequencies",
            body: proportions.div("proportional-chart")?,
        },
        Page {
            id: "clusters",
            group: "ESG Entities",
            title: "Frequency & Clusters",
            body: bubbles.div("clusters-chart")?,
        },
        Page {
            id: "topics",
            group: "ESG Topics",
            title: "Topic Analysis",
            body: topics_body(opts),
        },
        Page {
            id: "words",
            group: "ESG Topics",
            title: "Word Frequencies",
            body: words_body(opts)?,
        },
        Page {
            id: "map",
            group: "ESG Topics",
            title: "World Map",
            body: map_body(opts)?,
        },
        Page {
            id: "sentiment",
            group: "ESG Sentiment",
            title: "Sentiment Analysis",
            body: notice("Coming soon."),
        },
    ];

    fs::create_dir_all(&opts.out_dir).map_err(|e| Error::io(&opts.out_dir, e))?;
    let index = opts.out_dir.join("index.html");
    fs::write(&index, render_page(opts, &pages)).map_err(|e| Error::io(&index, e))?;

    for (name, title, figure) in [
        ("proportional_frequencies.html", "Proportional Frequencies", &proportions),
        ("frequency_clusters.html", "Frequency & Clusters", &bubbles),
    ] {
        let path = opts.out_dir.join(name);
        fs::write(&path, figure.to_html(title)?).map_err(|e| Error::io(&path, e))?;
    }

    info!("Dashboard written to {}", index.display());
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_timeline(dir: &Path) -> PathBuf {
        let path = dir.join("entities_timeline.csv");
        fs::write(&path, "Entity,2004,2005\nEPA,4,6\nShell,1,0\n").unwrap();
        path
    }

    #[test]
    fn renders_with_only_the_timeline() {
        let dir = tempfile::tempdir().unwrap();
        let timeline = write_timeline(dir.path());
        let opts = DashboardOptions::new(&timeline, &dir.path().join("site"));
        let index = render_dashboard(&opts, &AliasTable::builtin()).unwrap();

        let html = fs::read_to_string(&index).unwrap();
        assert!(html.contains("Plotly.newPlot(\"proportional-chart\""));
        assert!(html.contains("Plotly.newPlot(\"clusters-chart\""));
        assert!(html.contains("No topic-model directory configured."));
        assert!(html.contains("No word-frequency table configured."));
        assert!(html.contains("Coming soon."));
        assert!(dir.path().join("site").join("frequency_clusters.html").is_file());
    }

    #[test]
    fn renders_topics_words_and_map() {
        let dir = tempfile::tempdir().unwrap();
        let timeline = write_timeline(dir.path());
        let topics = dir.path().join("topics");
        fs::create_dir(&topics).unwrap();
        fs::write(topics.join("lda_vis_2015.0.html"), "<html>\"LDA 2015\"</html>").unwrap();
        let words = dir.path().join("grouped.csv");
        fs::write(
            &words,
            "Country,Year,Frequency\nUS,2015.0,\"[(3, 'climate')]\"\nNL,2016.0,\"[(2, 'klimaat')]\"\n",
        )
        .unwrap();
        let map = dir.path().join("map.csv");
        fs::write(
            &map,
            "latitude,longitude,country,ESG-term,link\n52.1,5.2,Netherlands,climate,https://example.org\n",
        )
        .unwrap();

        let mut opts = DashboardOptions::new(&timeline, &dir.path().join("site"));
        opts.topics_dir = Some(topics);
        opts.topic_years = vec![2014, 2015];
        opts.word_frequencies_csv = Some(words);
        opts.map_csv = Some(map);
        let index = render_dashboard(&opts, &AliasTable::builtin()).unwrap();

        let html = fs::read_to_string(index).unwrap();
        assert!(html.contains("<option value=\"2015\">2015</option>"));
        assert!(!html.contains("<option value=\"2014\">"));
        assert!(html.contains("&lt;html&gt;&quot;LDA 2015&quot;"));
        assert!(html.contains("data-years=\"2015\">US</option>"));
        assert!(html.contains("Top Words for NL - 2016"));
        assert!(html.contains("id=\"map-toggle\""));
        assert!(html.contains("Show map (1 locations)"));
    }

    #[test]
    fn missing_timeline_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let opts = DashboardOptions::new(&dir.path().join("nope.csv"), dir.path());
        assert!(render_dashboard(&opts, &AliasTable::builtin()).is_err());
    }

    #[test]
    fn topic_html_reads_year_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lda_vis_2020.0.html"), "topics").unwrap();
        assert_eq!(topic_html(dir.path(), 2020).unwrap(), "topics");
        assert!(topic_html(dir.path(), 2021).is_err());
    }
}
