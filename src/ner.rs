//! Named entity recognition backends.
//!
//! The pipeline only needs entity spans with a spaCy-style label, so the
//! recognizer is a small trait. [`HeuristicRecognizer`] works offline from
//! capitalization and token shape; [`CommandRecognizer`] hands the text to an
//! external NLP program and reads its tags back as JSON lines.

use std::io::Write;
use std::process::{Command, Stdio};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const ORG: &str = "ORG";
pub const PERSON: &str = "PERSON";
pub const GPE: &str = "GPE";
pub const LOC: &str = "LOC";
pub const CARDINAL: &str = "CARDINAL";
pub const ORDINAL: &str = "ORDINAL";
pub const DATE: &str = "DATE";
pub const TIME: &str = "TIME";
pub const PERCENT: &str = "PERCENT";
pub const MONEY: &str = "MONEY";
pub const QUANTITY: &str = "QUANTITY";

/// Labels dropped before counting: numeric, temporal and location types.
pub const DEFAULT_EXCLUDED_LABELS: [&str; 9] = [
    CARDINAL, ORDINAL, DATE, TIME, PERCENT, MONEY, QUANTITY, GPE, LOC,
];

/// A tagged text span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
}

impl Entity {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Entity {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// Tags entity spans in a cleaned document, in order of appearance.
pub trait EntityRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>>;
}

// ---------------- heuristic tagger ----------------

const EDGE: &[char] = &[
    '(', ')', '[', ']', '{', '}', '"', '\'', '“', '”', '‘', '’', ',', ';', ':', '!', '?', '.',
];
const OPENERS: &[char] = &['(', '[', '{', '"', '“', '‘'];

const CONNECTORS: &[&str] = &["of", "and", "on", "the", "&"];

const STOP_CAPS: &[&str] = &[
    "The", "A", "An", "In", "On", "At", "By", "As", "To", "Of", "For", "With", "Under", "This",
    "That", "These", "Those", "It", "Its", "We", "Our", "He", "She", "They", "Their", "If", "But",
    "And", "Or", "Any", "All", "No", "Not", "When", "Where", "While", "Although", "However",
    "Because", "Since", "Such", "Each", "Here", "There", "Thus", "Accordingly", "Moreover",
];

const ABBREVIATIONS: &[&str] = &[
    "v", "vs", "No", "Nos", "Inc", "Corp", "Co", "Ltd", "Mr", "Mrs", "Ms", "Dr", "St", "Jr",
    "Sr", "Fed", "Reg", "Supp", "Cir", "Stat", "Cal", "Dept", "e.g", "i.e", "al",
];

const ORG_KEYWORDS: &[&str] = &[
    "Agency", "Administration", "Association", "Authority", "Board", "Bureau", "Club", "Commission",
    "Committee", "Company", "Corp", "Corporation", "Corps", "Council", "Court", "Department",
    "Foundation", "Inc", "Institute", "LLC", "Ltd", "Office", "Service", "Society", "University",
    "plc",
];

const LOC_KEYWORDS: &[&str] = &[
    "River", "Lake", "Mountain", "Mountains", "Bay", "Ocean", "Sea", "Creek", "Valley", "Canyon",
    "Island", "Islands", "Basin", "Gulf",
];

const GPE_NAMES: &[&str] = &[
    "U.S.", "US", "USA", "United States", "America", "Alabama", "Alaska", "Arizona", "Arkansas",
    "California", "Colorado", "Connecticut", "Delaware", "Florida", "Georgia", "Hawaii", "Idaho",
    "Illinois", "Indiana", "Iowa", "Kansas", "Kentucky", "Louisiana", "Maine", "Maryland",
    "Massachusetts", "Michigan", "Minnesota", "Mississippi", "Missouri", "Montana", "Nebraska",
    "Nevada", "New Hampshire", "New Jersey", "New Mexico", "New York", "North Carolina",
    "North Dakota", "Ohio", "Oklahoma", "Oregon", "Pennsylvania", "Rhode Island",
    "South Carolina", "South Dakota", "Tennessee", "Texas", "Utah", "Vermont", "Virginia",
    "Washington", "West Virginia", "Wisconsin", "Wyoming", "Canada", "Mexico", "Netherlands",
    "Germany", "France", "United Kingdom", "UK", "Australia", "Brazil", "China", "India",
    "Nigeria", "Europe",
];

const MONTHS: &[&str] = &[
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const ORDINAL_WORDS: &[&str] = &[
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
];

/// Offline tagger based on capitalization and token shape.
///
/// Runs of capitalized words (joined by `of`, `and`, `on`, `the`, `&`)
/// become `ORG`, `PERSON`, `GPE` or `LOC` spans; numbers, money, percentages,
/// ordinals, times, years and month names get the numeric and temporal labels.
#[derive(Debug, Default, Clone)]
pub struct HeuristicRecognizer;

#[derive(Debug)]
struct Word<'a> {
    core: &'a str,
    opens: bool,
    closes: bool,
    sentence_start: bool,
}

fn split_words(text: &str) -> Vec<Word<'_>> {
    let mut words = Vec::new();
    let mut sentence_start = true;

    for raw in text.split_whitespace() {
        let inner = raw.trim_start_matches(EDGE);
        let opens = inner.len() != raw.len() && raw.starts_with(OPENERS);
        let mut core = inner.trim_end_matches(EDGE);
        let mut tail = &inner[core.len()..];

        // keep the final period of initialisms such as "U.S."
        if tail.starts_with('.') && is_initialism(&inner[..core.len() + 1]) {
            core = &inner[..core.len() + 1];
            tail = &tail[1..];
        }

        let mut closes = !tail.is_empty();
        for suffix in ["'s", "’s"] {
            if let Some(stripped) = core.strip_suffix(suffix) {
                core = stripped;
                closes = true;
            }
        }

        let abbreviation = tail.starts_with('.') && ABBREVIATIONS.contains(&core);
        let ends_sentence = !abbreviation && tail.contains(['.', '!', '?']);

        if !core.is_empty() {
            words.push(Word {
                core,
                opens,
                closes,
                sentence_start,
            });
        }
        sentence_start = ends_sentence || (core.is_empty() && sentence_start);
    }
    words
}

fn is_initialism(s: &str) -> bool {
    s.len() >= 2
        && s.ends_with('.')
        && s.split_terminator('.').all(|part| {
            let mut chars = part.chars();
            matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase())
        })
}

fn is_capitalized(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_uppercase())
}

fn is_acronym(s: &str) -> bool {
    let letters = s.chars().filter(|c| c.is_alphabetic()).count();
    letters >= 2
        && s
            .chars()
            .all(|c| c.is_uppercase() || c == '.' || c == '&' || c.is_ascii_digit())
}

fn is_number(s: &str) -> bool {
    let mut seen_dot = false;
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
        && s.chars().all(|c| match c {
            '0'..='9' | ',' => true,
            '.' if !seen_dot => {
                seen_dot = true;
                true
            }
            _ => false,
        })
}

fn is_time(s: &str) -> bool {
    match s.split_once(':') {
        Some((h, m)) => {
            (1..=2).contains(&h.len())
                && m.len() == 2
                && h.chars().chain(m.chars()).all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn is_ordinal(s: &str) -> bool {
    if ORDINAL_WORDS.contains(&s) {
        return true;
    }
    let digits = s.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let suffix = &s[digits.len()..];
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && matches!(suffix, "st" | "nd" | "rd" | "th")
}

/// Label for a non-capitalized token, and whether it swallows the next word.
fn shape_label(word: &Word<'_>, next: Option<&Word<'_>>) -> Option<(&'static str, bool)> {
    let core = word.core;
    if let Some(amount) = core.strip_prefix('$') {
        return is_number(amount).then_some((MONEY, false));
    }
    if let Some(amount) = core.strip_suffix('%') {
        return is_number(amount).then_some((PERCENT, false));
    }
    if is_time(core) {
        return Some((TIME, false));
    }
    if is_ordinal(core) {
        return Some((ORDINAL, false));
    }
    if !is_number(core) {
        return None;
    }
    let swallow = !word.closes;
    match next.map(|w| w.core) {
        Some("percent") if swallow => Some((PERCENT, true)),
        Some("million" | "billion" | "thousand") if swallow => Some((CARDINAL, true)),
        Some("acres" | "miles" | "tons" | "gallons" | "barrels") if swallow => {
            Some((QUANTITY, true))
        }
        _ => {
            let year = core.len() == 4 && core.parse::<u16>().is_ok_and(|y| (1800..2100).contains(&y));
            Some((if year { DATE } else { CARDINAL }, false))
        }
    }
}

fn span_label(span: &[&Word<'_>], text: &str) -> Option<&'static str> {
    if GPE_NAMES.contains(&text) {
        return Some(GPE);
    }
    if span.iter().any(|w| ORG_KEYWORDS.contains(&w.core)) {
        return Some(ORG);
    }
    if span.iter().any(|w| LOC_KEYWORDS.contains(&w.core)) {
        return Some(LOC);
    }
    if span.iter().all(|w| is_acronym(w.core)) {
        return Some(ORG);
    }
    if span.len() == 1 {
        // a lone capitalized word opening a sentence is usually not a name
        return (!span[0].sentence_start).then_some(ORG);
    }
    Some(PERSON)
}

fn joins_span(word: &Word<'_>, next: Option<&Word<'_>>, span: &[&Word<'_>]) -> bool {
    if !CONNECTORS.contains(&word.core) || span.is_empty() || word.closes {
        return false;
    }
    // "and" may build "Fish and Wildlife Service" but must not fuse two complete names
    if matches!(word.core, "and" | "&") && span.iter().any(|w| ORG_KEYWORDS.contains(&w.core)) {
        return false;
    }
    next.is_some_and(|n| is_capitalized(n.core) && !n.opens)
}

fn flush_span(span: &mut Vec<&Word<'_>>, entities: &mut Vec<Entity>) {
    let mut start = 0;
    while start < span.len() && STOP_CAPS.contains(&span[start].core) {
        start += 1;
    }
    let mut end = span.len();
    while end > start && CONNECTORS.contains(&span[end - 1].core) {
        end -= 1;
    }
    let words = &span[start..end];
    if !words.is_empty() {
        let text = words.iter().map(|w| w.core).collect::<Vec<_>>().join(" ");
        if let Some(label) = span_label(words, &text) {
            entities.push(Entity::new(text, label));
        }
    }
    span.clear();
}

impl EntityRecognizer for HeuristicRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>> {
        let words = split_words(text);
        let mut entities = Vec::new();
        let mut span: Vec<&Word<'_>> = Vec::new();

        let mut i = 0;
        while i < words.len() {
            let word = &words[i];
            let next = words.get(i + 1);
            if word.opens {
                flush_span(&mut span, &mut entities);
            }

            if let Some((label, swallow)) = shape_label(word, next) {
                flush_span(&mut span, &mut entities);
                match (swallow, next) {
                    (true, Some(n)) => {
                        entities.push(Entity::new(format!("{} {}", word.core, n.core), label));
                        i += 1;
                    }
                    _ => entities.push(Entity::new(word.core, label)),
                }
            } else if MONTHS.contains(&word.core) {
                flush_span(&mut span, &mut entities);
                entities.push(Entity::new(word.core, DATE));
            } else if is_capitalized(word.core) {
                span.push(word);
            } else if joins_span(word, next, &span) {
                span.push(word);
            } else {
                flush_span(&mut span, &mut entities);
            }

            if word.closes {
                flush_span(&mut span, &mut entities);
            }
            i += 1;
        }
        flush_span(&mut span, &mut entities);
        Ok(entities)
    }
}

// ---------------- external tagger ----------------

/// Runs an external NLP program once per document.
///
/// The document is written to the program's stdin. The program must print one
/// JSON object per line on stdout, `{"text": "...", "label": "..."}`, and exit
/// with status 0.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        CommandRecognizer {
            program: program.into(),
            args,
        }
    }

    /// Builds a recognizer from a whitespace-separated command line.
    pub fn parse(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(String::from);
        let program = parts
            .next()
            .ok_or_else(|| Error::Invalid("empty recognizer command".to_string()))?;
        Ok(CommandRecognizer::new(program, parts.collect()))
    }
}

impl EntityRecognizer for CommandRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Recognizer(format!("cannot start {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Recognizer("child stdin unavailable".to_string()))?;
        let input = text.to_owned();
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child
            .wait_with_output()
            .map_err(|e| Error::Recognizer(format!("{} did not finish: {e}", self.program)))?;
        let written = writer
            .join()
            .map_err(|_| Error::Recognizer("stdin writer panicked".to_string()))?;

        if !output.status.success() {
            return Err(Error::Recognizer(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        written.map_err(|e| Error::Recognizer(format!("writing to {}: {e}", self.program)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut entities = Vec::new();
        for (n, line) in stdout.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entity: Entity = serde_json::from_str(line)
                .map_err(|e| Error::Recognizer(format!("bad output line {}: {e}", n + 1)))?;
            entities.push(entity);
        }
        debug!("{} tagged {} entities", self.program, entities.len());
        Ok(entities)
    }
}
