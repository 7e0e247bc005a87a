//! Canonical entities and their hand-curated alias lists.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityClass {
    #[serde(rename = "Regulatory Authority")]
    RegulatoryAuthority,
    Corporate,
    #[serde(rename = "NGO")]
    Ngo,
    Politics,
}

impl EntityClass {
    pub const ALL: [EntityClass; 4] = [
        EntityClass::RegulatoryAuthority,
        EntityClass::Corporate,
        EntityClass::Ngo,
        EntityClass::Politics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityClass::RegulatoryAuthority => "Regulatory Authority",
            EntityClass::Corporate => "Corporate",
            EntityClass::Ngo => "NGO",
            EntityClass::Politics => "Politics",
        }
    }

    /// Marker color in the bubble chart.
    pub fn color(self) -> &'static str {
        match self {
            EntityClass::RegulatoryAuthority => "green",
            EntityClass::Corporate => "red",
            EntityClass::Ngo => "blue",
            EntityClass::Politics => "yellow",
        }
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical entity: its key, display name, class and known surface forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub key: String,
    pub name: String,
    pub class: EntityClass,
    pub aliases: Vec<String>,
}

impl EntityRecord {
    pub fn new(key: &str, name: &str, class: EntityClass, aliases: &[&str]) -> Self {
        EntityRecord {
            key: key.to_string(),
            name: name.to_string(),
            class,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// True when any alias occurs in `word`, ignoring case.
    pub fn matches(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        self.aliases
            .iter()
            .any(|alias| word.contains(&alias.to_lowercase()))
    }
}

/// The ordered set of canonical entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable {
    records: Vec<EntityRecord>,
}

impl AliasTable {
    pub fn new(records: Vec<EntityRecord>) -> Result<Self> {
        for (i, r) in records.iter().enumerate() {
            if r.key.is_empty() {
                return Err(Error::Invalid(format!("entity #{} has an empty key", i + 1)));
            }
            if r.aliases.iter().any(|a| a.is_empty()) {
                return Err(Error::Invalid(format!("entity {} has an empty alias", r.key)));
            }
            if records[..i].iter().any(|other| other.key == r.key) {
                return Err(Error::Invalid(format!("entity {} is listed twice", r.key)));
            }
        }
        Ok(AliasTable { records })
    }

    /// Loads a JSON array of `{"key", "name", "class", "aliases"}` objects.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let records: Vec<EntityRecord> = serde_json::from_str(&raw)?;
        AliasTable::new(records)
    }

    /// The fifteen entities curated for the ESG climate-litigation corpus.
    pub fn builtin() -> Self {
        use EntityClass::*;
        let records = vec![
            EntityRecord::new("EPA", "Environmental Protection Agency", RegulatoryAuthority, &[
                "EPA",
                "Environmental Protection Agency",
            ]),
            EntityRecord::new("BLM", "Bureau of Land Management", RegulatoryAuthority, &[
                "BLM",
                "Bureau of Land Management",
                "Bureau Of Land Managament",
            ]),
            EntityRecord::new("Exxon", "Exxon", Corporate, &["Exxon", "ExxonMobil"]),
            EntityRecord::new(
                "FERC",
                "Federal Energy Regulatory Commission",
                RegulatoryAuthority,
                &["FERC", "Federal Energy Regulatory Commission"],
            ),
            EntityRecord::new("Corps", "U.S. Army Corps of Engineers", RegulatoryAuthority, &[
                "Corps",
                "U.S. Army Corps of Engineers",
                "US Corps",
                "U.S. Corps",
                "US Army Corps of Engineers",
                "Corps of Engineers",
            ]),
            EntityRecord::new("FWS", "U.S. Fish and Wildlife Service", RegulatoryAuthority, &[
                "FWS",
                "U.S. Fish and Wildlife Service",
                "US Fish and Wildlife Service",
                "Fish and Wildlife Service",
            ]),
            EntityRecord::new("DOE", "Department of Energy", RegulatoryAuthority, &[
                "DOE",
                "Department of Energy",
            ]),
            EntityRecord::new("Sierra Club", "Sierra Club", Ngo, &["Sierra Club", "SierraClub"]),
            EntityRecord::new("Cal", "California", Politics, &["Cal", "California"]),
            EntityRecord::new(
                "NHTSA",
                "National Highway Traffic Safety Administration",
                RegulatoryAuthority,
                &["NHTSA", "National Highway Traffic Safety Administration"],
            ),
            EntityRecord::new("Interior", "U.S. Department of Interior", RegulatoryAuthority, &[
                "Interior",
                "U.S. Department of Interior",
                "US Department of Interior",
                "Department of Interior",
            ]),
            EntityRecord::new(
                "NMFS",
                "National Marine Fisheries Service",
                RegulatoryAuthority,
                &["NMFS", "National Marine Fisheries Service"],
            ),
            EntityRecord::new("Shell", "Shell", Corporate, &[
                "Shell",
                "RDS",
                "Royal Dutch Shell",
                "SOC",
                "Shell Oil Company",
                "Shell plc.",
                "Shell plc",
            ]),
            EntityRecord::new("CEQ", "Council on Environmental Quality", RegulatoryAuthority, &[
                "CEQ",
                "Council on Environmental Quality",
            ]),
            EntityRecord::new(
                "the Forest Service",
                "United States Forest Service",
                RegulatoryAuthority,
                &[
                    "the Forest Service",
                    "Forest Service",
                    "FS",
                    "USFS",
                    "United States Forest Service",
                ],
            ),
        ];
        AliasTable { records }
    }

    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&EntityRecord> {
        self.records.iter().find(|r| r.key == key)
    }

    /// Display name for a key, falling back to the key itself.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).map(|r| r.name.as_str()).unwrap_or(key)
    }

    /// Every canonical entity a raw entity string is credited to.
    ///
    /// One string may resolve to several entities (e.g. "Shell California"
    /// counts for both `Shell` and `Cal`).
    pub fn resolve<'a>(&'a self, word: &'a str) -> impl Iterator<Item = &'a EntityRecord> + 'a {
        self.records.iter().filter(move |r| r.matches(word))
    }

    /// Canonical counts for one table of raw `(entity, frequency)` pairs, in
    /// table order.
    pub fn tally<'a, I>(&self, entries: I) -> Vec<u64>
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let mut counts = vec![0u64; self.records.len()];
        for (word, frequency) in entries {
            for (i, record) in self.records.iter().enumerate() {
                if record.matches(word) {
                    counts[i] = counts[i].saturating_add(frequency);
                }
            }
        }
        counts
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        AliasTable::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_fifteen_unique_entities() {
        let t = AliasTable::builtin();
        assert_eq!(t.len(), 15);
        assert!(AliasTable::new(t.records().to_vec()).is_ok());
        let regulators = t
            .records()
            .iter()
            .filter(|r| r.class == EntityClass::RegulatoryAuthority)
            .count();
        assert_eq!(regulators, 11);
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let t = AliasTable::builtin();
        let epa = t.get("EPA").unwrap();
        assert!(epa.matches("the environmental protection agency"));
        assert!(epa.matches("EPA Region 9"));
        assert!(!epa.matches("Department of Energy"));
    }

    #[test]
    fn one_word_can_count_for_several_entities() {
        let t = AliasTable::builtin();
        let keys: Vec<&str> = t.resolve("Shell California").map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["Cal", "Shell"]);
    }

    #[test]
    fn several_aliases_of_one_entity_count_once() {
        let t = AliasTable::builtin();
        let counts = t.tally([("Environmental Protection Agency (EPA)", 3)]);
        assert_eq!(counts[0], 3);
    }

    #[test]
    fn adding_an_alias_never_lowers_a_count() {
        let entries = [("Exxon Mobil", 4u64), ("XOM", 2), ("Mobil Oil", 5)];
        let base = AliasTable::builtin();
        let before = base.tally(entries);

        let mut records = base.records().to_vec();
        records[2].aliases.push("Mobil".to_string());
        records[2].aliases.push("XOM".to_string());
        let extended = AliasTable::new(records).unwrap();
        let after = extended.tally(entries);

        for (b, a) in before.iter().zip(&after) {
            assert!(a >= b);
        }
        assert_eq!(before[2], 4);
        assert_eq!(after[2], 11);
    }

    #[test]
    fn json_roundtrip_uses_class_labels() {
        let t = AliasTable::new(vec![EntityRecord::new(
            "Sierra Club",
            "Sierra Club",
            EntityClass::Ngo,
            &["Sierra Club"],
        )])
        .unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains(r#""class":"NGO""#), "{json}");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.json");
        std::fs::write(&path, &json).unwrap();
        assert_eq!(AliasTable::from_json_file(&path).unwrap(), t);
    }

    #[test]
    fn invalid_tables_are_rejected() {
        let dup = vec![
            EntityRecord::new("A", "A", EntityClass::Corporate, &["a"]),
            EntityRecord::new("A", "A2", EntityClass::Corporate, &["b"]),
        ];
        assert!(AliasTable::new(dup).is_err());
        let empty_alias = vec![EntityRecord::new("A", "A", EntityClass::Corporate, &[""])];
        assert!(AliasTable::new(empty_alias).is_err());
    }
}
