use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardPgn {
    #[serde(default)]
    pub pgn_name: String,
    #[serde(default)]
    pub spns: Vec<StandardSpn>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardSpn {
    #[serde(default)]
    pub spn: Option<u32>,
    #[serde(default)]
    pub name: String,
}

/// Reference PGN→SPN map. Callers decide when (and whether) to load it;
/// an `Empty` map contributes nothing to a summary.
#[derive(Debug, Clone, Default)]
pub enum StandardMap {
    #[default]
    Empty,
    Loaded(BTreeMap<u32, StandardPgn>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedSpn {
    pub spn: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedPgn {
    pub pgn: u32,
    pub name: String,
    pub spns: Vec<MappedSpn>,
    pub spn_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StandardSummary {
    pub pgn_count: usize,
    pub spn_occurrences: usize,
    pub unique_spn_count: usize,
    pub pgn_spn_mapping: BTreeMap<u32, MappedPgn>,
}

impl StandardMap {
    /// Keys may be decimal (`"61444"`) or hex (`"F004"`, `"00F004"`,
    /// `"0xF004"`). Entries whose key is neither are dropped; entries that
    /// resolve to the same PGN are combined.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, StandardPgn> = serde_json::from_str(content)?;
        let mut entries: BTreeMap<u32, StandardPgn> = BTreeMap::new();
        for (key, entry) in raw {
            let Some(pgn) = parse_pgn_key(&key) else {
                debug!(key = %key, "ignoring standard map key");
                continue;
            };
            match entries.get_mut(&pgn) {
                Some(existing) => {
                    if existing.pgn_name.is_empty() {
                        existing.pgn_name = entry.pgn_name;
                    }
                    existing.spns.extend(entry.spns);
                }
                None => {
                    entries.insert(pgn, entry);
                }
            }
        }
        info!(pgns = entries.len(), "Loaded standard PGN map");
        Ok(StandardMap::Loaded(entries))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, StandardMap::Loaded(_))
    }

    pub fn get(&self, pgn: u32) -> Option<&StandardPgn> {
        match self {
            StandardMap::Empty => None,
            StandardMap::Loaded(entries) => entries.get(&pgn),
        }
    }

    /// Non-zero SPNs listed under any of `pgns`.
    pub fn spns_for_pgns<'a>(&self, pgns: impl IntoIterator<Item = &'a u32>) -> BTreeSet<u32> {
        pgns.into_iter()
            .filter_map(|pgn| self.get(*pgn))
            .flat_map(|entry| entry.spns.iter().filter_map(listed_spn))
            .collect()
    }

    pub fn summarize<'a>(&self, pgns: impl IntoIterator<Item = &'a u32>) -> StandardSummary {
        let mut summary = StandardSummary::default();
        let mut unique = BTreeSet::new();
        for &pgn in pgns {
            let Some(entry) = self.get(pgn) else {
                continue;
            };
            let spns: Vec<MappedSpn> = entry
                .spns
                .iter()
                .filter_map(|listed| {
                    let spn = listed_spn(listed)?;
                    let name = if listed.name.is_empty() {
                        format!("SPN_{spn}")
                    } else {
                        listed.name.clone()
                    };
                    Some(MappedSpn { spn, name })
                })
                .collect();
            summary.spn_occurrences += spns.len();
            unique.extend(spns.iter().map(|mapped| mapped.spn));
            summary.pgn_spn_mapping.insert(
                pgn,
                MappedPgn {
                    pgn,
                    name: entry.pgn_name.clone(),
                    spn_count: spns.len(),
                    spns,
                },
            );
        }
        summary.pgn_count = summary.pgn_spn_mapping.len();
        summary.unique_spn_count = unique.len();
        summary
    }
}

fn listed_spn(listed: &StandardSpn) -> Option<u32> {
    listed.spn.filter(|spn| *spn != 0)
}

/// All-digit keys are decimal; anything with a hex letter or `0x` prefix is hex.
fn parse_pgn_key(key: &str) -> Option<u32> {
    let key = key.trim();
    if let Some(hex) = key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    if key.chars().all(|c| c.is_ascii_digit()) {
        return key.parse().ok();
    }
    u32::from_str_radix(key, 16).ok()
}
