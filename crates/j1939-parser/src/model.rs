use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};

use crate::can_id::PgnId;
use crate::errors::ParserAttempt;

/// Identifies one SPN sighting. The PGN is unknown when the SPN was found
/// outside any PGN context (e.g. a free-text `SPN: 190` cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SpnKey {
    pub pgn: Option<u32>,
    pub spn: u32,
}

impl SpnKey {
    pub fn new(pgn: Option<u32>, spn: u32) -> Self {
        Self { pgn, spn }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpnObservation {
    pub description: String,
    pub value: Option<String>,
}

impl SpnObservation {
    fn absorb(&mut self, other: SpnObservation) {
        if !other.description.is_empty() {
            self.description = other.description;
        }
        if let Some(value) = other.value.filter(|v| !v.is_empty()) {
            self.value = Some(value);
        }
    }
}

/// Which extraction path produced a file's PGN occurrence counts. Ordered by
/// trust: a higher variant replaces a lower one when both are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsSource {
    EmbeddedCells,
    StructuredColumns,
    RawFrames,
    IndexedMessages,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PgnStats {
    /// Every counted occurrence, duplicates included.
    pub total_pgn_messages: usize,
    pub unique_pgns: BTreeSet<u32>,
}

impl PgnStats {
    pub fn record(&mut self, pgn: u32) {
        self.total_pgn_messages += 1;
        self.unique_pgns.insert(pgn);
    }

    pub fn unique_pgn_count(&self) -> usize {
        self.unique_pgns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_pgn_messages == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub vehicle_name: Option<String>,
    pub brand: Option<String>,
    pub pgns: BTreeSet<u32>,
    pub spns: BTreeMap<SpnKey, SpnObservation>,
    pub stats: Option<(StatsSource, PgnStats)>,
    /// PGNs inferred without a PGN or CAN-ID column to anchor them. Adopted
    /// only when no extractor located such a column.
    pub guessed: Option<(StatsSource, PgnStats)>,
    /// Set when a PGN, PGN-hex or CAN-ID column/header was located.
    pub located_pgn_column: bool,
}

impl Extraction {
    pub fn insert_spn(&mut self, key: SpnKey, observation: SpnObservation) {
        match self.spns.get_mut(&key) {
            Some(existing) => existing.absorb(observation),
            None => {
                self.spns.insert(key, observation);
            }
        }
    }

    /// Inserts an SPN seen without PGN context. If the SPN is already known
    /// under some PGN, the observation is folded into that entry instead.
    pub fn insert_unkeyed_spn(&mut self, spn: u32, observation: SpnObservation) {
        let existing = self
            .spns
            .keys()
            .find(|key| key.spn == spn && key.pgn.is_some())
            .copied();
        let key = existing.unwrap_or(SpnKey::new(None, spn));
        self.insert_spn(key, observation);
    }

    pub fn set_stats(&mut self, source: StatsSource, stats: PgnStats) {
        keep_better(&mut self.stats, source, stats);
    }

    pub fn set_guess(&mut self, source: StatsSource, stats: PgnStats) {
        keep_better(&mut self.guessed, source, stats);
    }

    pub fn adopt_guess(&mut self) {
        if let Some((source, stats)) = self.guessed.take() {
            self.pgns.extend(stats.unique_pgns.iter().copied());
            self.set_stats(source, stats);
        }
    }

    pub fn merge(&mut self, other: Extraction) {
        if self.vehicle_name.is_none() {
            self.vehicle_name = other.vehicle_name;
        }
        if self.brand.is_none() {
            self.brand = other.brand;
        }
        self.pgns.extend(other.pgns);
        for (key, observation) in other.spns {
            if key.pgn.is_none() {
                self.insert_unkeyed_spn(key.spn, observation);
            } else {
                self.insert_spn(key, observation);
            }
        }
        if let Some((source, stats)) = other.stats {
            self.set_stats(source, stats);
        }
        if let Some((source, stats)) = other.guessed {
            self.set_guess(source, stats);
        }
        self.located_pgn_column |= other.located_pgn_column;
    }

    pub fn is_empty(&self) -> bool {
        self.pgns.is_empty() && self.spns.is_empty()
    }
}

fn keep_better(
    slot: &mut Option<(StatsSource, PgnStats)>,
    source: StatsSource,
    stats: PgnStats,
) {
    if stats.is_empty() {
        return;
    }
    match slot {
        Some((current, _)) if *current >= source => {}
        _ => *slot = Some((source, stats)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpnEntry {
    pub pgn: Option<u32>,
    pub spn: u32,
    pub description: String,
    pub value: Option<String>,
}

/// Normalized result of parsing one uploaded log file.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRecord {
    pub source_file: String,
    pub vehicle_name: String,
    pub brand: String,
    pub encoding: Option<String>,
    pub pgns: BTreeSet<u32>,
    #[serde(rename = "spns", serialize_with = "serialize_spn_occurrences")]
    pub spn_occurrences: BTreeMap<SpnKey, SpnObservation>,
    pub total_pgn_messages: usize,
    pub unique_pgn_count: usize,
    pub unique_pgn_list: Vec<PgnId>,
    pub stats_source: Option<StatsSource>,
    pub extractors: Vec<&'static str>,
    #[serde(skip)]
    pub attempts: Vec<ParserAttempt>,
}

impl SpnEntry {
    fn new(key: &SpnKey, observation: &SpnObservation) -> Self {
        Self {
            pgn: key.pgn,
            spn: key.spn,
            description: observation.description.clone(),
            value: observation.value.clone(),
        }
    }
}

impl ExtractionRecord {
    pub fn spn_numbers(&self) -> BTreeSet<u32> {
        self.spn_occurrences.keys().map(|key| key.spn).collect()
    }

    pub fn spn_entries(&self) -> Vec<SpnEntry> {
        self.spn_occurrences
            .iter()
            .map(|(key, observation)| SpnEntry::new(key, observation))
            .collect()
    }

    pub fn description_of(&self, spn: u32) -> Option<&str> {
        self.spn_occurrences
            .iter()
            .find(|(key, _)| key.spn == spn)
            .map(|(_, observation)| observation.description.as_str())
    }

    pub fn pgn_of(&self, spn: u32) -> Option<u32> {
        self.spn_occurrences
            .keys()
            .filter(|key| key.spn == spn)
            .find_map(|key| key.pgn)
    }
}

fn serialize_spn_occurrences<S>(
    occurrences: &BTreeMap<SpnKey, SpnObservation>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(
        occurrences
            .iter()
            .map(|(key, observation)| SpnEntry::new(key, observation)),
    )
}
