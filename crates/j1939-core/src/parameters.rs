use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::decoder::{decode, DecodeResult};
use crate::error::{CoreError, Result};

/// Decode metadata for one SPN.
///
/// Field names on the wire follow the master-table column set
/// (`SPN_Number`, `PGN_DEC`, ...), so a definition round-trips through the
/// same CSV and JSON shapes the seed set and master uploads use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    #[serde(rename = "SPN_Number")]
    pub spn_number: u32,
    #[serde(rename = "PGN_DEC")]
    pub pgn_decimal: u32,
    #[serde(rename = "PGN_HEX")]
    pub pgn_hex: String,
    #[serde(rename = "SPN_Description")]
    pub description: String,
    #[serde(rename = "Unit")]
    pub unit: String,
    #[serde(rename = "Data_Length_Bytes")]
    pub data_length_bytes: u8,
    /// 1-indexed position of the first byte within the 8-byte payload.
    #[serde(rename = "Start_Byte")]
    pub start_byte: u8,
    /// Bit offset within the start byte; only used by sub-byte fields.
    #[serde(rename = "Start_Bit")]
    pub start_bit: u8,
    #[serde(rename = "Bit_Length")]
    pub bit_length: u8,
    #[serde(rename = "Resolution")]
    pub resolution: f64,
    #[serde(rename = "Offset")]
    pub offset: f64,
    #[serde(rename = "Min_Value")]
    pub min_value: Option<f64>,
    #[serde(rename = "Max_Value")]
    pub max_value: Option<f64>,
}

impl ParameterDefinition {
    /// Decodes an 8-byte payload with this definition.
    pub fn decode(&self, payload: &[u8]) -> DecodeResult {
        decode(self, payload)
    }
}

/// Uppercase hex with no `0x` prefix or `h` suffix, padded to four digits.
/// Input that is not hex is returned trimmed and uppercased.
pub fn normalize_pgn_hex(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    let digits = upper.strip_prefix("0X").unwrap_or(&upper);
    let digits = digits.strip_suffix('H').unwrap_or(digits);
    match u32::from_str_radix(digits, 16) {
        Ok(value) => format!("{value:04X}"),
        Err(_) => upper,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// SPN-keyed definition store.
///
/// Reads take a shared lock, so concurrent lookups during a decode run never
/// block each other. Each upsert replaces one entry under the write lock.
#[derive(Debug, Default)]
pub struct ParameterTable {
    definitions: RwLock<BTreeMap<u32, ParameterDefinition>>,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definitions(definitions: impl IntoIterator<Item = ParameterDefinition>) -> Self {
        let table = Self::new();
        for definition in definitions {
            table.upsert(definition);
        }
        table
    }

    pub fn get(&self, spn: u32) -> Option<ParameterDefinition> {
        self.read().get(&spn).cloned()
    }

    pub fn require(&self, spn: u32) -> Result<ParameterDefinition> {
        self.get(spn).ok_or(CoreError::DefinitionNotFound(spn))
    }

    /// Definitions sharing `pgn`, ordered by SPN.
    pub fn list_by_pgn(&self, pgn: u32) -> Vec<ParameterDefinition> {
        self.read()
            .values()
            .filter(|definition| definition.pgn_decimal == pgn)
            .cloned()
            .collect()
    }

    /// Inserts or replaces the definition for its SPN.
    pub fn upsert(&self, mut definition: ParameterDefinition) -> UpsertOutcome {
        definition.pgn_hex = normalize_pgn_hex(&definition.pgn_hex);
        match self.write().insert(definition.spn_number, definition) {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Created,
        }
    }

    /// Every definition, ordered by (PGN, SPN).
    pub fn definitions(&self) -> Vec<ParameterDefinition> {
        let mut definitions: Vec<_> = self.read().values().cloned().collect();
        definitions.sort_by_key(|definition| (definition.pgn_decimal, definition.spn_number));
        definitions
    }

    /// SPNs defined under any of `pgns`.
    pub fn spns_for_pgns<'a>(&self, pgns: impl IntoIterator<Item = &'a u32>) -> BTreeSet<u32> {
        let wanted: BTreeSet<u32> = pgns.into_iter().copied().collect();
        self.read()
            .values()
            .filter(|definition| wanted.contains(&definition.pgn_decimal))
            .map(|definition| definition.spn_number)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Looks up `spn` and decodes `payload` with it. Only a missing
    /// definition is an error; decode problems are reported in the result.
    pub fn decode(&self, spn: u32, payload: &[u8]) -> Result<DecodeResult> {
        let guard = self.read();
        let definition = guard.get(&spn).ok_or(CoreError::DefinitionNotFound(spn))?;
        Ok(decode(definition, payload))
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<u32, ParameterDefinition>> {
        self.definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<u32, ParameterDefinition>> {
        self.definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pgn_hex_forms() {
        assert_eq!(normalize_pgn_hex("0xfef1"), "FEF1");
        assert_eq!(normalize_pgn_hex(" FEF1h "), "FEF1");
        assert_eq!(normalize_pgn_hex("0"), "0000");
        assert_eq!(normalize_pgn_hex("f004"), "F004");
        assert_eq!(normalize_pgn_hex("n/a"), "N/A");
    }
}
