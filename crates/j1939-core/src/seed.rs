use serde::Serialize;
use tracing::info;

use crate::parameters::{ParameterDefinition, ParameterTable, UpsertOutcome};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub created: usize,
    pub updated: usize,
}

/// Upserts the built-in definitions. Running it again only updates.
pub fn seed(table: &ParameterTable) -> SeedReport {
    let mut report = SeedReport::default();
    for definition in builtin_definitions() {
        let spn = definition.spn_number;
        let pgn = definition.pgn_hex.clone();
        let description = definition.description.clone();
        match table.upsert(definition) {
            UpsertOutcome::Created => {
                report.created += 1;
                info!(spn, pgn = %pgn, description = %description, "Seeded parameter definition");
            }
            UpsertOutcome::Updated => {
                report.updated += 1;
                info!(spn, pgn = %pgn, description = %description, "Updated parameter definition");
            }
        }
    }
    report
}

/// SAE J1939-71 definitions for the time/date, vehicle speed, trip fuel and
/// high-resolution torque parameters.
pub fn builtin_definitions() -> Vec<ParameterDefinition> {
    PARAMETER_SEEDS.iter().map(ParameterSeed::definition).collect()
}

#[derive(Debug)]
struct ParameterSeed {
    spn: u32,
    pgn: u32,
    pgn_hex: &'static str,
    description: &'static str,
    unit: &'static str,
    data_length_bytes: u8,
    start_byte: u8,
    start_bit: u8,
    bit_length: u8,
    resolution: f64,
    offset: f64,
    min_value: f64,
    max_value: f64,
}

impl ParameterSeed {
    fn definition(&self) -> ParameterDefinition {
        ParameterDefinition {
            spn_number: self.spn,
            pgn_decimal: self.pgn,
            pgn_hex: self.pgn_hex.to_string(),
            description: self.description.to_string(),
            unit: self.unit.to_string(),
            data_length_bytes: self.data_length_bytes,
            start_byte: self.start_byte,
            start_bit: self.start_bit,
            bit_length: self.bit_length,
            resolution: self.resolution,
            offset: self.offset,
            min_value: Some(self.min_value),
            max_value: Some(self.max_value),
        }
    }
}

// 0.00390625 is 1/256 km/h per bit.
static PARAMETER_SEEDS: &[ParameterSeed] = &[
    ParameterSeed {
        spn: 4191,
        pgn: 0,
        pgn_hex: "0000",
        description: "Engine Requested Torque - High Resolution",
        unit: "%",
        data_length_bytes: 1,
        start_byte: 6,
        start_bit: 4,
        bit_length: 4,
        resolution: 0.125,
        offset: 0.0,
        min_value: 0.0,
        max_value: 125.0,
    },
    ParameterSeed {
        spn: 84,
        pgn: 65265,
        pgn_hex: "FEF1",
        description: "Wheel-Based Vehicle Speed",
        unit: "km/h",
        data_length_bytes: 2,
        start_byte: 2,
        start_bit: 0,
        bit_length: 16,
        resolution: 0.00390625,
        offset: 0.0,
        min_value: 0.0,
        max_value: 250.996,
    },
    ParameterSeed {
        spn: 182,
        pgn: 65257,
        pgn_hex: "FEE9",
        description: "Engine Trip Fuel",
        unit: "L",
        data_length_bytes: 4,
        start_byte: 1,
        start_bit: 0,
        bit_length: 32,
        resolution: 0.5,
        offset: 0.0,
        min_value: 0.0,
        max_value: 2147483647.5,
    },
    ParameterSeed {
        spn: 959,
        pgn: 65254,
        pgn_hex: "FEE6",
        description: "Seconds",
        unit: "s",
        data_length_bytes: 1,
        start_byte: 1,
        start_bit: 0,
        bit_length: 8,
        resolution: 0.25,
        offset: 0.0,
        min_value: 0.0,
        max_value: 59.75,
    },
    ParameterSeed {
        spn: 960,
        pgn: 65254,
        pgn_hex: "FEE6",
        description: "Minutes",
        unit: "min",
        data_length_bytes: 1,
        start_byte: 2,
        start_bit: 0,
        bit_length: 8,
        resolution: 1.0,
        offset: 0.0,
        min_value: 0.0,
        max_value: 59.0,
    },
    ParameterSeed {
        spn: 961,
        pgn: 65254,
        pgn_hex: "FEE6",
        description: "Hours",
        unit: "hr",
        data_length_bytes: 1,
        start_byte: 3,
        start_bit: 0,
        bit_length: 8,
        resolution: 1.0,
        offset: 0.0,
        min_value: 0.0,
        max_value: 23.0,
    },
    ParameterSeed {
        spn: 962,
        pgn: 65254,
        pgn_hex: "FEE6",
        description: "Day",
        unit: "day",
        data_length_bytes: 1,
        start_byte: 4,
        start_bit: 0,
        bit_length: 8,
        resolution: 0.25,
        offset: 0.0,
        min_value: 0.25,
        max_value: 31.0,
    },
    ParameterSeed {
        spn: 963,
        pgn: 65254,
        pgn_hex: "FEE6",
        description: "Month",
        unit: "month",
        data_length_bytes: 1,
        start_byte: 5,
        start_bit: 0,
        bit_length: 8,
        resolution: 1.0,
        offset: 0.0,
        min_value: 1.0,
        max_value: 12.0,
    },
    ParameterSeed {
        spn: 964,
        pgn: 65254,
        pgn_hex: "FEE6",
        description: "Year",
        unit: "year",
        data_length_bytes: 2,
        start_byte: 6,
        start_bit: 0,
        bit_length: 16,
        resolution: 1.0,
        offset: 1985.0,
        min_value: 1985.0,
        max_value: 2235.0,
    },
];
