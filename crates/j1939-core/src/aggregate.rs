use std::collections::BTreeSet;

use j1939_parser::{ExtractionRecord, PgnId};
use serde::Serialize;

use crate::parameters::ParameterTable;
use crate::standard_map::{StandardMap, StandardSummary};

/// An SPN reachable from the observed PGNs, named from whichever reference
/// knows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedSpnDetail {
    pub spn: u32,
    pub pgn: Option<u32>,
    pub name: String,
}

/// The standard-map view of one file's PGNs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleStandardSummary {
    pub source_file: String,
    pub vehicle_name: String,
    pub standard: StandardSummary,
}

/// Cross-file totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_vehicles: usize,
    /// Per-file PGN occurrence counts summed, duplicates included.
    pub total_pgn_count: usize,
    pub unique_pgn_count: usize,
    pub unique_pgn_list: Vec<PgnId>,
    /// SPNs seen in the files themselves.
    pub unique_spn_count: usize,
    pub unique_spn_list: Vec<u32>,
    /// SPNs defined for any observed PGN, whether or not a file listed them.
    pub j1939_unique_spn_count: usize,
    pub j1939_spn_list: Vec<u32>,
    pub j1939_spn_details: Vec<MappedSpnDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard: Option<StandardSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub standard_by_vehicle: Vec<VehicleStandardSummary>,
}

pub struct Aggregator<'a> {
    parameters: &'a ParameterTable,
    standard: &'a StandardMap,
}

impl<'a> Aggregator<'a> {
    pub fn new(parameters: &'a ParameterTable, standard: &'a StandardMap) -> Self {
        Self {
            parameters,
            standard,
        }
    }

    pub fn aggregate(&self, records: &[ExtractionRecord]) -> Summary {
        let pgns: BTreeSet<u32> = records
            .iter()
            .flat_map(|record| record.pgns.iter().copied())
            .collect();
        let observed_spns: BTreeSet<u32> = records
            .iter()
            .flat_map(|record| record.spn_occurrences.keys().map(|key| key.spn))
            .collect();

        let mut mapped = self.parameters.spns_for_pgns(&pgns);
        mapped.extend(self.standard.spns_for_pgns(&pgns));
        let details = mapped.iter().map(|&spn| self.detail(spn, &pgns)).collect();
        let standard_by_vehicle = if self.standard.is_loaded() {
            records
                .iter()
                .map(|record| VehicleStandardSummary {
                    source_file: record.source_file.clone(),
                    vehicle_name: record.vehicle_name.clone(),
                    standard: self.standard.summarize(&record.pgns),
                })
                .collect()
        } else {
            Vec::new()
        };

        Summary {
            total_vehicles: records.len(),
            total_pgn_count: records.iter().map(|record| record.total_pgn_messages).sum(),
            unique_pgn_count: pgns.len(),
            unique_pgn_list: pgns.iter().copied().map(PgnId::new).collect(),
            unique_spn_count: observed_spns.len(),
            unique_spn_list: observed_spns.into_iter().collect(),
            j1939_unique_spn_count: mapped.len(),
            j1939_spn_list: mapped.into_iter().collect(),
            j1939_spn_details: details,
            standard: self
                .standard
                .is_loaded()
                .then(|| self.standard.summarize(&pgns)),
            standard_by_vehicle,
        }
    }

    fn detail(&self, spn: u32, pgns: &BTreeSet<u32>) -> MappedSpnDetail {
        if let Some(definition) = self.parameters.get(spn) {
            return MappedSpnDetail {
                spn,
                pgn: Some(definition.pgn_decimal),
                name: definition.description,
            };
        }
        let listed = pgns.iter().find_map(|&pgn| {
            let entry = self.standard.get(pgn)?;
            entry
                .spns
                .iter()
                .find(|listed| listed.spn == Some(spn))
                .map(|listed| (pgn, listed.name.clone()))
        });
        match listed {
            Some((pgn, name)) => MappedSpnDetail {
                spn,
                pgn: Some(pgn),
                name,
            },
            None => MappedSpnDetail {
                spn,
                pgn: None,
                name: String::new(),
            },
        }
    }
}
