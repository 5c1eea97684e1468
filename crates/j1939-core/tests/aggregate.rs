use j1939_core::{
    builtin_definitions, ingest_files, Aggregator, FileInput, ParameterTable, StandardMap,
};
use j1939_parser::ExtractorConfig;

const STANDARD_MAP: &str = r#"{
    "61444": {
        "pgn_name": "EEC1",
        "spns": [
            {"spn": 190, "name": "Engine Speed"},
            {"spn": 0, "name": "Reserved"},
            {"name": "Unnumbered"}
        ]
    },
    "F004": {"spns": [{"spn": 513}]},
    "00FEF1": {
        "pgn_name": "CCVS1",
        "spns": [
            {"spn": 84, "name": "Wheel-Based Vehicle Speed"},
            {"spn": 70, "name": "Parking Brake Switch"}
        ]
    },
    "not-a-pgn": {"spns": [{"spn": 1}]}
}"#;

fn fixture(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../j1939-parser/tests/data")
        .join(name);
    std::fs::read(path).expect("read fixture")
}

fn records(names: &[&str]) -> Vec<j1939_parser::ExtractionRecord> {
    let contents: Vec<Vec<u8>> = names.iter().map(|name| fixture(name)).collect();
    let inputs: Vec<FileInput<'_>> = names
        .iter()
        .zip(&contents)
        .map(|(name, content)| FileInput {
            path: name,
            contents: content,
        })
        .collect();
    ingest_files(&inputs, &ExtractorConfig::default()).records
}

#[test]
fn observed_and_mapped_spns_are_kept_apart() {
    let table = ParameterTable::with_definitions(builtin_definitions());
    let standard = StandardMap::Empty;
    let records = records(&["Scania_R450.xlsx", "candump.log"]);

    let summary = Aggregator::new(&table, &standard).aggregate(&records);

    assert_eq!(summary.total_vehicles, 2);
    assert_eq!(summary.total_pgn_count, 3 + 4);
    let pgns: Vec<u32> = summary.unique_pgn_list.iter().map(|pgn| pgn.decimal).collect();
    assert_eq!(pgns, vec![61444, 65254, 65257, 65265]);
    assert_eq!(summary.unique_pgn_count, 4);

    assert_eq!(summary.unique_spn_list, vec![84, 959, 960]);
    assert_eq!(summary.unique_spn_count, 3);
    assert_eq!(
        summary.j1939_spn_list,
        vec![84, 182, 959, 960, 961, 962, 963, 964]
    );
    assert_eq!(summary.j1939_unique_spn_count, 8);
    assert_eq!(summary.j1939_spn_details[1].name, "Engine Trip Fuel");
    assert_eq!(summary.j1939_spn_details[1].pgn, Some(65257));
    assert!(summary.standard.is_none());
    assert!(summary.standard_by_vehicle.is_empty());
}

#[test]
fn standard_map_extends_the_mapped_set() {
    let table = ParameterTable::with_definitions(builtin_definitions());
    let standard = StandardMap::from_json_str(STANDARD_MAP).expect("map");
    let records = records(&["candump.log"]);

    let summary = Aggregator::new(&table, &standard).aggregate(&records);

    assert_eq!(summary.j1939_spn_list, vec![70, 84, 182, 190, 513]);
    let engine_speed = summary
        .j1939_spn_details
        .iter()
        .find(|detail| detail.spn == 190)
        .expect("SPN 190");
    assert_eq!(engine_speed.name, "Engine Speed");
    assert_eq!(engine_speed.pgn, Some(61444));

    let view = summary.standard.expect("standard view");
    assert_eq!(view.pgn_count, 2);
    assert_eq!(view.spn_occurrences, 4);
    assert_eq!(view.unique_spn_count, 4);
    let eec1 = &view.pgn_spn_mapping[&61444];
    assert_eq!(eec1.name, "EEC1");
    assert_eq!(eec1.spn_count, 2);
    assert_eq!(eec1.spns[1].name, "SPN_513");
}

#[test]
fn standard_map_is_summarized_per_vehicle() {
    let table = ParameterTable::with_definitions(builtin_definitions());
    let standard = StandardMap::from_json_str(STANDARD_MAP).expect("map");
    let records = records(&["Scania_R450.xlsx", "candump.log"]);

    let summary = Aggregator::new(&table, &standard).aggregate(&records);

    let per_vehicle: Vec<(&str, usize, usize)> = summary
        .standard_by_vehicle
        .iter()
        .map(|vehicle| {
            (
                vehicle.source_file.as_str(),
                vehicle.standard.pgn_count,
                vehicle.standard.spn_occurrences,
            )
        })
        .collect();
    assert_eq!(
        per_vehicle,
        vec![("Scania_R450.xlsx", 1, 2), ("candump.log", 2, 4)]
    );
    assert_eq!(summary.standard_by_vehicle[0].vehicle_name, "Scania_R450");
    assert!(summary.standard_by_vehicle[0]
        .standard
        .pgn_spn_mapping
        .contains_key(&65265));
    assert_eq!(summary.standard.expect("batch view").pgn_count, 2);
}

#[test]
fn empty_standard_map_summarizes_to_zero() {
    let summary = StandardMap::Empty.summarize(&[61444, 65265]);
    assert_eq!(summary.pgn_count, 0);
    assert_eq!(summary.spn_occurrences, 0);
    assert_eq!(summary.unique_spn_count, 0);
    assert!(summary.pgn_spn_mapping.is_empty());
}

#[test]
fn empty_batch_aggregates_to_zero() {
    let table = ParameterTable::new();
    let standard = StandardMap::Empty;
    let summary = Aggregator::new(&table, &standard).aggregate(&[]);

    assert_eq!(summary.total_vehicles, 0);
    assert_eq!(summary.total_pgn_count, 0);
    assert!(summary.unique_pgn_list.is_empty());
    assert!(summary.j1939_spn_list.is_empty());
}

#[test]
fn malformed_standard_map_is_an_error() {
    assert!(StandardMap::from_json_str("[1, 2, 3]").is_err());
}
