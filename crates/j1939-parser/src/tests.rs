use std::fs;
use std::path::PathBuf;

use polars::prelude::*;

use crate::config::ExtractorConfig;
use crate::errors::ParserError;
use crate::model::{SpnKey, StatsSource};
use crate::registry::{all_extractors, extract_dataframe, extract_log_file, extract_with_extractors};
use crate::source::LogSource;
use crate::tabular::{Tabular, TextTable};

fn fixture(path: &str) -> Vec<u8> {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

#[test]
fn index_rows_drive_message_counts() {
    let config = ExtractorConfig::default();
    let record = extract_log_file(&fixture("vendor_export.csv"), "vendor_export.csv", &config)
        .expect("vendor export parse failed");

    assert_eq!(record.total_pgn_messages, 1);
    assert_eq!(record.unique_pgn_count, 1);
    assert_eq!(record.pgns.iter().copied().collect::<Vec<_>>(), vec![0xFEF1]);
    assert_eq!(record.stats_source, Some(StatsSource::IndexedMessages));
    assert_eq!(record.unique_pgn_list[0].hex, "FEF1");

    let seconds = record
        .spn_occurrences
        .get(&SpnKey::new(Some(0xFEF1), 959))
        .expect("SPN 959 should inherit the previous PGN");
    assert_eq!(seconds.description, "Seconds");
    assert_eq!(record.pgn_of(84), Some(65265));
    assert_eq!(record.description_of(84), Some("Wheel Speed"));
    assert_eq!(record.spn_numbers().into_iter().collect::<Vec<_>>(), vec![84, 959]);

    assert_eq!(record.vehicle_name, "vendor_export");
    assert_eq!(record.brand, "Unknown");
    assert_eq!(record.encoding.as_deref(), Some("utf-8"));
}

#[test]
fn gbk_csv_yields_vehicle_metadata() {
    let config = ExtractorConfig::default();
    let record = extract_log_file(&fixture("gbk_vehicle.csv"), "gbk_vehicle.csv", &config)
        .expect("GBK csv parse failed");

    let encoding = record.encoding.as_deref().unwrap_or_default();
    assert!(["gb2312", "gbk", "gb18030"].contains(&encoding), "{encoding}");
    assert_eq!(record.vehicle_name, "解放J6");
    assert_eq!(record.brand, "FAW");
    assert_eq!(
        record.pgns.iter().copied().collect::<Vec<_>>(),
        vec![61444, 65265]
    );
    assert_eq!(record.stats_source, Some(StatsSource::StructuredColumns));
    assert_eq!(record.total_pgn_messages, 2);
    assert_eq!(record.description_of(190), Some("发动机转速"));
    assert_eq!(record.pgn_of(84), Some(65265));
    assert!(!record.pgns.contains(&190), "SPN numbers must not leak into PGNs");
}

#[test]
fn candump_log_is_scanned_for_identifiers() {
    let config = ExtractorConfig::default();
    let record = extract_log_file(&fixture("candump.log"), "candump.log", &config)
        .expect("candump parse failed");

    assert_eq!(
        record.pgns.iter().copied().collect::<Vec<_>>(),
        vec![0xF004, 0xFEE9, 0xFEF1]
    );
    assert_eq!(record.total_pgn_messages, 4);
    assert_eq!(record.unique_pgn_count, 3);
    assert_eq!(record.stats_source, Some(StatsSource::RawFrames));
    assert!(record.spn_occurrences.is_empty());
    assert_eq!(record.extractors, vec!["raw_frames"]);
    assert!(record
        .attempts
        .iter()
        .any(|attempt| attempt.extractor == "structured_columns"));
}

#[test]
fn workbook_sheets_are_read() {
    let config = ExtractorConfig::default();
    let record = extract_log_file(&fixture("Scania_R450.xlsx"), "Scania_R450.xlsx", &config)
        .expect("workbook parse failed");

    assert_eq!(record.encoding, None);
    assert_eq!(record.vehicle_name, "Scania_R450");
    assert_eq!(record.brand, "Scania");
    assert_eq!(record.total_pgn_messages, 3);
    assert_eq!(record.unique_pgn_count, 2);
    assert_eq!(record.pgns.iter().copied().collect::<Vec<_>>(), vec![65254, 65265]);

    let speed = record
        .spn_occurrences
        .get(&SpnKey::new(Some(65265), 84))
        .expect("SPN 84");
    assert_eq!(speed.description, "Wheel-Based Vehicle Speed");
    assert_eq!(record.pgn_of(959), Some(65265));
    assert_eq!(record.pgn_of(960), Some(65254));
    assert!(record.attempts.iter().any(|attempt| attempt.extractor == "raw_frames"));
}

#[test]
fn corrupt_workbook_is_an_error() {
    let config = ExtractorConfig::default();
    let err = extract_log_file(b"definitely not a zip archive", "broken.xlsx", &config)
        .expect_err("corrupt workbook should fail");
    assert!(matches!(err, ParserError::Workbook { .. }));
}

#[test]
fn unrecognised_text_still_yields_a_record() {
    let config = ExtractorConfig::default();
    let record = extract_log_file(b"hello\nworld\n", "notes.txt", &config).expect("record");

    assert!(record.pgns.is_empty());
    assert!(record.spn_occurrences.is_empty());
    assert_eq!(record.total_pgn_messages, 0);
    assert_eq!(record.stats_source, None);
    assert_eq!(record.vehicle_name, "notes");
    assert!(record.extractors.is_empty());
    assert_eq!(record.attempts.len(), all_extractors().len());
}

#[test]
fn can_id_column_is_preferred_over_token_scan() {
    let config = ExtractorConfig::default();
    let text = "Volvo FH export\nTime;CAN ID;DLC;Data\n0.01;0x18FEF100;8;FF\n0.02;0CF00400;8;00\n0.03;;8;00\n";
    let record = extract_log_file(text.as_bytes(), "volvo_fh.txt", &config).expect("record");

    assert_eq!(
        record.pgns.iter().copied().collect::<Vec<_>>(),
        vec![0xF004, 0xFEF1]
    );
    assert_eq!(record.total_pgn_messages, 2);
    assert_eq!(record.brand, "Volvo");
}

#[test]
fn dataframe_with_embedded_labels() {
    let df = df![
        "Notes" => ["SPN: 190 2200RPM", "61444", "spn=84", "misc"],
    ]
    .expect("frame");
    let config = ExtractorConfig::default();
    let record = extract_dataframe(&df, "workshop_notes", &config).expect("record");

    assert_eq!(record.extractors, vec!["embedded_cells"]);
    assert_eq!(record.pgns.iter().copied().collect::<Vec<_>>(), vec![61444]);
    assert_eq!(record.stats_source, Some(StatsSource::EmbeddedCells));
    let engine_speed = record
        .spn_occurrences
        .get(&SpnKey::new(None, 190))
        .expect("SPN 190");
    assert_eq!(engine_speed.value.as_deref(), Some("2200RPM"));
    assert!(record.spn_occurrences.contains_key(&SpnKey::new(None, 84)));
}

#[test]
fn embedded_integers_can_be_disabled() {
    let df = df![
        "Notes" => ["61444", "SPN 110 85"],
    ]
    .expect("frame");
    let config = ExtractorConfig {
        embedded_integer_pgns: false,
        ..ExtractorConfig::default()
    };
    let record = extract_dataframe(&df, "notes", &config).expect("record");

    assert!(record.pgns.is_empty());
    assert_eq!(record.spn_numbers().into_iter().collect::<Vec<_>>(), vec![110]);
}

#[test]
fn dataframe_columns_are_typed_values() {
    let df = df![
        "PGN" => [65265i64, 61444, 42],
        "SPN" => [84i64, 190, 7],
        "Description" => ["Wheel Speed", "Engine Speed", "Row number"],
    ]
    .expect("frame");
    let config = ExtractorConfig::default();
    let record = extract_dataframe(&df, "frame", &config).expect("record");

    assert_eq!(
        record.pgns.iter().copied().collect::<Vec<_>>(),
        vec![61444, 65265]
    );
    assert_eq!(record.total_pgn_messages, 2);
    assert_eq!(record.description_of(190), Some("Engine Speed"));
    // PGN 42 is implausible, so SPN 7 stays with the last valid PGN.
    assert_eq!(record.pgn_of(7), Some(61444));
}

#[test]
fn later_descriptions_fill_empty_ones() {
    let text = "PGN,SPN,Description\n65265,84,\n65265,84,Wheel Speed\n65265,84,\n";
    let config = ExtractorConfig::default();
    let record = extract_log_file(text.as_bytes(), "speeds.csv", &config).expect("record");

    assert_eq!(record.description_of(84), Some("Wheel Speed"));
}

#[test]
fn custom_extractor_list() {
    let config = ExtractorConfig::default();
    let table = TextTable::parse("inline", "PGN(H),SPN\nFEF1,84\n", b',').expect("table");
    assert_eq!(table.row_count(), 1);
    let source = LogSource::from_tables("inline.csv", vec![Box::new(table)]);

    let structured_only = [all_extractors()[0]];
    let record = extract_with_extractors(&source, &config, &structured_only);
    assert_eq!(record.extractors, vec!["structured_columns"]);
    assert_eq!(record.pgns.iter().copied().collect::<Vec<_>>(), vec![0xFEF1]);
}

#[test]
fn record_serializes_spns_as_a_list() {
    let config = ExtractorConfig::default();
    let record = extract_log_file(&fixture("vendor_export.csv"), "vendor_export.csv", &config)
        .expect("record");
    let json = serde_json::to_value(&record).expect("json");

    let spns = json["spns"].as_array().expect("spns array");
    assert_eq!(spns.len(), 2);
    assert_eq!(json["unique_pgn_list"][0]["hex"], "FEF1");
    assert_eq!(json["stats_source"], "indexed_messages");
    assert!(json.get("attempts").is_none());
}

#[test]
fn row_number_id_column_is_not_a_can_id() {
    let config = ExtractorConfig::default();
    let text = "ID,PGN,SPN,Description\n1,65265,84,Wheel Speed\n2,61444,190,Engine Speed\n";
    let record = extract_log_file(text.as_bytes(), "ids.csv", &config).expect("record");

    assert_eq!(
        record.pgns.iter().copied().collect::<Vec<_>>(),
        vec![61444, 65265]
    );
    assert_eq!(record.stats_source, Some(StatsSource::StructuredColumns));
    assert_eq!(record.total_pgn_messages, 2);
    let unique: Vec<u32> = record.unique_pgn_list.iter().map(|pgn| pgn.decimal).collect();
    assert_eq!(unique, vec![61444, 65265]);
}

#[test]
fn sheets_with_and_without_index_are_summed() {
    let config = ExtractorConfig::default();
    let indexed = TextTable::parse("A", "Index,PGN(H),SPN\n1,FEF1,84\n", b',').expect("sheet A");
    let plain = TextTable::parse("B", "PGN,SPN\n61444,190\n65254,959\n", b',').expect("sheet B");
    let source = LogSource::from_tables("two_sheets.xlsx", vec![Box::new(indexed), Box::new(plain)]);

    let record = extract_with_extractors(&source, &config, all_extractors());

    assert_eq!(
        record.pgns.iter().copied().collect::<Vec<_>>(),
        vec![61444, 65254, 65265]
    );
    assert_eq!(record.total_pgn_messages, 3);
    assert_eq!(record.unique_pgn_count, 3);
    assert_eq!(record.stats_source, Some(StatsSource::IndexedMessages));
    assert_eq!(record.pgn_of(959), Some(65254));
}
