use j1939_core::{ingest_files, Aggregator, FileInput, FileStatus, ParameterTable, StandardMap};
use j1939_parser::ExtractorConfig;

fn fixture(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../j1939-parser/tests/data")
        .join(name);
    std::fs::read(path).expect("read fixture")
}

#[test]
fn ingestion_parses_each_file() {
    let content = fixture("vendor_export.csv");
    let inputs = [FileInput {
        path: "vendor_export.csv",
        contents: &content,
    }];

    let batch = ingest_files(&inputs, &ExtractorConfig::default());

    assert_eq!(batch.records.len(), 1);
    assert!(batch.errors.is_empty());
    assert_eq!(batch.reports.len(), 1);
    assert_eq!(batch.reports[0].status, FileStatus::Parsed);
    assert_eq!(batch.reports[0].hash.len(), 64);
    assert!(batch.records[0].attempts.is_empty());
}

#[test]
fn corrupt_file_does_not_stop_the_batch() {
    let vendor = fixture("vendor_export.csv");
    let candump = fixture("candump.log");
    let inputs = [
        FileInput {
            path: "vendor_export.csv",
            contents: &vendor,
        },
        FileInput {
            path: "Volvo_FH.xlsx",
            contents: b"PK\x03\x04 truncated upload",
        },
        FileInput {
            path: "candump.log",
            contents: &candump,
        },
    ];

    let batch = ingest_files(&inputs, &ExtractorConfig::default());

    assert_eq!(batch.records.len(), 2);
    assert!(batch.has_records());
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].file_name, "Volvo_FH.xlsx");
    let statuses: Vec<FileStatus> = batch.reports.iter().map(|report| report.status).collect();
    assert_eq!(
        statuses,
        vec![FileStatus::Parsed, FileStatus::Failed, FileStatus::Parsed]
    );
    assert!(batch.reports[1].error.is_some());
    assert!(!batch.reports[2].attempts.is_empty());

    let table = ParameterTable::new();
    let standard = StandardMap::Empty;
    let summary = Aggregator::new(&table, &standard).aggregate(&batch.records);
    assert_eq!(summary.total_vehicles, 2);
    assert_eq!(summary.total_pgn_count, 5);
    assert_eq!(summary.unique_pgn_count, 3);
    assert_eq!(summary.unique_spn_list, vec![84, 959]);
}

#[test]
fn identical_uploads_are_both_processed() {
    let content = fixture("candump.log");
    let inputs = [
        FileInput {
            path: "truck_a.log",
            contents: &content,
        },
        FileInput {
            path: "truck_b.log",
            contents: &content,
        },
    ];

    let batch = ingest_files(&inputs, &ExtractorConfig::default());

    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.reports[0].hash, batch.reports[1].hash);
    assert_eq!(batch.records[1].vehicle_name, "truck_b");
}
