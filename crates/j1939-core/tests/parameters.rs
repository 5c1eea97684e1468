use std::thread;

use j1939_core::{
    builtin_definitions, import_master_csv, parse_master_csv, seed, CoreError, ParameterDefinition,
    ParameterTable, UpsertOutcome,
};

const MASTER: &str = "\
SPN_Number,PGN_DEC,PGN_HEX,SPN_Description,Unit,Data_Length_Bytes,Start_Byte,Start_Bit,Bit_Length,Resolution,Offset,Min_Value,Max_Value
190,61444,0xF004,Engine Speed,rpm,2,4-5,0,16,0.125,0,0,8031.875
";

#[test]
fn seeding_twice_only_updates() {
    let table = ParameterTable::new();

    let first = seed(&table);
    assert_eq!(first.created, 9);
    assert_eq!(first.updated, 0);

    let second = seed(&table);
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 9);
    assert_eq!(table.len(), 9);
}

#[test]
fn definitions_are_grouped_by_pgn() {
    let table = ParameterTable::with_definitions(builtin_definitions());

    let time_date: Vec<u32> = table
        .list_by_pgn(65254)
        .iter()
        .map(|definition| definition.spn_number)
        .collect();
    assert_eq!(time_date, vec![959, 960, 961, 962, 963, 964]);
    assert!(table.list_by_pgn(61444).is_empty());

    let ordered: Vec<(u32, u32)> = table
        .definitions()
        .iter()
        .map(|definition| (definition.pgn_decimal, definition.spn_number))
        .collect();
    assert_eq!(ordered.first(), Some(&(0, 4191)));
    assert_eq!(ordered.last(), Some(&(65265, 84)));
    assert!(ordered.windows(2).all(|pair| pair[0] < pair[1]));

    let spns = table.spns_for_pgns(&[65265, 65257]);
    assert_eq!(spns.into_iter().collect::<Vec<_>>(), vec![84, 182]);
}

#[test]
fn upsert_normalizes_pgn_hex() {
    let table = ParameterTable::with_definitions(builtin_definitions());
    assert_eq!(table.require(4191).expect("seeded").pgn_hex, "0000");

    let mut speed = table.require(84).expect("seeded");
    speed.pgn_hex = "0xfef1".to_string();
    assert_eq!(table.upsert(speed), UpsertOutcome::Updated);
    assert_eq!(table.require(84).expect("seeded").pgn_hex, "FEF1");

    assert!(matches!(table.require(5), Err(CoreError::DefinitionNotFound(5))));
}

#[test]
fn reimporting_a_master_row_updates_it() {
    let table = ParameterTable::with_definitions(builtin_definitions());
    let payload = [0, 0, 0, 0x20, 0x4E, 0, 0, 0];

    let first = import_master_csv(MASTER.as_bytes(), &table).expect("import");
    assert_eq!((first.created, first.updated), (1, 0));
    assert!(first.skipped.is_empty());
    let before = table.decode(190, &payload).expect("decode");
    let stored = table.require(190).expect("imported");

    let second = import_master_csv(MASTER.as_bytes(), &table).expect("import");
    assert_eq!((second.created, second.updated), (0, 1));
    let after = table.decode(190, &payload).expect("decode");

    assert_eq!(before, after);
    assert_eq!(after.physical_value, Some(2500.0));
    assert_eq!(table.require(190).expect("imported"), stored);
    assert_eq!(stored.start_byte, 4);
    assert_eq!(stored.pgn_hex, "F004");
}

#[test]
fn relaxed_headers_and_defaults() {
    let csv = "spn,PGN,Description,Data_Length,Bit_Length,Start_Byte\n\
               110,FEEE,Engine Coolant Temperature,1,8,1\n\
               175,65262,Engine Oil Temperature 1,2,16,3\n";
    let rows = parse_master_csv(csv.as_bytes()).expect("parse");
    assert!(rows.skipped.is_empty());

    let coolant = &rows.definitions[0];
    assert_eq!(coolant.spn_number, 110);
    assert_eq!(coolant.pgn_decimal, 65262);
    assert_eq!(coolant.pgn_hex, "FEEE");
    assert_eq!(coolant.resolution, 1.0);
    assert_eq!(coolant.offset, 0.0);
    assert_eq!(coolant.min_value, None);

    let oil = &rows.definitions[1];
    assert_eq!(oil.pgn_decimal, 65262);
    assert_eq!(oil.pgn_hex, "FEEE");
    assert_eq!((oil.data_length_bytes, oil.bit_length, oil.start_byte), (2, 16, 3));
}

#[test]
fn bad_rows_are_skipped_and_reported() {
    let csv = "SPN,PGN,Resolution\n\
               190,61444,0.125\n\
               abc,61444,1\n\
               84,65265,fast\n\
               91,,1\n";
    let table = ParameterTable::new();
    let report = import_master_csv(csv.as_bytes(), &table).expect("import");

    assert_eq!(report.created, 1);
    let lines: Vec<u64> = report.skipped.iter().map(|issue| issue.line).collect();
    assert_eq!(lines, vec![3, 4, 5]);
    assert!(report.skipped[1].message.contains("Resolution"));
    assert_eq!(table.len(), 1);
}

#[test]
fn master_without_spn_column_is_rejected() {
    let err = parse_master_csv(b"PGN,Description\n61444,Engine\n").expect_err("no SPN column");
    assert!(matches!(err, CoreError::MasterRow { line: 1, .. }));
}

#[test]
fn concurrent_upserts_replace_whole_definitions() {
    let table = ParameterTable::new();
    let variant = |writer: u8| ParameterDefinition {
        spn_number: 190,
        pgn_decimal: 61444,
        pgn_hex: "F004".to_string(),
        description: format!("writer {writer}"),
        unit: format!("unit {writer}"),
        data_length_bytes: 2,
        start_byte: writer,
        start_bit: 0,
        bit_length: 16,
        resolution: f64::from(writer),
        offset: 0.0,
        min_value: None,
        max_value: None,
    };

    thread::scope(|scope| {
        for writer in 1..=4u8 {
            let table = &table;
            scope.spawn(move || {
                for _ in 0..200 {
                    table.upsert(variant(writer));
                }
            });
        }
    });

    let stored = table.require(190).expect("stored");
    let writer = stored.start_byte;
    assert_eq!(stored, variant(writer));
    assert_eq!(table.len(), 1);
}
