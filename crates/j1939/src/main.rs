use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use j1939_core::{
    import_master_csv, ingest_files, seed, Aggregator, FileInput, ParameterTable, StandardMap,
};
use j1939_parser::ExtractorConfig;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "J1939 log extraction and SPN decoding", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode one SPN from an 8-byte CAN payload
    Decode(DecodeArgs),
    /// Extract PGNs and SPNs from log files and print per-file and total results
    Extract(ExtractArgs),
    /// List the parameter definitions, ordered by PGN then SPN
    Parameters(TableArgs),
    /// Validate a master parameter CSV and report what it would change
    ImportMaster {
        /// CSV with SPN_Number, PGN_DEC, ... columns
        csv: PathBuf,
    },
}

#[derive(Args, Debug)]
struct TableArgs {
    /// Master CSV applied on top of the built-in definitions
    #[arg(long)]
    master: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    #[arg(long)]
    spn: u32,
    /// Payload bytes in hex, e.g. "00 00 19 00 FF FF FF FF" or "00001900FFFFFFFF"
    #[arg(long)]
    data: String,
    #[command(flatten)]
    table: TableArgs,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    files: Vec<PathBuf>,
    /// Also read every file below this directory
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// TOML file overriding the extraction heuristics
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON PGN→SPN reference map
    #[arg(long, env = "J1939_STANDARD_MAP")]
    standard_map: Option<PathBuf>,
    #[command(flatten)]
    table: TableArgs,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Decode(args) => {
            let table = load_table(&args.table)?;
            let payload = parse_payload(&args.data)?;
            let result = table.decode(args.spn, &payload)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Extract(args) => run_extract(args)?,
        Command::Parameters(args) => {
            let table = load_table(&args)?;
            println!("{}", parameter_listing(&table));
        }
        Command::ImportMaster { csv } => {
            let table = ParameterTable::new();
            seed(&table);
            let bytes = fs::read(&csv).with_context(|| format!("reading {}", csv.display()))?;
            let report = import_master_csv(&bytes, &table)?;
            for issue in &report.skipped {
                warn!(line = issue.line, message = %issue.message, "Skipped master row");
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => ExtractorConfig::from_path(path)
            .with_context(|| format!("loading extractor config {}", path.display()))?,
        None => ExtractorConfig::default(),
    };
    let standard = match &args.standard_map {
        Some(path) => StandardMap::from_path(path)
            .with_context(|| format!("loading standard map {}", path.display()))?,
        None => StandardMap::Empty,
    };
    let table = load_table(&args.table)?;

    let mut paths = args.files.clone();
    if let Some(dir) = &args.dir {
        paths.extend(files_below(dir)?);
    }
    if paths.is_empty() {
        bail!("no input files; pass paths or --dir");
    }

    let mut contents = Vec::with_capacity(paths.len());
    for path in &paths {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        contents.push((path.to_string_lossy().into_owned(), bytes));
    }
    let inputs: Vec<FileInput<'_>> = contents
        .iter()
        .map(|(path, bytes)| FileInput {
            path,
            contents: bytes,
        })
        .collect();

    let batch = ingest_files(&inputs, &config);
    let summary = Aggregator::new(&table, &standard).aggregate(&batch.records);
    info!(
        files = inputs.len(),
        parsed = batch.records.len(),
        failed = batch.errors.len(),
        "Extraction finished"
    );

    let output = json!({
        "processed_at": batch.processed_at,
        "vehicles": batch.records,
        "files": batch.reports,
        "errors": batch.errors,
        "summary": summary,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn files_below(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("**/*");
    let pattern = pattern
        .to_str()
        .with_context(|| format!("{} is not valid UTF-8", dir.display()))?;

    let mut files = Vec::new();
    for entry in glob::glob(pattern)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "Could not read path from glob pattern"),
        }
    }
    Ok(files)
}

fn load_table(args: &TableArgs) -> Result<ParameterTable> {
    let table = ParameterTable::new();
    seed(&table);
    if let Some(path) = &args.master {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let report = import_master_csv(&bytes, &table)?;
        info!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped.len(),
            "Applied master table"
        );
    }
    Ok(table)
}

fn parameter_listing(table: &ParameterTable) -> Table {
    let mut listing = Table::new();
    listing.load_preset(UTF8_FULL).set_header(vec![
        "SPN",
        "PGN (Hex)",
        "Description",
        "Unit",
        "Resolution",
        "Offset",
    ]);
    for definition in table.definitions() {
        listing.add_row(vec![
            definition.spn_number.to_string(),
            definition.pgn_hex,
            definition.description,
            definition.unit,
            definition.resolution.to_string(),
            definition.offset.to_string(),
        ]);
    }
    listing
}

/// Hex bytes separated by whitespace, commas or colons, or one run of hex
/// digits. A `0x` prefix on any byte is ignored.
fn parse_payload(text: &str) -> Result<Vec<u8>> {
    let tokens: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .map(|token| token.trim_start_matches("0x").trim_start_matches("0X"))
        .filter(|token| !token.is_empty())
        .collect();

    let digits = match tokens.as_slice() {
        [single] if single.len() > 2 => {
            if single.len() % 2 != 0 {
                bail!("payload {single:?} has an odd number of hex digits");
            }
            single
                .as_bytes()
                .chunks(2)
                .map(|pair| String::from_utf8_lossy(pair).into_owned())
                .collect()
        }
        _ => tokens.iter().map(|token| token.to_string()).collect::<Vec<_>>(),
    };

    digits
        .iter()
        .map(|byte| {
            u8::from_str_radix(byte, 16).with_context(|| format!("{byte:?} is not a hex byte"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_forms() {
        let expected = vec![0x00, 0x00, 0x19, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(parse_payload("00 00 19 00 FF FF FF FF").unwrap(), expected);
        assert_eq!(parse_payload("00001900FFFFFFFF").unwrap(), expected);
        assert_eq!(parse_payload("0x00,0x00,0x19,0x00,ff,ff,ff,ff").unwrap(), expected);
        assert_eq!(parse_payload("7").unwrap(), vec![0x07]);
        assert!(parse_payload("GG 00").is_err());
        assert!(parse_payload("123").is_err());
    }

    #[test]
    fn listing_is_ordered_by_pgn() {
        let table = ParameterTable::new();
        seed(&table);
        let rendered = parameter_listing(&table).to_string();
        let torque = rendered.find("4191").unwrap();
        let speed = rendered.find("Wheel-Based Vehicle Speed").unwrap();
        assert!(torque < speed);
    }
}
