use std::path::Path;

use serde::Deserialize;

use crate::encoding::FallbackPolicy;
use crate::errors::ParserError;

/// Tunables for the log-extraction heuristics.
///
/// Every field has a default, so a TOML file only needs the keys it overrides:
///
/// ```toml
/// pgn_min = 256
/// known_brands = [{ key = "faw", name = "FAW" }]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub vehicle_aliases: Vec<String>,
    pub brand_aliases: Vec<String>,
    /// Matched case-insensitively against the filename, in order.
    pub known_brands: Vec<KnownBrand>,
    // Inclusive.
    pub pgn_min: u32,
    pub pgn_max: u32,
    pub metadata_scan_rows: usize,
    pub metadata_scan_cols: usize,
    pub header_search_lines: usize,
    /// Harvest cells holding a bare plausible integer as PGNs when no PGN or
    /// CAN-ID column was found.
    pub embedded_integer_pgns: bool,
    pub encoding_fallback: FallbackPolicy,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct KnownBrand {
    pub key: String,
    pub name: String,
}

impl KnownBrand {
    fn new(key: &str, name: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        let strings =
            |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            vehicle_aliases: strings(&[
                "vehicle name",
                "veh name",
                "vehicle",
                "veh",
                "unit name",
                "name",
            ]),
            brand_aliases: strings(&["brand", "make", "manufacturer", "manufacturer name"]),
            known_brands: vec![
                KnownBrand::new("daf", "DAF"),
                KnownBrand::new("hino", "HINO"),
                KnownBrand::new("volvo", "Volvo"),
                KnownBrand::new("scania", "Scania"),
                KnownBrand::new("mercedes", "Mercedes"),
                KnownBrand::new("man", "MAN"),
                KnownBrand::new("iveco", "Iveco"),
                KnownBrand::new("kenworth", "Kenworth"),
                KnownBrand::new("peterbilt", "Peterbilt"),
            ],
            pgn_min: 100,
            pgn_max: 999_999,
            metadata_scan_rows: 10,
            metadata_scan_cols: 10,
            header_search_lines: 20,
            embedded_integer_pgns: true,
            encoding_fallback: FallbackPolicy::Utf8Lossy,
        }
    }
}

impl ExtractorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ParserError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ParserError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn is_plausible_pgn(&self, value: i64) -> bool {
        value >= i64::from(self.pgn_min) && value <= i64::from(self.pgn_max)
    }

    /// Brand guessed from a filename, `None` when no known fragment matches.
    pub fn brand_from_filename(&self, file_name: &str) -> Option<&str> {
        let lower = file_name.to_lowercase();
        self.known_brands
            .iter()
            .find(|brand| lower.contains(&brand.key.to_lowercase()))
            .map(|brand| brand.name.as_str())
    }
}
