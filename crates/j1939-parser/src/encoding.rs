//! Text encoding detection for uploaded log files.
//!
//! Vendor tools export logs in whatever code page the workstation happened to
//! use, so raw bytes are tried against a fixed, priority-ordered candidate list.
//! A candidate wins when it decodes without error *and* the first characters of
//! the result look like text.

use std::borrow::Cow;

use encoding_rs::{Encoding, BIG5, GB18030, GBK, UTF_16BE, UTF_16LE, WINDOWS_1252};
use serde::Deserialize;

/// Share of sampled characters that must be printable (or newline/tab).
pub const PRINTABLE_THRESHOLD: f64 = 0.70;
/// Number of decoded characters inspected by the quality check.
pub const QUALITY_SAMPLE_CHARS: usize = 1000;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// What to do when no candidate passes both checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// UTF-8 with U+FFFD substituted for invalid sequences.
    #[default]
    Utf8Lossy,
    /// Byte-for-byte Latin-1; never substitutes.
    Latin1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
}

#[derive(Debug, Clone, Copy)]
enum Candidate {
    Utf8,
    Utf8Bom,
    Utf16Bom,
    Utf16Le,
    Utf16Be,
    Gb2312,
    Gbk,
    Gb18030,
    Big5,
    Cp1252,
    Latin1(&'static str),
    Ascii,
}

// The BOM form goes first; a BOM is itself valid UTF-8.
const CANDIDATES: &[Candidate] = &[
    Candidate::Utf8Bom,
    Candidate::Utf8,
    Candidate::Utf16Bom,
    Candidate::Utf16Le,
    Candidate::Utf16Be,
    Candidate::Gb2312,
    Candidate::Gbk,
    Candidate::Gb18030,
    Candidate::Big5,
    Candidate::Latin1("latin-1"),
    Candidate::Cp1252,
    Candidate::Latin1("iso-8859-1"),
    Candidate::Ascii,
];

impl Candidate {
    fn name(&self) -> &'static str {
        match self {
            Candidate::Utf8 => "utf-8",
            Candidate::Utf8Bom => "utf-8-sig",
            Candidate::Utf16Bom => "utf-16",
            Candidate::Utf16Le => "utf-16-le",
            Candidate::Utf16Be => "utf-16-be",
            Candidate::Gb2312 => "gb2312",
            Candidate::Gbk => "gbk",
            Candidate::Gb18030 => "gb18030",
            Candidate::Big5 => "big5",
            Candidate::Cp1252 => "cp1252",
            Candidate::Latin1(name) => *name,
            Candidate::Ascii => "ascii",
        }
    }

    fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            Candidate::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            Candidate::Utf8Bom => {
                let rest = bytes.strip_prefix(UTF8_BOM)?;
                std::str::from_utf8(rest).ok().map(Cow::Borrowed)
            }
            Candidate::Utf16Bom => {
                if let Some(rest) = bytes.strip_prefix(UTF16LE_BOM) {
                    decode_strict(UTF_16LE, rest)
                } else if let Some(rest) = bytes.strip_prefix(UTF16BE_BOM) {
                    decode_strict(UTF_16BE, rest)
                } else {
                    None
                }
            }
            Candidate::Utf16Le => {
                if nul_lane_share(bytes, 1) >= 0.3 {
                    decode_strict(UTF_16LE, bytes)
                } else {
                    None
                }
            }
            Candidate::Utf16Be => {
                if nul_lane_share(bytes, 0) >= 0.3 {
                    decode_strict(UTF_16BE, bytes)
                } else {
                    None
                }
            }
            // encoding_rs decodes GB2312 with its GBK superset.
            Candidate::Gb2312 | Candidate::Gbk => decode_strict(GBK, bytes),
            Candidate::Gb18030 => decode_strict(GB18030, bytes),
            Candidate::Big5 => decode_strict(BIG5, bytes),
            Candidate::Cp1252 => decode_strict(WINDOWS_1252, bytes),
            Candidate::Latin1(_) => Some(Cow::Owned(bytes.iter().map(|&b| b as char).collect())),
            Candidate::Ascii => {
                if bytes.is_ascii() {
                    std::str::from_utf8(bytes).ok().map(Cow::Borrowed)
                } else {
                    None
                }
            }
        }
    }
}

fn decode_strict<'a>(encoding: &'static Encoding, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
    if encoding == UTF_16LE || encoding == UTF_16BE {
        if bytes.len() % 2 != 0 {
            return None;
        }
    }
    encoding.decode_without_bom_handling_and_without_replacement(bytes)
}

// ASCII-heavy UTF-16 has one all-NUL lane (0 = first byte, 1 = second).
fn nul_lane_share(bytes: &[u8], lane: usize) -> f64 {
    let units = bytes.len() / 2;
    if units == 0 {
        return 0.0;
    }
    let zeros = bytes
        .chunks_exact(2)
        .filter(|unit| unit[lane] == 0)
        .count();
    zeros as f64 / units as f64
}

/// Returns true when enough of the leading characters look like text.
pub fn looks_printable(text: &str) -> bool {
    let mut total = 0usize;
    let mut printable = 0usize;
    for ch in text.chars().take(QUALITY_SAMPLE_CHARS) {
        total += 1;
        if matches!(ch, '\n' | '\r' | '\t') || (!ch.is_control() && ch != '\u{FFFD}') {
            printable += 1;
        }
    }
    if total == 0 {
        return true;
    }
    printable as f64 / total as f64 >= PRINTABLE_THRESHOLD
}

/// Decodes `bytes` with the first candidate encoding that yields printable text.
///
/// Never fails: when nothing qualifies the configured fallback is applied.
pub fn detect_and_decode(bytes: &[u8]) -> DecodedText {
    detect_and_decode_with(bytes, FallbackPolicy::default())
}

pub fn detect_and_decode_with(bytes: &[u8], fallback: FallbackPolicy) -> DecodedText {
    for candidate in CANDIDATES {
        let Some(text) = candidate.decode(bytes) else {
            continue;
        };
        if looks_printable(&text) {
            return DecodedText {
                text: text.into_owned(),
                encoding: candidate.name(),
            };
        }
    }

    match fallback {
        FallbackPolicy::Utf8Lossy => DecodedText {
            text: String::from_utf8_lossy(bytes).into_owned(),
            encoding: "utf-8-fallback",
        },
        FallbackPolicy::Latin1 => DecodedText {
            text: bytes.iter().map(|&b| b as char).collect(),
            encoding: "latin1-fallback",
        },
    }
}
