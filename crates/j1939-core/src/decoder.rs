//! Bit-level SPN extraction and scaling.
//!
//! A decode never fails outright. Every problem, from a short payload to a
//! field that falls outside it, is reported through [`DecodeStatus`].

use serde::Serialize;

use crate::parameters::ParameterDefinition;

pub const PAYLOAD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStatus {
    Valid,
    BelowRange,
    AboveRange,
    NotAvailable,
    ErrorIndicator,
    /// The payload was not exactly eight bytes.
    Error,
    DecodeError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeResult {
    pub raw_value: Option<u64>,
    pub physical_value: Option<f64>,
    pub unit: String,
    pub status: DecodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spn: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DecodeResult {
    fn failed(definition: &ParameterDefinition, status: DecodeStatus, message: String) -> Self {
        Self {
            raw_value: None,
            physical_value: None,
            unit: definition.unit.clone(),
            status,
            message: Some(message),
            spn: None,
            description: None,
        }
    }

    fn with_raw(definition: &ParameterDefinition, raw: u64, status: DecodeStatus) -> Self {
        Self {
            raw_value: Some(raw),
            physical_value: None,
            unit: definition.unit.clone(),
            status,
            message: None,
            spn: Some(definition.spn_number),
            description: Some(definition.description.clone()),
        }
    }
}

pub fn decode(definition: &ParameterDefinition, payload: &[u8]) -> DecodeResult {
    if payload.len() != PAYLOAD_LEN {
        return DecodeResult::failed(
            definition,
            DecodeStatus::Error,
            "Invalid data length".to_string(),
        );
    }

    let raw = match extract_raw(definition, payload) {
        Ok(raw) => raw,
        Err(message) => {
            return DecodeResult::failed(definition, DecodeStatus::DecodeError, message);
        }
    };

    if let Some(status) = special_value(definition.bit_length, raw) {
        return DecodeResult::with_raw(definition, raw, status);
    }

    let physical = round4(raw as f64 * definition.resolution + definition.offset);
    if !physical.is_finite() {
        let mut result = DecodeResult::with_raw(definition, raw, DecodeStatus::DecodeError);
        result.message = Some(format!("physical value for raw {raw} is not finite"));
        return result;
    }

    let status = match (definition.min_value, definition.max_value) {
        (Some(min), _) if physical < min => DecodeStatus::BelowRange,
        (_, Some(max)) if physical > max => DecodeStatus::AboveRange,
        _ => DecodeStatus::Valid,
    };

    let mut result = DecodeResult::with_raw(definition, raw, status);
    result.physical_value = Some(physical);
    result
}

fn extract_raw(definition: &ParameterDefinition, payload: &[u8]) -> Result<u64, String> {
    let start = usize::from(definition.start_byte)
        .checked_sub(1)
        .ok_or_else(|| "start byte is 1-indexed, got 0".to_string())?;

    match (definition.bit_length, definition.data_length_bytes) {
        (bits, 1) if bits <= 8 => {
            if definition.start_bit > 7 {
                return Err(format!("start bit {} exceeds 7", definition.start_bit));
            }
            let byte = payload
                .get(start)
                .ok_or_else(|| out_of_payload(definition.start_byte))?;
            let mask = (1u64 << bits) - 1;
            Ok(u64::from(*byte >> definition.start_bit) & mask)
        }
        (bits, 2) if bits <= 16 => little_endian(payload, start, 2),
        (bits, 4) if bits <= 32 => little_endian(payload, start, 4),
        (_, len) => Ok(payload
            .iter()
            .skip(start)
            .take(usize::from(len))
            .enumerate()
            .fold(0u64, |acc, (index, byte)| {
                acc | (u64::from(*byte) << (8 * index))
            })),
    }
}

/// Strict little-endian read: every byte of the field must be in the payload.
fn little_endian(payload: &[u8], start: usize, len: usize) -> Result<u64, String> {
    let bytes = payload
        .get(start..start + len)
        .ok_or_else(|| format!("{len}-byte field at byte {} exceeds the payload", start + 1))?;
    Ok(bytes
        .iter()
        .enumerate()
        .fold(0u64, |acc, (index, byte)| acc | (u64::from(*byte) << (8 * index))))
}

fn out_of_payload(start_byte: u8) -> String {
    format!("start byte {start_byte} is outside the payload")
}

fn special_value(bit_length: u8, raw: u64) -> Option<DecodeStatus> {
    match (bit_length, raw) {
        (8, 0xFF) | (16, 0xFFFF) => Some(DecodeStatus::NotAvailable),
        (8, 0xFE) | (16, 0xFFFE) => Some(DecodeStatus::ErrorIndicator),
        _ => None,
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
