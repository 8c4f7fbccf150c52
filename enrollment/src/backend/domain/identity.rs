//! Derivation of human-readable student identifiers.
//!
//! An identifier has the shape `{year}-{suffix}-{sequence}` where `suffix` is
//! the last four digits of the 12 digit identity document number and
//! `sequence` is a zero padded counter unique within `(year, suffix)`, e.g.
//! `2026-4821-0001`.
//!
//! The derivation is advisory on the client: the existing identifier list is
//! a snapshot that may already be stale, so the records API re-checks
//! uniqueness when the record is created.

use chrono::{Datelike, Local};

/// Shown in place of an identifier while the document number is incomplete
pub const PENDING_IDENTIFIER: &str = "AUTO-GENERATE";

const DOCUMENT_DIGITS: usize = 12;
const SUFFIX_DIGITS: usize = 4;
const SEQUENCE_DIGITS: usize = 4;

/// Largest sequence that fits the four digit counter
pub const MAX_SEQUENCE: u32 = 9999;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("Identity document number must be 12 digits")]
    IncompleteDocument,
    #[error("All identifiers for {year}-{suffix} are assigned")]
    SequenceExhausted { year: i32, suffix: String },
}

/// Parts of a well-formed identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierParts {
    pub year: i32,
    pub suffix: String,
    pub sequence: u32,
}

/// Remove the separators people type into document numbers (hyphens, spaces)
pub fn normalize_document_number(document_number: &str) -> String {
    document_number
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

/// True when the normalized document number is exactly 12 ASCII digits
pub fn is_complete_document_number(normalized: &str) -> bool {
    normalized.len() == DOCUMENT_DIGITS && normalized.chars().all(|c| c.is_ascii_digit())
}

/// Derive the next identifier for `document_number` using the current year.
///
/// Returns [`PENDING_IDENTIFIER`] when the document number is not yet 12 digits.
pub fn generate_identifier(document_number: &str, existing_identifiers: &[String]) -> String {
    generate_identifier_for_year(Local::now().year(), document_number, existing_identifiers)
}

/// Same as [`generate_identifier`] with an explicit year partition.
///
/// Also returns [`PENDING_IDENTIFIER`] once the partition's sequence is used up.
pub fn generate_identifier_for_year(
    year: i32,
    document_number: &str,
    existing_identifiers: &[String],
) -> String {
    next_identifier(year, document_number, existing_identifiers)
        .unwrap_or_else(|_| PENDING_IDENTIFIER.to_string())
}

/// The next free identifier in the `(year, suffix)` partition
pub fn next_identifier(
    year: i32,
    document_number: &str,
    existing_identifiers: &[String],
) -> Result<String, IdentifierError> {
    let normalized = normalize_document_number(document_number);
    if !is_complete_document_number(&normalized) {
        return Err(IdentifierError::IncompleteDocument);
    }

    let suffix = &normalized[DOCUMENT_DIGITS - SUFFIX_DIGITS..];

    // max + 1, not count + 1: gaps left by deleted records are never reused
    let next_sequence = existing_identifiers
        .iter()
        .filter_map(|existing| parse_identifier(existing))
        .filter(|parts| parts.year == year && parts.suffix == suffix)
        .map(|parts| parts.sequence)
        .max()
        .map_or(1, |max| max + 1);

    if next_sequence > MAX_SEQUENCE {
        return Err(IdentifierError::SequenceExhausted {
            year,
            suffix: suffix.to_string(),
        });
    }
    Ok(format_identifier(year, suffix, next_sequence))
}

pub fn format_identifier(year: i32, suffix: &str, sequence: u32) -> String {
    format!("{}-{}-{:0width$}", year, suffix, sequence, width = SEQUENCE_DIGITS)
}

/// Split an identifier into its parts, or `None` if it is not structurally valid
pub fn parse_identifier(identifier: &str) -> Option<IdentifierParts> {
    let mut parts = identifier.split('-');
    let year = parts.next()?;
    let suffix = parts.next()?;
    let sequence = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let all_digits = |s: &str, len: usize| s.len() == len && s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(year, 4) || !all_digits(suffix, SUFFIX_DIGITS) || !all_digits(sequence, SEQUENCE_DIGITS) {
        return None;
    }

    Some(IdentifierParts {
        year: year.parse().ok()?,
        suffix: suffix.to_string(),
        sequence: sequence.parse().ok()?,
    })
}
