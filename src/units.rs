//! Byte-count formatting and parsing: `--human-readable` output and `-k/--size-limit` input.
#![allow(clippy::missing_errors_doc)]

use core::fmt;

pub const KIBI: u64 = 1024;
pub const MEBI: u64 = KIBI * 1024;
pub const GIBI: u64 = MEBI * 1024;
pub const TEBI: u64 = GIBI * 1024;
pub const PEBI: u64 = TEBI * 1024;
pub const EXBI: u64 = PEBI * 1024;

/// Unit suffixes in ascending order, matching the `{B,K,M,G,T,P,E,Z,Y}` table from the spec.
/// `u64` tops out before `Z`/`Y` are reachable, but the table is kept complete for readability
/// and so `human_readable` never needs a bounds check on the index.
const UNITS: [char; 9] = ['B', 'K', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseSizeError {
    Empty,
    InvalidNumber,
    InvalidUnit,
}

impl fmt::Display for ParseSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty size string"),
            Self::InvalidNumber => write!(f, "invalid number in size"),
            Self::InvalidUnit => write!(f, "invalid size unit (expected one of B,K,M,G,T,P,E)"),
        }
    }
}

impl std::error::Error for ParseSizeError {}

/// Parses a `-k/--size-limit` argument. Accepts a bare integer (bytes) or an integer followed
/// by a binary-unit suffix (`K`, `M`, `G`, `T`, `P`, `E`, case-insensitive; a trailing `i` as in
/// `Ki`/`Mi` is accepted and ignored, since this tool only ever uses binary multipliers).
pub fn parse_size_limit(input: &str) -> Result<u64, ParseSizeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseSizeError::Empty);
    }

    let split_at = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split_at);

    if digits.is_empty() {
        return Err(ParseSizeError::InvalidNumber);
    }
    let value: u64 = digits.parse().map_err(|_| ParseSizeError::InvalidNumber)?;

    let suffix = suffix.trim();
    if suffix.is_empty() {
        return Ok(value);
    }

    let unit = suffix
        .strip_suffix(['i', 'I'])
        .unwrap_or(suffix)
        .chars()
        .next()
        .ok_or(ParseSizeError::InvalidUnit)?
        .to_ascii_uppercase();

    let multiplier = match unit {
        'B' => 1,
        'K' => KIBI,
        'M' => MEBI,
        'G' => GIBI,
        'T' => TEBI,
        'P' => PEBI,
        'E' => EXBI,
        _ => return Err(ParseSizeError::InvalidUnit),
    };

    Ok(value.saturating_mul(multiplier))
}

/// Renders `bytes` as `%.1f{unit}` using the largest unit for which
/// `multiplier < value < multiplier * 1024` (falling back to the largest defined unit once the
/// value outgrows every multiplier, and to bare bytes for anything under 1024).
#[must_use]
pub fn human_readable(bytes: u64) -> String {
    if bytes < KIBI {
        return format!("{bytes:.1}{}", UNITS[0]);
    }

    let mut value = bytes as f64;
    let mut unit_index = 0usize;
    while value >= 1024.0 && unit_index + 1 < UNITS.len() {
        value /= 1024.0;
        unit_index += 1;
    }

    format!("{value:.1}{}", UNITS[unit_index])
}
