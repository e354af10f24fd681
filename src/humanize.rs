//! Human-readable byte sizes for configuration values ("50MB", "1GiB", 1024)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid size format: {0}")]
    InvalidFormat(String),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    #[error("Size overflows 64 bits: {0}")]
    Overflow(String),
}

const KIB: u64 = 1024;

/// Binary multiples, largest first
const UNITS: [(&str, u64); 5] = [
    ("TB", KIB * KIB * KIB * KIB),
    ("GB", KIB * KIB * KIB),
    ("MB", KIB * KIB),
    ("KB", KIB),
    ("B", 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawSize")]
pub struct ByteSize(pub u64);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Number(u64),
    Text(String),
}

impl TryFrom<RawSize> for ByteSize {
    type Error = ParseError;

    fn try_from(raw: RawSize) -> Result<Self, Self::Error> {
        match raw {
            RawSize::Number(n) => Ok(ByteSize(n)),
            RawSize::Text(s) => s.parse(),
        }
    }
}

impl ByteSize {
    pub const fn mib(n: u64) -> Self {
        ByteSize(n * KIB * KIB)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

fn multiplier(unit: &str) -> Option<u64> {
    let unit = unit.to_ascii_uppercase();
    let unit = unit.strip_suffix("IB").map(|u| format!("{}B", u)).unwrap_or(unit);
    let unit = if unit.len() == 1 && unit != "B" {
        format!("{}B", unit)
    } else {
        unit
    };
    UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, factor)| *factor)
}

impl FromStr for ByteSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);

        if digits.is_empty() {
            return Err(ParseError::InvalidFormat(s.to_string()));
        }
        let value: u64 = digits
            .parse()
            .map_err(|_| ParseError::Overflow(s.to_string()))?;

        let unit = unit.trim();
        if unit.is_empty() {
            return Ok(ByteSize(value));
        }

        let factor = multiplier(unit).ok_or_else(|| ParseError::InvalidUnit(unit.to_string()))?;
        value
            .checked_mul(factor)
            .map(ByteSize)
            .ok_or_else(|| ParseError::Overflow(s.to_string()))
    }
}

impl fmt::Display for ByteSize {
    /// Largest unit that divides the size exactly
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, factor) = UNITS
            .iter()
            .find(|(_, factor)| self.0 != 0 && self.0 % factor == 0)
            .copied()
            .unwrap_or(("B", 1));
        write!(f, "{}{}", self.0 / factor, name)
    }
}
