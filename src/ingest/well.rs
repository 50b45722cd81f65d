//! Well addressing on standard microplates.
//!
//! A well is printed as a row letter followed by a 1-based column number
//! (`A1`, `H12`, `P24`). Rows run `A`..=`P` and columns `1..=24`, which covers
//! every SBS plate format up to 384 wells.

use crate::error::PlatelabError;
use std::fmt;
use std::str::FromStr;

const MAX_ROW: char = 'P';
const MAX_COLUMN: u8 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Well {
    row: char,
    column: u8,
}

impl Well {
    pub fn new(row: char, column: u8) -> Result<Self, PlatelabError> {
        let row = row.to_ascii_uppercase();
        if !('A'..=MAX_ROW).contains(&row) {
            return Err(PlatelabError::InvalidInput(format!(
                "well row {row:?} outside A..{MAX_ROW}"
            )));
        }
        if column == 0 || column > MAX_COLUMN {
            return Err(PlatelabError::InvalidInput(format!(
                "well column {column} outside 1..{MAX_COLUMN}"
            )));
        }
        Ok(Self { row, column })
    }

    pub fn row(&self) -> char {
        self.row
    }

    pub fn column(&self) -> u8 {
        self.column
    }

    /// Row letter as stored in the `row_id` columns.
    pub fn row_id(&self) -> String {
        self.row.to_string()
    }

    /// Zero-based row index (`A` = 0).
    fn row_index(&self) -> u8 {
        self.row as u8 - b'A'
    }

    /// Rebuilds a well from the `(row_id, column_id)` pair stored in the database.
    pub fn from_columns(row_id: &str, column_id: i64) -> Result<Self, PlatelabError> {
        let mut chars = row_id.chars();
        let (Some(row), None) = (chars.next(), chars.next()) else {
            return Err(PlatelabError::InvalidInput(format!(
                "invalid well row {row_id:?}"
            )));
        };
        let column = u8::try_from(column_id).map_err(|_| {
            PlatelabError::InvalidInput(format!("well column {column_id} out of range"))
        })?;
        Self::new(row, column)
    }
}

impl FromStr for Well {
    type Err = PlatelabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let row = chars
            .next()
            .filter(char::is_ascii_alphabetic)
            .ok_or_else(|| PlatelabError::InvalidInput(format!("invalid well {s:?}")))?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PlatelabError::InvalidInput(format!("invalid well {s:?}")));
        }
        let column: u8 = digits
            .parse()
            .map_err(|_| PlatelabError::InvalidInput(format!("invalid well {s:?}")))?;
        Self::new(row, column)
    }
}

impl fmt::Display for Well {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.column)
    }
}

/// Standard plate layouts, keyed by well count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateFormat {
    Wells6,
    Wells12,
    Wells24,
    Wells48,
    Wells96,
    Wells384,
}

impl PlateFormat {
    pub fn from_well_count(count: i64) -> Option<Self> {
        match count {
            6 => Some(Self::Wells6),
            12 => Some(Self::Wells12),
            24 => Some(Self::Wells24),
            48 => Some(Self::Wells48),
            96 => Some(Self::Wells96),
            384 => Some(Self::Wells384),
            _ => None,
        }
    }

    /// `(rows, columns)`
    pub fn dimensions(self) -> (u8, u8) {
        match self {
            Self::Wells6 => (2, 3),
            Self::Wells12 => (3, 4),
            Self::Wells24 => (4, 6),
            Self::Wells48 => (6, 8),
            Self::Wells96 => (8, 12),
            Self::Wells384 => (16, 24),
        }
    }

    pub fn well_count(self) -> i64 {
        let (rows, columns) = self.dimensions();
        i64::from(rows) * i64::from(columns)
    }

    pub fn contains(self, well: &Well) -> bool {
        let (rows, columns) = self.dimensions();
        well.row_index() < rows && well.column <= columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_prints_wells() {
        let w: Well = "h12".parse().unwrap();
        assert_eq!(w.row(), 'H');
        assert_eq!(w.column(), 12);
        assert_eq!(w.to_string(), "H12");
        assert_eq!(w.row_id(), "H");

        assert_eq!(" A1 ".parse::<Well>().unwrap(), Well::new('A', 1).unwrap());
    }

    #[test]
    fn rejects_malformed_wells() {
        for bad in ["", "1A", "A", "A0", "A25", "Q1", "AA1", "A1x", "A-1"] {
            assert!(bad.parse::<Well>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn round_trips_through_storage_columns() {
        let w = Well::from_columns("C", 7).unwrap();
        assert_eq!(w.to_string(), "C7");
        assert!(Well::from_columns("CD", 7).is_err());
        assert!(Well::from_columns("C", 300).is_err());
    }

    #[test]
    fn plate_format_bounds() {
        let f96 = PlateFormat::from_well_count(96).unwrap();
        assert_eq!(f96.well_count(), 96);
        assert!(f96.contains(&"H12".parse().unwrap()));
        assert!(!f96.contains(&"I1".parse().unwrap()));
        assert!(!f96.contains(&"A13".parse().unwrap()));

        let f384 = PlateFormat::from_well_count(384).unwrap();
        assert!(f384.contains(&"P24".parse().unwrap()));

        assert!(PlateFormat::from_well_count(100).is_none());
    }
}
