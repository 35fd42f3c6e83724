//! A1-style reference parsing: `A1`, `$B$12`, `A1:C3`, `Sheet2!A1:B2`, `'My Sheet'!A1`

use gridcalc_core::CellRange;
use thiserror::Error;

const MAX_COLUMNS: usize = 16_384;
const MAX_ROWS: usize = 1_048_576;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid A1 address: {0}")]
    InvalidA1(String),
    #[error("column out of range")]
    ColumnOutOfRange,
    #[error("row out of range")]
    RowOutOfRange,
    #[error("unknown sheet: {0}")]
    UnknownSheet(String),
}

/// Zero-based cell position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub row: usize,
    pub column: usize,
}

/// A parsed range with its optional sheet qualifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeAddress {
    pub sheet: Option<String>,
    pub range: CellRange,
}

/// Split the optional `Sheet!` qualifier. Quoted names may contain spaces
/// and `''` for an apostrophe.
fn split_sheet(input: &str) -> (Option<String>, &str) {
    match input.rsplit_once('!') {
        Some((sheet, cells)) => {
            let sheet = sheet
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .map(|s| s.replace("''", "'"))
                .unwrap_or_else(|| sheet.to_string());
            (Some(sheet), cells)
        }
        None => (None, input),
    }
}

/// Shape check only: letters then digits, each optionally `$`-anchored.
/// Out-of-range positions still look like references so they can become `#REF!`.
pub fn looks_like_reference(token: &str) -> bool {
    let (sheet, cells) = split_sheet(token.trim());
    if sheet.as_deref() == Some("") {
        return false;
    }
    let mut parts = cells.split(':');
    let first = parts.next().is_some_and(is_a1_shape);
    let rest_ok = match (parts.next(), parts.next()) {
        (None, _) => true,
        (Some(second), None) => is_a1_shape(second),
        (Some(_), Some(_)) => false,
    };
    first && rest_ok
}

fn is_a1_shape(part: &str) -> bool {
    let part = part.strip_prefix('$').unwrap_or(part);
    let letters = part.chars().take_while(char::is_ascii_alphabetic).count();
    if letters == 0 {
        return false;
    }
    let rest = &part[letters..];
    let rest = rest.strip_prefix('$').unwrap_or(rest);
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

/// Parse an A1-style address like `A1` or `$B$12` into a 0-indexed [`CellAddress`].
pub fn parse_a1(input: &str) -> Result<CellAddress, AddressError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AddressError::InvalidA1(input.to_string()));
    }

    let mut chars = input.chars().peekable();
    // Optional absolute marker.
    if matches!(chars.peek(), Some('$')) {
        chars.next();
    }

    let mut column: usize = 0;
    let mut column_len = 0;
    while let Some(ch) = chars.peek().copied() {
        if !ch.is_ascii_alphabetic() {
            break;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
        column = column
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or(AddressError::ColumnOutOfRange)?;
        column_len += 1;
        chars.next();
    }

    if column_len == 0 {
        return Err(AddressError::InvalidA1(input.to_string()));
    }

    if matches!(chars.peek(), Some('$')) {
        chars.next();
    }

    let mut row: usize = 0;
    let mut row_len = 0;
    while let Some(ch) = chars.peek().copied() {
        if !ch.is_ascii_digit() {
            break;
        }
        row = row
            .checked_mul(10)
            .and_then(|v| v.checked_add((ch as u8 - b'0') as usize))
            .ok_or(AddressError::RowOutOfRange)?;
        row_len += 1;
        chars.next();
    }

    if row_len == 0 || chars.next().is_some() {
        return Err(AddressError::InvalidA1(input.to_string()));
    }
    if column == 0 || column > MAX_COLUMNS {
        return Err(AddressError::ColumnOutOfRange);
    }
    if row == 0 || row > MAX_ROWS {
        return Err(AddressError::RowOutOfRange);
    }

    Ok(CellAddress { row: row - 1, column: column - 1 })
}

/// Parse a single cell or `start:end` range, optionally sheet-qualified.
pub fn parse_range(input: &str) -> Result<RangeAddress, AddressError> {
    let (sheet, cells) = split_sheet(input.trim());
    if sheet.as_deref() == Some("") {
        return Err(AddressError::InvalidA1(input.to_string()));
    }

    let (start, end) = match cells.split_once(':') {
        Some((a, b)) => (parse_a1(a)?, parse_a1(b)?),
        None => {
            let cell = parse_a1(cells)?;
            (cell, cell)
        }
    };

    Ok(RangeAddress {
        sheet,
        range: CellRange::new(start.row, start.column, end.row, end.column),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_a1() {
        assert_eq!(parse_a1("A1"), Ok(CellAddress { row: 0, column: 0 }));
        assert_eq!(parse_a1("$B$12"), Ok(CellAddress { row: 11, column: 1 }));
        assert_eq!(parse_a1("aa3"), Ok(CellAddress { row: 2, column: 26 }));
        assert_eq!(parse_a1("A0"), Err(AddressError::RowOutOfRange));
        assert_eq!(parse_a1("XFE1"), Err(AddressError::ColumnOutOfRange));
        assert!(matches!(parse_a1("1A"), Err(AddressError::InvalidA1(_))));
    }

    #[test]
    fn test_parse_range() {
        let r = parse_range("Sheet2!$C$3:A1").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("Sheet2"));
        assert_eq!(r.range, CellRange::new(0, 0, 2, 2));

        let r = parse_range("'It''s here'!B2").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("It's here"));
        assert_eq!(r.range, CellRange::cell(1, 1));

        assert!(parse_range("!A1").is_err());
    }

    #[test]
    fn test_looks_like_reference() {
        assert!(looks_like_reference("A1"));
        assert!(looks_like_reference("$A$1:B2"));
        assert!(looks_like_reference("Data!A0"));
        assert!(!looks_like_reference("SUM"));
        assert!(!looks_like_reference("A1:B2:C3"));
        assert!(!looks_like_reference("12"));
        assert!(!looks_like_reference("x_1"));
    }
}
