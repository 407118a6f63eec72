//! Grammar-checked record parsing for strict runs.

use crate::dispatch::MAX_RECORD;
use crate::error::Malformation;

const FIELDS: usize = 4;
const MAX_DIGITS: usize = 3;

/// Parses one record, rejecting anything that is not four dot-separated
/// fields of 1..=3 ASCII digits. Octet ranges are not checked.
pub fn parse_checked(line: &[u8]) -> Result<u32, Malformation> {
    if line.len() > MAX_RECORD {
        return Err(Malformation::TooLong(line.len()));
    }

    let mut value = 0u32;
    let mut octet = 0u32;
    let mut digits = 0;
    let mut fields = 1;
    for &b in line {
        match b {
            b'0'..=b'9' => {
                digits += 1;
                if digits > MAX_DIGITS {
                    return Err(Malformation::FieldTooWide);
                }
                octet = octet * 10 + (b - b'0') as u32;
            }
            b'.' => {
                if digits == 0 {
                    return Err(Malformation::EmptyField);
                }
                fields += 1;
                if fields > FIELDS {
                    return Err(Malformation::FieldCount(line.split(|&c| c == b'.').count()));
                }
                value = value << 8 | (octet & 0xFF);
                octet = 0;
                digits = 0;
            }
            other => return Err(Malformation::InvalidByte(other)),
        }
    }

    if digits == 0 {
        return Err(Malformation::EmptyField);
    }
    if fields != FIELDS {
        return Err(Malformation::FieldCount(fields));
    }
    Ok(value << 8 | (octet & 0xFF))
}
