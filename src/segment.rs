//! 7-segment glyph table of the BM869S LCD.
//!
//! Each digit cell of the display is mirrored as one byte, MSB first
//! in the segment order `b g c d a f e x`:
//!
//! ```text
//!     aaaaa
//!    f     b
//!    f     b
//!     ggggg
//!    e     c
//!    e     c
//!  xx ddddd
//! ```
//!
//! `x` is the decimal point left of the digit.

use std::fmt::{self, Display};
use thiserror::Error;

pub const SEG_B: u8 = 0b1000_0000;
pub const SEG_G: u8 = 0b0100_0000;
pub const SEG_C: u8 = 0b0010_0000;
pub const SEG_D: u8 = 0b0001_0000;
pub const SEG_A: u8 = 0b0000_1000;
pub const SEG_F: u8 = 0b0000_0100;
pub const SEG_E: u8 = 0b0000_0010;
pub const SEG_POINT: u8 = 0b0000_0001;

/// Segment pattern without a glyph table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unknown segment pattern: {0:08b}")]
pub struct UnknownSegmentPattern(pub u8);

/// Decoded content of one digit cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    /// Decimal point left of the digit is lit
    pub point: bool,
    /// Rendered character, a space for a dark cell
    pub symbol: char,
}

impl Glyph {
    /// Placeholder for cells which could not be decoded.
    pub const UNKNOWN: Glyph = Glyph {
        point: false,
        symbol: '?',
    };

    /// Look up a raw cell pattern in the glyph table.
    #[rustfmt::skip]
    pub fn lookup(pattern: u8) -> Result<Self, UnknownSegmentPattern> {
        let symbol = match pattern & !SEG_POINT {
            //bgcdafe_
            0b0000_0000 => ' ',
            0b1011_1110 => '0',
            0b1010_0000 => '1',
            0b1101_1010 => '2',
            0b1111_1000 => '3',
            0b1110_0100 => '4',
            0b0111_1100 => '5',
            0b0111_1110 => '6',
            0b1010_1000 => '7',
            0b1111_1110 => '8',
            0b1111_1100 => '9',
            0b0001_0110 => 'L',
            0b1111_0010 => 'd',
            0b0010_0000 => 'i',
            0b0111_0010 => 'o',
            0b0110_0010 => 'n',
            0b0101_1110 => 'E',
            0b0100_0010 => 'r',
            0b0001_1110 => 'C',
            0b0100_1110 => 'F',
            _ => return Err(UnknownSegmentPattern(pattern)),
        };
        Ok(Self {
            point: pattern & SEG_POINT != 0,
            symbol,
        })
    }

    /// Like [`Glyph::lookup`], but degrades to [`Glyph::UNKNOWN`].
    pub fn decode(pattern: u8) -> Self {
        Self::lookup(pattern).unwrap_or_else(|err| {
            log::debug!("{}", err);
            Self::UNKNOWN
        })
    }
}

impl Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let point = if self.point { '.' } else { ' ' };
        f.write_fmt(format_args!("{}{}", point, self.symbol))
    }
}
