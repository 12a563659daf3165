//! Reconstruct the displayed values from the LCD segment state.
//!
//! Flags are named by the LCD annunciator they drive. Positions are
//! `Flag::new(byte, bit)` with bits counted MSB first.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::frame::{Flag, Frame};
use crate::segment::Glyph;

const MAIN_DC: Flag = Flag::new(1, 3);
const MAIN_AC: Flag = Flag::new(2, 7);
const MAIN_MINUS: Flag = Flag::new(2, 0);
const MAIN_T1_T2: Flag = Flag::new(2, 5);
const MAIN_T2: Flag = Flag::new(2, 4);
const MAIN_T1: Flag = Flag::new(2, 6);
const MAIN_VOLT: Flag = Flag::new(8, 7);
const MAIN_AMPERE: Flag = Flag::new(14, 0);
const MAIN_NANO: Flag = Flag::new(14, 1);
const MAIN_FARAD: Flag = Flag::new(14, 2);
const MAIN_SIEMENS: Flag = Flag::new(14, 3);
const MAIN_DUTY: Flag = Flag::new(15, 0);
const MAIN_KILO: Flag = Flag::new(15, 1);
const MAIN_MEGA: Flag = Flag::new(15, 2);
const MAIN_OHM: Flag = Flag::new(15, 3);
const MAIN_MICRO: Flag = Flag::new(15, 4);
const MAIN_MILLI: Flag = Flag::new(15, 5);
const MAIN_DB: Flag = Flag::new(15, 6);
const MAIN_HZ: Flag = Flag::new(15, 7);

const SEC_T2: Flag = Flag::new(9, 1);
const SEC_AC: Flag = Flag::new(9, 2);
const SEC_MINUS: Flag = Flag::new(9, 3);
const SEC_LOOP: Flag = Flag::new(9, 4);
const SEC_AMPERE: Flag = Flag::new(9, 5);
const SEC_MILLI: Flag = Flag::new(9, 6);
const SEC_MICRO: Flag = Flag::new(9, 7);
const SEC_VOLT: Flag = Flag::new(14, 4);
const SEC_HZ: Flag = Flag::new(14, 5);
const SEC_KILO: Flag = Flag::new(14, 6);
const SEC_MEGA: Flag = Flag::new(14, 7);

const MAIN_DIGITS: std::ops::RangeInclusive<usize> = 3..=8;
const SEC_DIGITS: std::ops::RangeInclusive<usize> = 10..=13;

/// Condition over frame flags
#[derive(Debug, Clone, Copy)]
enum Predicate {
    All(&'static [Flag]),
    Any(&'static [Flag]),
}

impl Predicate {
    fn matches(self, frame: &Frame) -> bool {
        match self {
            Predicate::All(flags) => flags.iter().all(|f| frame.is_set(*f)),
            Predicate::Any(flags) => flags.iter().any(|f| frame.is_set(*f)),
        }
    }
}

/// Measurement kind, selected by the first rule whose predicate matches.
///
/// Prefixes are prepended one after another, suffixes appended.
#[derive(Debug, Clone, Copy)]
struct ModeRule {
    when: Predicate,
    mode: &'static str,
    prefixes: &'static [(Flag, &'static str)],
}

impl ModeRule {
    const fn plain(flag: &'static [Flag], mode: &'static str) -> Self {
        Self {
            when: Predicate::All(flag),
            mode,
            prefixes: &[],
        }
    }
}

#[rustfmt::skip]
const MAIN_ELECTRICAL: &[ModeRule] = &[
    ModeRule::plain(&[MAIN_DC, MAIN_AC], "AC+DC"),
    ModeRule::plain(&[MAIN_DC],          "DC"),
    ModeRule::plain(&[MAIN_AC],          "AC"),
];

#[rustfmt::skip]
const MAIN_ELECTRICAL_UNITS: &[(Flag, &str)] = &[
    (MAIN_MICRO,  "u"),
    (MAIN_MILLI,  "m"),
    (MAIN_AMPERE, "A"),
    (MAIN_VOLT,   "V"),
];

#[rustfmt::skip]
const MAIN_OTHER: &[ModeRule] = &[
    ModeRule { when: Predicate::All(&[MAIN_HZ]), mode: "HZ", prefixes: &[(MAIN_KILO, "k"), (MAIN_MEGA, "M")] },
    ModeRule::plain(&[MAIN_DB],    "dB"),
    ModeRule::plain(&[MAIN_DUTY],  "D%"),
    ModeRule::plain(&[MAIN_T1_T2], "T1-T2"),
    ModeRule::plain(&[MAIN_T2],    "T2"),
    ModeRule::plain(&[MAIN_T1],    "T1"),
    ModeRule { when: Predicate::All(&[MAIN_OHM]), mode: "OHM", prefixes: &[(MAIN_KILO, "k"), (MAIN_MEGA, "M")] },
    ModeRule { when: Predicate::All(&[MAIN_FARAD]), mode: "F", prefixes: &[(MAIN_NANO, "n"), (MAIN_MICRO, "u"), (MAIN_MILLI, "m")] },
    ModeRule { when: Predicate::All(&[MAIN_SIEMENS]), mode: "S", prefixes: &[(MAIN_NANO, "n")] },
];

#[rustfmt::skip]
const SEC_ELECTRICAL: &[ModeRule] = &[
    ModeRule::plain(&[SEC_AC], "AC"),
    ModeRule { when: Predicate::Any(&[SEC_VOLT, SEC_AMPERE, SEC_LOOP]), mode: "DC", prefixes: &[] },
];

#[rustfmt::skip]
const SEC_ELECTRICAL_UNITS: &[(Flag, &str)] = &[
    (SEC_MICRO,  "u"),
    (SEC_MILLI,  "m"),
    (SEC_AMPERE, "A"),
    (SEC_LOOP,   "%4-20mA"),
    (SEC_VOLT,   "V"),
];

#[rustfmt::skip]
const SEC_OTHER: &[ModeRule] = &[
    ModeRule { when: Predicate::All(&[SEC_HZ]), mode: "HZ", prefixes: &[(SEC_KILO, "k"), (SEC_MEGA, "M")] },
    ModeRule::plain(&[SEC_T2], "T2"),
];

fn first_match<'a>(rules: &'a [ModeRule], frame: &Frame) -> Option<&'a ModeRule> {
    rules.iter().find(|rule| rule.when.matches(frame))
}

/// Electrical modes take unit suffixes, all others take SI prefixes.
fn infer_mode(
    frame: &Frame,
    electrical: &[ModeRule],
    units: &[(Flag, &str)],
    other: &[ModeRule],
) -> String {
    if let Some(rule) = first_match(electrical, frame) {
        let suffix: String = units
            .iter()
            .filter(|(flag, _)| frame.is_set(*flag))
            .map(|(_, unit)| *unit)
            .collect();
        if suffix.is_empty() {
            rule.mode.to_string()
        } else {
            format!("{} {}", rule.mode, suffix)
        }
    } else if let Some(rule) = first_match(other, frame) {
        rule.prefixes
            .iter()
            .filter(|(flag, _)| frame.is_set(*flag))
            .fold(rule.mode.to_string(), |mode, (_, prefix)| {
                format!("{}{}", prefix, mode)
            })
    } else {
        String::new()
    }
}

/// Render the digit cells of one display.
///
/// The decimal point of a cell listed in `no_point` is ignored,
/// that bit drives another annunciator.
fn assemble_digits(
    frame: &Frame,
    cells: std::ops::RangeInclusive<usize>,
    no_point: &[usize],
    sign: Flag,
) -> String {
    let mut display = String::new();
    if frame.is_set(sign) {
        display.push('-');
    }
    for n in cells {
        let glyph = Glyph::decode(frame.pattern(n));
        if glyph.point && !no_point.contains(&n) {
            display.push('.');
        }
        display.push(glyph.symbol);
    }
    display
}

/// Both displays of the meter as shown on the LCD
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reading {
    pub main_value: String,
    pub main_unit: String,
    pub secondary_value: String,
    pub secondary_unit: String,
}

impl Reading {
    pub fn decode(frame: &Frame) -> Self {
        log::debug!("Decoding {:?}", frame);

        let mut main_unit = infer_mode(frame, MAIN_ELECTRICAL, MAIN_ELECTRICAL_UNITS, MAIN_OTHER);
        let secondary_unit = infer_mode(frame, SEC_ELECTRICAL, SEC_ELECTRICAL_UNITS, SEC_OTHER);

        let mut main_value = assemble_digits(
            frame,
            MAIN_DIGITS,
            &[*MAIN_DIGITS.start(), *MAIN_DIGITS.end()],
            MAIN_MINUS,
        );
        let secondary_value =
            assemble_digits(frame, SEC_DIGITS, &[*SEC_DIGITS.start()], SEC_MINUS);

        // Temperature modes show the sensor number in the last digit cell
        if main_unit.starts_with('T') {
            if let Some(sensor) = main_value.pop() {
                main_unit.push(' ');
                main_unit.push(sensor);
            }
        }

        Self {
            main_value,
            main_unit,
            secondary_value,
            secondary_unit,
        }
    }

    /// Main display as number, `None` for texts like `OL`
    pub fn main_number(&self) -> Option<f64> {
        parse_display(&self.main_value)
    }

    /// Secondary display as number, `None` if blank or text
    pub fn secondary_number(&self) -> Option<f64> {
        parse_display(&self.secondary_value)
    }
}

fn parse_display(value: &str) -> Option<f64> {
    let compact: String = value.chars().filter(|c| *c != ' ').collect();
    compact.parse::<f64>().ok()
}

impl From<&Frame> for Reading {
    fn from(frame: &Frame) -> Self {
        Self::decode(frame)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:>8} {:<10}", self.main_value, self.main_unit))?;
        if !self.secondary_value.trim().is_empty() || !self.secondary_unit.is_empty() {
            f.write_fmt(format_args!(
                "  {:>6} {}",
                self.secondary_value, self.secondary_unit
            ))?;
        }
        Ok(())
    }
}
