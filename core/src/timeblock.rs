//! Timeblocks: the story chapters the game is divided into.
//!
//! Written as day digit + two-digit 12-hour clock hour + A/P, always four
//! characters: `110A` is day 1 at 10 AM, `206P` is day 2 at 6 PM.
//! `312A` is midnight on day 3, `312P` noon.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ProgressError, ProgressResult};

/// Field order matters: derived `Ord` compares day first, then hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeblock {
    day:  u8,
    /// 0..=23
    hour: u8,
}

impl Timeblock {
    /// `hour` is on the 24-hour clock.
    pub fn new(day: u8, hour: u8) -> ProgressResult<Self> {
        if !(1..=9).contains(&day) || hour > 23 {
            return Err(ProgressError::InvalidTimeblock(format!("day {day} hour {hour}")));
        }
        Ok(Self { day, hour })
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    fn hour12(&self) -> (u8, char) {
        let meridiem = if self.hour < 12 { 'A' } else { 'P' };
        let hour = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        (hour, meridiem)
    }

    /// Human-readable name, e.g. "Day 2, 7:00 AM".
    pub fn display_name(&self) -> String {
        let (hour, meridiem) = self.hour12();
        format!("Day {}, {hour}:00 {meridiem}M", self.day)
    }
}

impl Default for Timeblock {
    /// The opening timeblock: day 1, 10 AM.
    fn default() -> Self {
        Self { day: 1, hour: 10 }
    }
}

impl fmt::Display for Timeblock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hour, meridiem) = self.hour12();
        write!(f, "{}{hour:02}{meridiem}", self.day)
    }
}

impl FromStr for Timeblock {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProgressError::InvalidTimeblock(s.to_string());
        let s_trim = s.trim();
        if !s_trim.is_ascii() || s_trim.len() != 4 {
            return Err(invalid());
        }

        let (digits, suffix) = s_trim.split_at(s_trim.len() - 1);
        let pm = match suffix {
            "A" | "a" => false,
            "P" | "p" => true,
            _ => return Err(invalid()),
        };
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let (day, hour) = digits.split_at(1);
        let day: u8 = day.parse().map_err(|_| invalid())?;
        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&hour) {
            return Err(invalid());
        }

        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        Self::new(day, hour).map_err(|_| invalid())
    }
}

impl TryFrom<String> for Timeblock {
    type Error = ProgressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeblock> for String {
    fn from(value: Timeblock) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_morning_and_evening_blocks() {
        let t: Timeblock = "207A".parse().unwrap();
        assert_eq!((t.day(), t.hour()), (2, 7));
        let t: Timeblock = "206P".parse().unwrap();
        assert_eq!((t.day(), t.hour()), (2, 18));
        let t: Timeblock = "110a".parse().unwrap();
        assert_eq!((t.day(), t.hour()), (1, 10));
    }

    #[test]
    fn noon_and_midnight() {
        let t: Timeblock = "312A".parse().unwrap();
        assert_eq!(t.hour(), 0);
        let t: Timeblock = "312P".parse().unwrap();
        assert_eq!(t.hour(), 12);
        assert_eq!(t.to_string(), "312P");
    }

    #[test]
    fn display_round_trips() {
        for code in ["110A", "102P", "207A", "206P", "312A", "305P"] {
            let t: Timeblock = code.parse().unwrap();
            assert_eq!(t.to_string(), code);
        }
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "2", "207", "207X", "013A", "0 7A", "A07A", "99999A", "é07A", "26P", "27A", "2 7A"] {
            assert!(bad.parse::<Timeblock>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn orders_chronologically() {
        let a: Timeblock = "206P".parse().unwrap();
        let b: Timeblock = "207A".parse().unwrap();
        let c: Timeblock = "110A".parse().unwrap();
        assert!(c < a);
        assert!(b > c);
        let d: Timeblock = "202P".parse().unwrap();
        assert!(b < d);
    }

    #[test]
    fn single_digit_hours_are_zero_padded() {
        let t = Timeblock::new(2, 18).unwrap();
        assert_eq!(t.to_string(), "206P");
        let t = Timeblock::new(2, 7).unwrap();
        assert_eq!(t.to_string(), "207A");
    }

    #[test]
    fn display_names() {
        let t: Timeblock = "207A".parse().unwrap();
        assert_eq!(t.display_name(), "Day 2, 7:00 AM");
        let t: Timeblock = "312P".parse().unwrap();
        assert_eq!(t.display_name(), "Day 3, 12:00 PM");
    }

    #[test]
    fn serializes_as_code_string() {
        let t: Timeblock = "206P".parse().unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"206P\"");
        let back: Timeblock = serde_json::from_str("\"206P\"").unwrap();
        assert_eq!(back, t);
    }
}
