use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DiceboxError;

// ---------------------------------------------------------------------------
// DieId / Axis
// ---------------------------------------------------------------------------

/// Identity of one physical die. The installation runs exactly three dice;
/// each die owns one axis of the idea parameter space. Identity is assigned
/// by hardware address at configuration time, never embedded in firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DieId {
    A,
    B,
    C,
}

impl DieId {
    pub const ALL: [DieId; 3] = [DieId::A, DieId::B, DieId::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            DieId::A => "A",
            DieId::B => "B",
            DieId::C => "C",
        }
    }

    /// The parameter axis this die selects.
    pub fn axis(&self) -> Axis {
        match self {
            DieId::A => Axis::FocusGroup,
            DieId::B => Axis::Topic,
            DieId::C => Axis::Medium,
        }
    }
}

impl fmt::Display for DieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DieId {
    type Err = DiceboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" => Ok(DieId::A),
            "B" | "b" => Ok(DieId::B),
            "C" | "c" => Ok(DieId::C),
            other => Err(DiceboxError::UnknownDie(other.to_string())),
        }
    }
}

/// One axis of the parameter combination fed to the idea generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    FocusGroup,
    Topic,
    Medium,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::FocusGroup => "focus_group",
            Axis::Topic => "topic",
            Axis::Medium => "medium",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// A rolled die side, validated to 1..=6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Side(u8);

impl Side {
    pub fn new(value: u8) -> Option<Side> {
        (1..=6).contains(&value).then_some(Side(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Zero-based index into a six-entry label list.
    pub fn index(&self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl TryFrom<u8> for Side {
    type Error = DiceboxError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Side::new(value).ok_or(DiceboxError::InvalidSide(value))
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> u8 {
        side.0
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SideReading / DieConfig
// ---------------------------------------------------------------------------

/// A decoded side report: which die rolled which side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SideReading {
    pub die: DieId,
    pub side: Side,
}

impl SideReading {
    /// The short string tag stored in the side-state map, e.g. `"A3"`.
    pub fn tag(&self) -> String {
        format!("{}{}", self.die, self.side)
    }
}

/// Static configuration for one die: hardware address and the logical
/// rfcomm slot it is bound to. Immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieConfig {
    pub id: DieId,
    /// Bluetooth hardware (MAC) address of the die's radio.
    pub address: String,
    /// Logical rfcomm channel slot, yields `/dev/rfcomm<channel>`.
    pub channel: u8,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
