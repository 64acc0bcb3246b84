//! Common Types for 5G NR
//! 
//! Defines fundamental types used throughout the uplink processing chain

use serde::{Deserialize, Serialize};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use std::fmt;

/// Radio Network Temporary Identifier (RNTI)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rnti(pub u16);

impl Rnti {
    /// Create a new RNTI
    pub fn new(value: u16) -> Self {
        Self(value)
    }
    
    /// Get the RNTI value
    pub fn value(&self) -> u16 {
        self.0
    }

    /// RNTI zero is reserved and never identifies a UE
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Rnti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Subcarrier spacing values in kHz
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive, Serialize, Deserialize)]
pub enum SubcarrierSpacing {
    /// 15 kHz
    Scs15 = 15,
    /// 30 kHz
    Scs30 = 30,
    /// 60 kHz
    Scs60 = 60,
    /// 120 kHz
    Scs120 = 120,
    /// 240 kHz
    Scs240 = 240,
}

impl SubcarrierSpacing {
    /// Subcarrier spacing for numerology mu (15 * 2^mu kHz)
    pub fn from_numerology(numerology: u8) -> Option<Self> {
        if numerology > 4 {
            return None;
        }
        Self::from_u32(15 << numerology)
    }

    /// Numerology index mu
    pub fn numerology(&self) -> u8 {
        match self {
            SubcarrierSpacing::Scs15 => 0,
            SubcarrierSpacing::Scs30 => 1,
            SubcarrierSpacing::Scs60 => 2,
            SubcarrierSpacing::Scs120 => 3,
            SubcarrierSpacing::Scs240 => 4,
        }
    }

    /// Spacing in kHz
    pub fn to_khz(&self) -> u32 {
        *self as u32
    }

    /// Spacing in Hz
    pub fn to_hz(&self) -> f64 {
        self.to_khz() as f64 * 1000.0
    }
}

/// Cyclic prefix type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CyclicPrefix {
    #[default]
    Normal,
    Extended,
}

impl CyclicPrefix {
    /// Number of OFDM symbols in one slot
    pub fn symbols_per_slot(&self) -> u8 {
        match self {
            CyclicPrefix::Normal => 14,
            CyclicPrefix::Extended => 12,
        }
    }
}

/// Slot identifier within the system frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPoint {
    /// Numerology (0 to 4)
    pub numerology: u8,
    /// System frame number (0 to 1023)
    pub sfn: u16,
    /// Slot index within the frame
    pub slot: u16,
}

impl SlotPoint {
    /// Create a new slot point
    pub fn new(numerology: u8, sfn: u16, slot: u16) -> Self {
        Self { numerology, sfn, slot }
    }

    /// Subcarrier spacing of the slot numerology, if the numerology is valid
    pub fn scs(&self) -> Option<SubcarrierSpacing> {
        SubcarrierSpacing::from_numerology(self.numerology)
    }

    /// Number of slots in a 10 ms frame
    pub fn slots_per_frame(&self) -> u16 {
        10 << self.numerology
    }
}

impl fmt::Display for SlotPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.sfn, self.slot)
    }
}
