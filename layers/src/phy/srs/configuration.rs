//! SRS resource and estimator configuration
//! 
//! Resource parameters follow the SRS-Resource information element of
//! 3GPP TS 38.331; the estimator configuration adds the slot, the receive
//! ports and the optional UE context.

use common::types::{Rnti, SlotPoint};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of SRS antenna ports (nrofSRS-Ports)
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SrsNofPorts {
    One = 1,
    Two = 2,
    Four = 4,
}

/// Number of consecutive SRS OFDM symbols (nrofSymbols)
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SrsNofSymbols {
    One = 1,
    Two = 2,
    Four = 4,
}

/// Transmission comb size K_TC (transmissionComb)
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TxComb {
    Two = 2,
    Four = 4,
    Eight = 8,
}

macro_rules! impl_small_enum {
    ($name:ident, $what:literal) => {
        impl $name {
            pub fn value(self) -> usize {
                self as usize
            }
        }

        impl TryFrom<u8> for $name {
            type Error = String;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                Self::from_u8(value).ok_or_else(|| format!("Invalid {}: {}", $what, value))
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value as u8
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", *self as u8)
            }
        }
    };
}

impl_small_enum!(SrsNofPorts, "number of SRS antenna ports");
impl_small_enum!(SrsNofSymbols, "number of SRS symbols");
impl_small_enum!(TxComb, "transmission comb size");

impl TxComb {
    /// Maximum number of cyclic shifts n_SRS^cs,max
    pub fn max_cyclic_shifts(self) -> u32 {
        match self {
            TxComb::Two => 8,
            TxComb::Four => 12,
            TxComb::Eight => 6,
        }
    }
}

/// SRS resource as configured by higher layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrsResourceConfiguration {
    /// Number of transmit antenna ports N_ap
    pub nof_antenna_ports: SrsNofPorts,
    /// Number of consecutive OFDM symbols N_symb
    pub nof_symbols: SrsNofSymbols,
    /// First OFDM symbol l_0 within the slot
    pub start_symbol: u8,
    /// Bandwidth configuration index C_SRS (0..=63)
    pub configuration_index: u8,
    /// Sequence identifier n_ID^SRS (0..=1023)
    pub sequence_id: u16,
    /// Bandwidth index B_SRS (0..=3)
    pub bandwidth_index: u8,
    /// Comb size K_TC
    pub comb_size: TxComb,
    /// Comb offset k̄_TC (0..K_TC)
    pub comb_offset: u8,
    /// Cyclic shift n_SRS^cs (0..n_cs_max)
    pub cyclic_shift: u8,
    /// Frequency domain position n_RRC (0..=67)
    pub freq_position: u8,
    /// Frequency domain shift n_shift (0..=268)
    pub freq_shift: u16,
}

impl Default for SrsResourceConfiguration {
    fn default() -> Self {
        Self {
            nof_antenna_ports: SrsNofPorts::One,
            nof_symbols: SrsNofSymbols::One,
            start_symbol: 13,
            configuration_index: 0,
            sequence_id: 0,
            bandwidth_index: 0,
            comb_size: TxComb::Two,
            comb_offset: 0,
            cyclic_shift: 0,
            freq_position: 0,
            freq_shift: 0,
        }
    }
}

/// Identity of the UE and sector an estimation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrsContext {
    pub sector_id: u16,
    pub rnti: Rnti,
}

impl fmt::Display for SrsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sector_id={} rnti={}", self.sector_id, self.rnti)
    }
}

/// Parameters of one SRS estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrsEstimatorConfiguration {
    /// Slot in which the SRS was received
    pub slot: SlotPoint,
    /// SRS resource
    pub resource: SrsResourceConfiguration,
    /// Receive ports to process, in output row order
    pub ports: Vec<u8>,
    /// Optional UE context
    #[serde(default)]
    pub context: Option<SrsContext>,
}

impl SrsEstimatorConfiguration {
    /// RNTI of the UE, if the context carries a valid one
    pub fn rnti(&self) -> Option<Rnti> {
        self.context.map(|context| context.rnti).filter(Rnti::is_valid)
    }
}
