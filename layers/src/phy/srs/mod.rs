//! Sounding Reference Signal (SRS) channel estimation
//! 
//! Implements the uplink SRS receiver according to 3GPP TS 38.211 Section 6.4.1.4:
//! per-port least-squares channel estimation, time alignment, phase
//! compensation, wideband channel coefficients and noise statistics.

pub mod configuration;
pub mod estimator;
pub mod information;
pub mod phase_compensator;
pub mod result;
pub mod validator;

pub use configuration::{
    SrsContext, SrsEstimatorConfiguration, SrsNofPorts, SrsNofSymbols, SrsResourceConfiguration, TxComb,
};
pub use estimator::{GenericSrsEstimator, SrsEstimator, SrsEstimatorDependencies};
pub use information::{get_srs_information, has_interleaved_pilots, SrsInformation};
pub use phase_compensator::{ComplexExpTable, PhaseCompensator};
pub use result::{SrsChannelMatrix, SrsEstimatorResult};
pub use validator::SrsValidator;

/// Maximum number of receive ports per estimation
pub const MAX_NOF_RX_PORTS: usize = 4;

/// Maximum number of SRS transmit ports
pub const MAX_NOF_TX_PORTS: usize = 4;

/// Maximum number of PRB in an uplink bandwidth part
pub const MAX_NOF_PRB: usize = 275;

/// Number of entries of the complex exponential table used for phase compensation
pub const CEXP_TABLE_SIZE: usize = 4096;

/// Longest SRS sequence that fits in `max_nof_prb` PRB with the smallest comb
pub fn max_sequence_length(max_nof_prb: usize) -> usize {
    max_nof_prb * common::utils::NOF_SUBCARRIERS_PER_RB / TxComb::Two.value()
}
