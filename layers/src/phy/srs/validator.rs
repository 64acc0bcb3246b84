//! SRS estimator configuration validation

use super::configuration::{SrsEstimatorConfiguration, SrsNofPorts, TxComb};
use super::information::{get_srs_information, srs_bandwidth};
use super::{max_sequence_length, MAX_NOF_PRB, MAX_NOF_RX_PORTS};
use crate::phy::sequence::MIN_SEQUENCE_LENGTH;
use crate::LayerError;
use common::types::CyclicPrefix;
use common::utils::NOF_SUBCARRIERS_PER_RB;

/// Largest sequence identifier n_ID^SRS
const MAX_SEQUENCE_ID: u16 = 1023;

/// Largest frequency domain position n_RRC
const MAX_FREQ_POSITION: u8 = 67;

/// Largest frequency domain shift n_shift
const MAX_FREQ_SHIFT: u16 = 268;

/// Checks that a configuration can be processed by an estimator sized for
/// `max_nof_prb` PRB
#[derive(Debug, Clone, Copy)]
pub struct SrsValidator {
    max_nof_prb: usize,
}

impl SrsValidator {
    pub fn new(max_nof_prb: usize) -> Result<Self, LayerError> {
        if max_nof_prb == 0 || max_nof_prb > MAX_NOF_PRB {
            return Err(LayerError::ConfigurationError(format!(
                "Maximum number of PRB (i.e., {}) must be in 1..={}",
                max_nof_prb, MAX_NOF_PRB
            )));
        }
        Ok(Self { max_nof_prb })
    }

    pub fn max_nof_prb(&self) -> usize {
        self.max_nof_prb
    }

    /// Return the first problem found in `config`
    pub fn is_valid(&self, config: &SrsEstimatorConfiguration) -> Result<(), LayerError> {
        let resource = &config.resource;

        if config.slot.scs().is_none() {
            return Err(invalid(format!("Invalid numerology (i.e., {})", config.slot.numerology)));
        }

        let nof_symbols_slot = CyclicPrefix::Normal.symbols_per_slot();
        let nof_symbols = resource.nof_symbols.value() as u8;
        if resource.start_symbol as u16 + nof_symbols as u16 > nof_symbols_slot as u16 {
            return Err(invalid(format!(
                "The start symbol index (i.e., {}) plus the number of symbols (i.e., {}) exceeds the number of symbols per slot (i.e., {})",
                resource.start_symbol, nof_symbols, nof_symbols_slot
            )));
        }

        if resource.nof_antenna_ports == SrsNofPorts::Four && resource.comb_size == TxComb::Eight {
            return Err(invalid("Four antenna ports are not supported with comb size 8".to_string()));
        }

        if resource.comb_offset as usize >= resource.comb_size.value() {
            return Err(invalid(format!(
                "Comb offset (i.e., {}) must be lower than the comb size (i.e., {})",
                resource.comb_offset, resource.comb_size
            )));
        }

        let n_cs_max = resource.comb_size.max_cyclic_shifts();
        if resource.cyclic_shift as u32 >= n_cs_max {
            return Err(invalid(format!(
                "Cyclic shift (i.e., {}) must be lower than {} for comb size {}",
                resource.cyclic_shift, n_cs_max, resource.comb_size
            )));
        }

        if srs_bandwidth(resource.configuration_index, resource.bandwidth_index).is_none() {
            return Err(invalid(format!(
                "Invalid bandwidth configuration C_SRS={} B_SRS={}",
                resource.configuration_index, resource.bandwidth_index
            )));
        }

        if resource.sequence_id > MAX_SEQUENCE_ID {
            return Err(invalid(format!(
                "Sequence identifier (i.e., {}) exceeds {}",
                resource.sequence_id, MAX_SEQUENCE_ID
            )));
        }

        if resource.freq_position > MAX_FREQ_POSITION || resource.freq_shift > MAX_FREQ_SHIFT {
            return Err(invalid(format!(
                "Frequency position (i.e., {}) or shift (i.e., {}) out of range",
                resource.freq_position, resource.freq_shift
            )));
        }

        if config.ports.is_empty() || config.ports.len() > MAX_NOF_RX_PORTS {
            return Err(invalid(format!(
                "The number of receive ports (i.e., {}) must be in 1..={}",
                config.ports.len(),
                MAX_NOF_RX_PORTS
            )));
        }

        for (i, port) in config.ports.iter().enumerate() {
            if config.ports[..i].contains(port) {
                return Err(invalid(format!("Receive port {} is listed more than once", port)));
            }
        }

        let max_seq_length = max_sequence_length(self.max_nof_prb);
        let nof_subcarriers = self.max_nof_prb * NOF_SUBCARRIERS_PER_RB;
        for antenna_port in 0..resource.nof_antenna_ports.value() {
            let info = get_srs_information(resource, antenna_port);

            if info.sequence_length < MIN_SEQUENCE_LENGTH || info.sequence_length > max_seq_length {
                return Err(invalid(format!(
                    "Sequence length (i.e., {}) must be in {}..={}",
                    info.sequence_length, MIN_SEQUENCE_LENGTH, max_seq_length
                )));
            }

            let last_subcarrier = info.mapping_initial_subcarrier + (info.sequence_length - 1) * info.comb_size;
            if last_subcarrier >= nof_subcarriers {
                return Err(invalid(format!(
                    "SRS allocation up to subcarrier {} exceeds the {} subcarriers of {} PRB",
                    last_subcarrier, nof_subcarriers, self.max_nof_prb
                )));
            }
        }

        Ok(())
    }
}

fn invalid(message: String) -> LayerError {
    LayerError::InvalidConfiguration(message)
}
