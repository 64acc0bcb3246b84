//! SRS sequence and mapping parameters
//! 
//! Derives, for one transmit port, the sequence group, cyclic shift, sequence
//! length and first subcarrier of an SRS resource according to 3GPP TS 38.211
//! Section 6.4.1.4. Frequency hopping is not supported: the allocation is
//! fixed by n_RRC.

use super::configuration::{SrsResourceConfiguration, SrsNofPorts};
use common::utils::NOF_SUBCARRIERS_PER_RB;

/// Number of sequence groups
const NOF_SEQUENCE_GROUPS: u32 = 30;

/// TS 38.211 Table 6.4.1.4.3-1: (m_SRS,b, N_b) for b = 0..=3, indexed by C_SRS
const SRS_BANDWIDTH_TABLE: [[(u16, u8); 4]; 64] = [
    [(4, 1), (4, 1), (4, 1), (4, 1)],
    [(8, 1), (4, 2), (4, 1), (4, 1)],
    [(12, 1), (4, 3), (4, 1), (4, 1)],
    [(16, 1), (4, 4), (4, 1), (4, 1)],
    [(16, 1), (8, 2), (4, 2), (4, 1)],
    [(20, 1), (4, 5), (4, 1), (4, 1)],
    [(24, 1), (4, 6), (4, 1), (4, 1)],
    [(24, 1), (12, 2), (4, 3), (4, 1)],
    [(28, 1), (4, 7), (4, 1), (4, 1)],
    [(32, 1), (16, 2), (8, 2), (4, 2)],
    [(36, 1), (12, 3), (4, 3), (4, 1)],
    [(40, 1), (20, 2), (4, 5), (4, 1)],
    [(48, 1), (16, 3), (8, 2), (4, 2)],
    [(48, 1), (24, 2), (12, 2), (4, 3)],
    [(52, 1), (4, 13), (4, 1), (4, 1)],
    [(56, 1), (28, 2), (4, 7), (4, 1)],
    [(60, 1), (20, 3), (4, 5), (4, 1)],
    [(64, 1), (32, 2), (16, 2), (4, 4)],
    [(72, 1), (24, 3), (12, 2), (4, 3)],
    [(72, 1), (36, 2), (12, 3), (4, 3)],
    [(76, 1), (4, 19), (4, 1), (4, 1)],
    [(80, 1), (40, 2), (20, 2), (4, 5)],
    [(88, 1), (44, 2), (4, 11), (4, 1)],
    [(96, 1), (32, 3), (16, 2), (4, 4)],
    [(96, 1), (48, 2), (24, 2), (4, 6)],
    [(104, 1), (52, 2), (4, 13), (4, 1)],
    [(112, 1), (56, 2), (28, 2), (4, 7)],
    [(120, 1), (60, 2), (20, 3), (4, 5)],
    [(120, 1), (40, 3), (8, 5), (4, 2)],
    [(120, 1), (24, 5), (12, 2), (4, 3)],
    [(128, 1), (64, 2), (32, 2), (4, 8)],
    [(128, 1), (64, 2), (16, 4), (4, 4)],
    [(128, 1), (16, 8), (8, 2), (4, 2)],
    [(132, 1), (44, 3), (4, 11), (4, 1)],
    [(136, 1), (68, 2), (4, 17), (4, 1)],
    [(144, 1), (72, 2), (36, 2), (4, 9)],
    [(144, 1), (48, 3), (24, 2), (12, 2)],
    [(144, 1), (48, 3), (16, 3), (4, 4)],
    [(144, 1), (16, 9), (8, 2), (4, 2)],
    [(152, 1), (76, 2), (4, 19), (4, 1)],
    [(160, 1), (80, 2), (40, 2), (4, 10)],
    [(160, 1), (80, 2), (20, 4), (4, 5)],
    [(160, 1), (32, 5), (16, 2), (4, 4)],
    [(168, 1), (84, 2), (28, 3), (4, 7)],
    [(176, 1), (88, 2), (44, 2), (4, 11)],
    [(184, 1), (92, 2), (4, 23), (4, 1)],
    [(192, 1), (96, 2), (48, 2), (4, 12)],
    [(192, 1), (96, 2), (24, 4), (4, 6)],
    [(192, 1), (64, 3), (16, 4), (4, 4)],
    [(192, 1), (24, 8), (8, 3), (4, 2)],
    [(208, 1), (104, 2), (52, 2), (4, 13)],
    [(216, 1), (108, 2), (36, 3), (4, 9)],
    [(224, 1), (112, 2), (56, 2), (4, 14)],
    [(240, 1), (120, 2), (60, 2), (4, 15)],
    [(240, 1), (80, 3), (20, 4), (4, 5)],
    [(240, 1), (48, 5), (16, 3), (8, 2)],
    [(240, 1), (24, 10), (12, 2), (4, 3)],
    [(256, 1), (128, 2), (64, 2), (4, 16)],
    [(256, 1), (128, 2), (32, 4), (4, 8)],
    [(256, 1), (16, 16), (8, 2), (4, 2)],
    [(264, 1), (132, 2), (44, 3), (4, 11)],
    [(272, 1), (136, 2), (68, 2), (4, 17)],
    [(272, 1), (68, 4), (4, 17), (4, 1)],
    [(272, 1), (16, 17), (8, 2), (4, 2)],
];

/// Look up (m_SRS,b, N_b) for a bandwidth configuration
pub fn srs_bandwidth(configuration_index: u8, bandwidth_index: u8) -> Option<(u16, u8)> {
    SRS_BANDWIDTH_TABLE
        .get(configuration_index as usize)
        .and_then(|row| row.get(bandwidth_index as usize))
        .copied()
}

/// Sequence and mapping parameters of one SRS transmit port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrsInformation {
    /// Sequence group u
    pub sequence_group: u32,
    /// Base sequence number v
    pub sequence_number: u32,
    /// Cyclic shift n_SRS^cs,i of the port
    pub n_cs: u32,
    /// Maximum number of cyclic shifts n_SRS^cs,max
    pub n_cs_max: u32,
    /// Sequence length M_sc,b^SRS
    pub sequence_length: usize,
    /// First subcarrier k_0^(p_i) of the allocation
    pub mapping_initial_subcarrier: usize,
    /// Comb size K_TC
    pub comb_size: usize,
}

/// Derive the parameters of transmit port `antenna_port` of a resource.
///
/// # Panics
///
/// Panics if the bandwidth configuration is outside Table 6.4.1.4.3-1; the
/// resource must have passed validation.
pub fn get_srs_information(resource: &SrsResourceConfiguration, antenna_port: usize) -> SrsInformation {
    let nof_antenna_ports = resource.nof_antenna_ports.value();
    assert!(
        antenna_port < nof_antenna_ports,
        "Antenna port {} out of range for {} ports",
        antenna_port,
        nof_antenna_ports
    );

    let comb_size = resource.comb_size.value();
    let n_cs_max = resource.comb_size.max_cyclic_shifts();
    let n_cs_config = resource.cyclic_shift as u32;

    let n_cs = (n_cs_config + n_cs_max * antenna_port as u32 / nof_antenna_ports as u32) % n_cs_max;

    let row = &SRS_BANDWIDTH_TABLE[resource.configuration_index as usize];
    let (m_srs, _) = row[resource.bandwidth_index as usize];
    let sequence_length = m_srs as usize * NOF_SUBCARRIERS_PER_RB / comb_size;

    // Odd ports move to the other comb when the shifts of four ports crowd one comb
    let comb_offset = resource.comb_offset as usize;
    let k_tc = if nof_antenna_ports == 4 && antenna_port % 2 == 1 && n_cs_config >= n_cs_max / 2 {
        (comb_offset + comb_size / 2) % comb_size
    } else {
        comb_offset
    };

    let k0_bar = resource.freq_shift as usize * NOF_SUBCARRIERS_PER_RB + k_tc;
    let k0 = row[..=resource.bandwidth_index as usize]
        .iter()
        .fold(k0_bar, |k0, &(m_b, n_b)| {
            let n_b = (4 * resource.freq_position as usize / m_b as usize) % n_b as usize;
            k0 + NOF_SUBCARRIERS_PER_RB * m_b as usize * n_b
        });

    SrsInformation {
        sequence_group: resource.sequence_id as u32 % NOF_SEQUENCE_GROUPS,
        sequence_number: 0,
        n_cs,
        n_cs_max,
        sequence_length,
        mapping_initial_subcarrier: k0,
        comb_size,
    }
}

/// Whether the odd transmit ports of the resource use the second comb
pub fn has_interleaved_pilots(resource: &SrsResourceConfiguration) -> bool {
    let info = get_srs_information(resource, 0);
    resource.nof_antenna_ports == SrsNofPorts::Four && info.n_cs >= info.n_cs_max / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::srs::configuration::TxComb;

    fn resource(nof_antenna_ports: SrsNofPorts, comb_size: TxComb, cyclic_shift: u8) -> SrsResourceConfiguration {
        SrsResourceConfiguration {
            nof_antenna_ports,
            comb_size,
            cyclic_shift,
            configuration_index: 12,
            ..Default::default()
        }
    }

    #[test]
    fn test_bandwidth_table() {
        assert_eq!(srs_bandwidth(0, 0), Some((4, 1)));
        assert_eq!(srs_bandwidth(12, 0), Some((48, 1)));
        assert_eq!(srs_bandwidth(12, 3), Some((4, 2)));
        assert_eq!(srs_bandwidth(63, 1), Some((16, 17)));
        assert_eq!(srs_bandwidth(64, 0), None);
        assert_eq!(srs_bandwidth(0, 4), None);

        // Every row nests: m_b = m_(b+1) * N_(b+1)
        for row in SRS_BANDWIDTH_TABLE.iter() {
            assert_eq!(row[0].1, 1);
            for b in 1..4 {
                assert!(row[b - 1].0 >= row[b].0 * row[b].1 as u16);
            }
        }
    }

    #[test]
    fn test_sequence_length() {
        let info = get_srs_information(&resource(SrsNofPorts::One, TxComb::Four, 0), 0);
        assert_eq!(info.sequence_length, 144);
        assert_eq!(info.n_cs_max, 12);
        assert_eq!(info.comb_size, 4);

        let info = get_srs_information(&resource(SrsNofPorts::One, TxComb::Two, 0), 0);
        assert_eq!(info.sequence_length, 288);
    }

    #[test]
    fn test_port_cyclic_shifts() {
        let resource = resource(SrsNofPorts::Four, TxComb::Four, 6);
        let shifts: Vec<u32> = (0..4).map(|p| get_srs_information(&resource, p).n_cs).collect();
        assert_eq!(shifts, vec![6, 9, 0, 3]);
    }

    #[test]
    fn test_interleaved_comb_offsets() {
        let interleaved = resource(SrsNofPorts::Four, TxComb::Four, 6);
        assert!(has_interleaved_pilots(&interleaved));
        let offsets: Vec<usize> = (0..4)
            .map(|p| get_srs_information(&interleaved, p).mapping_initial_subcarrier)
            .collect();
        assert_eq!(offsets, vec![0, 2, 0, 2]);

        let shared = resource(SrsNofPorts::Four, TxComb::Four, 5);
        assert!(!has_interleaved_pilots(&shared));
        assert!((0..4).all(|p| get_srs_information(&shared, p).mapping_initial_subcarrier == 0));

        assert!(!has_interleaved_pilots(&resource(SrsNofPorts::Two, TxComb::Four, 6)));
    }

    #[test]
    fn test_frequency_position() {
        let resource = SrsResourceConfiguration {
            configuration_index: 12,
            bandwidth_index: 2,
            comb_size: TxComb::Two,
            comb_offset: 1,
            freq_position: 5,
            freq_shift: 2,
            sequence_id: 95,
            ..Default::default()
        };
        let info = get_srs_information(&resource, 0);

        // n_1 = (20 / 16) mod 3 = 1, n_2 = (20 / 8) mod 2 = 0
        assert_eq!(info.mapping_initial_subcarrier, 2 * 12 + 1 + 12 * 16);
        assert_eq!(info.sequence_length, 8 * 12 / 2);
        assert_eq!(info.sequence_group, 5);
        assert_eq!(info.sequence_number, 0);
    }
}
