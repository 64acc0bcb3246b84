//! Generic SRS channel and noise estimator
//!
//! For every receive port and transmit port the estimator:
//! 1. averages the least-squares channel estimate over the SRS symbols,
//! 2. estimates the time alignment of each transmit port and combines them,
//! 3. removes the common delay from the estimates,
//! 4. reduces each estimate to a wideband coefficient,
//! 5. subtracts the reconstructed pilots from the received signal to measure
//!    the noise.
//!
//! All scratch storage is sized at construction for the largest supported
//! configuration; estimations do not allocate.

use super::configuration::SrsEstimatorConfiguration;
use super::information::{get_srs_information, has_interleaved_pilots};
use super::phase_compensator::{ComplexExpTable, PhaseCompensator};
use super::result::{SrsChannelMatrix, SrsEstimatorResult};
use super::validator::SrsValidator;
use super::{max_sequence_length, CEXP_TABLE_SIZE, MAX_NOF_RX_PORTS, MAX_NOF_TX_PORTS};
use crate::phy::resource_grid::ResourceGridReader;
use crate::phy::sequence::{LowPaprSequenceGenerator, SrsSequenceGenerator};
use crate::phy::tensor::StaticTensor;
use crate::phy::time_alignment::{DftTimeAlignmentEstimator, TimeAlignmentEstimator, TimeAlignmentMeasurement};
use crate::LayerError;
use common::utils::convert_power_to_db;
use interfaces::csi_log::{ChannelSnapshot, CsiSink};
use num_complex::Complex32;
use std::f64::consts::TAU;
use std::sync::Arc;
use tracing::{debug, trace};

/// Lower bound of the noise standard deviation relative to the RSRP amplitude
const MIN_NOISE_TO_SIGNAL_AMPLITUDE: f32 = 0.01;

/// SRS channel estimator
pub trait SrsEstimator: Send {
    /// Estimate the channel and noise of the SRS described by `config` in `grid`.
    ///
    /// # Panics
    ///
    /// Panics if `config` is not valid for this estimator.
    fn estimate(&mut self, grid: &dyn ResourceGridReader, config: &SrsEstimatorConfiguration) -> SrsEstimatorResult;
}

/// Collaborators of [`GenericSrsEstimator`]
pub struct SrsEstimatorDependencies {
    pub sequence_generator: Box<dyn SrsSequenceGenerator>,
    pub ta_estimator: Box<dyn TimeAlignmentEstimator>,
    pub cexp_table: Arc<ComplexExpTable>,
    pub csi_sink: Option<Arc<dyn CsiSink>>,
}

impl SrsEstimatorDependencies {
    /// Zadoff-Chu pilots, DFT time alignment and no CSI sink
    pub fn with_defaults(cexp_table: Arc<ComplexExpTable>) -> Self {
        Self {
            sequence_generator: Box::new(LowPaprSequenceGenerator::new()),
            ta_estimator: Box::new(DftTimeAlignmentEstimator::default()),
            cexp_table,
            csi_sink: None,
        }
    }

    /// Attach a CSI sink
    pub fn with_csi_sink(mut self, csi_sink: Arc<dyn CsiSink>) -> Self {
        self.csi_sink = Some(csi_sink);
        self
    }
}

impl Default for SrsEstimatorDependencies {
    fn default() -> Self {
        Self::with_defaults(Arc::new(ComplexExpTable::new(CEXP_TABLE_SIZE)))
    }
}

/// SRS estimator for bandwidths of up to `max_nof_prb` PRB
pub struct GenericSrsEstimator {
    sequence_generator: Box<dyn SrsSequenceGenerator>,
    ta_estimator: Box<dyn TimeAlignmentEstimator>,
    csi_sink: Option<Arc<dyn CsiSink>>,
    validator: SrsValidator,
    compensator: PhaseCompensator,
    /// Least-squares estimates: [subcarrier, rx port, tx port]
    temp_lse: StaticTensor<Complex32, 3>,
    /// Pilot sequences: [subcarrier, tx port]
    all_sequences: StaticTensor<Complex32, 2>,
    /// Received signal minus reconstructed pilots: [subcarrier, comb parity, rx port]
    temp_noise: StaticTensor<Complex32, 3>,
    rx_sequence: Vec<Complex32>,
}

impl GenericSrsEstimator {
    pub fn new(dependencies: SrsEstimatorDependencies, max_nof_prb: usize) -> Result<Self, LayerError> {
        let validator = SrsValidator::new(max_nof_prb)?;
        let max_seq_length = max_sequence_length(max_nof_prb);

        debug!(
            "SRS estimator initialized for {} PRB (max sequence length {}, CSI sink {})",
            max_nof_prb,
            max_seq_length,
            if dependencies.csi_sink.is_some() { "enabled" } else { "disabled" }
        );

        Ok(Self {
            sequence_generator: dependencies.sequence_generator,
            ta_estimator: dependencies.ta_estimator,
            csi_sink: dependencies.csi_sink,
            validator,
            compensator: PhaseCompensator::new(dependencies.cexp_table, max_seq_length),
            temp_lse: StaticTensor::new(max_seq_length * MAX_NOF_RX_PORTS * MAX_NOF_TX_PORTS),
            all_sequences: StaticTensor::new(max_seq_length * MAX_NOF_TX_PORTS),
            temp_noise: StaticTensor::new(max_seq_length * 2 * MAX_NOF_RX_PORTS),
            rx_sequence: vec![Complex32::new(0.0, 0.0); max_seq_length],
        })
    }
}

impl SrsEstimator for GenericSrsEstimator {
    fn estimate(&mut self, grid: &dyn ResourceGridReader, config: &SrsEstimatorConfiguration) -> SrsEstimatorResult {
        if let Err(err) = self.validator.is_valid(config) {
            panic!("{}", err);
        }

        let resource = &config.resource;
        let nof_rx_ports = config.ports.len();
        let nof_antenna_ports = resource.nof_antenna_ports.value();
        let nof_symbols = resource.nof_symbols.value();
        let start_symbol = resource.start_symbol;
        let end_symbol = start_symbol + nof_symbols as u8;
        let comb_size = resource.comb_size.value();
        let scs = config.slot.scs().expect("numerology checked by the validator");
        let rnti = config.rnti();

        let common_info = get_srs_information(resource, 0);
        let sequence_length = common_info.sequence_length;
        let max_ta = 1.0 / (common_info.n_cs_max as f64 * scs.to_hz() * comb_size as f64);

        // With four ports and large cyclic shifts the odd ports sit on their own comb
        let interleaved_pilots = has_interleaved_pilots(resource);
        let noise_parity = |antenna_port: usize| if interleaved_pilots { antenna_port % 2 } else { 0 };
        let tracks_noise = |antenna_port: usize| antenna_port == 0 || (interleaved_pilots && antenna_port == 1);

        self.temp_lse.resize([sequence_length, nof_rx_ports, nof_antenna_ports]);
        self.all_sequences.resize([sequence_length, nof_antenna_ports]);
        self.temp_noise.resize([sequence_length, 2, nof_rx_ports]);
        self.temp_noise.fill(Complex32::new(0.0, 0.0));
        let rx_sequence = &mut self.rx_sequence[..sequence_length];

        let mut time_alignment = TimeAlignmentMeasurement {
            time_alignment: 0.0,
            resolution: 0.0,
            min: f64::MIN,
            max: f64::MAX,
        };
        let mut epre = 0.0f32;

        for i_antenna_port in 0..nof_antenna_ports {
            let info = get_srs_information(resource, i_antenna_port);

            self.sequence_generator.generate(
                self.all_sequences.get_view_mut(&[i_antenna_port]),
                info.sequence_group,
                info.sequence_number,
                info.n_cs,
                info.n_cs_max,
            );
            let sequence = self.all_sequences.get_view(&[i_antenna_port]);

            for (i_rx_port, &rx_port) in config.ports.iter().enumerate() {
                let mean_lse = self.temp_lse.get_view_mut(&[i_rx_port, i_antenna_port]);
                let noise_help = self.temp_noise.get_view_mut(&[noise_parity(i_antenna_port), i_rx_port]);

                for i_symbol in start_symbol..end_symbol {
                    grid.get(
                        rx_sequence,
                        rx_port as usize,
                        i_symbol,
                        info.mapping_initial_subcarrier,
                        info.comb_size,
                    );

                    // Each comb is accounted for once, by its lowest port
                    if tracks_noise(i_antenna_port) {
                        add_assign(noise_help, rx_sequence);
                        epre += average_power(rx_sequence);
                    }

                    if i_symbol == start_symbol {
                        mean_lse.copy_from_slice(rx_sequence);
                    } else {
                        add_assign(mean_lse, rx_sequence);
                    }
                }

                for (lse, pilot) in mean_lse.iter_mut().zip(sequence) {
                    *lse *= pilot.conj();
                }
                if nof_symbols > 1 {
                    let scale = 1.0 / nof_symbols as f32;
                    for lse in mean_lse.iter_mut() {
                        *lse *= scale;
                    }
                }
            }

            let port_ta = self.ta_estimator.estimate(
                self.temp_lse.get_matrix_view(&[i_antenna_port]),
                info.comb_size,
                scs,
                max_ta,
            );
            time_alignment.time_alignment += port_ta.time_alignment;
            time_alignment.min = time_alignment.min.max(port_ta.min);
            time_alignment.max = time_alignment.max.min(port_ta.max);
            time_alignment.resolution = time_alignment.resolution.max(port_ta.resolution);
        }

        time_alignment.time_alignment /= nof_antenna_ports as f64;

        let phase_shift_subcarrier = (TAU * time_alignment.time_alignment * scs.to_hz() * comb_size as f64) as f32;

        let mut channel_matrix = SrsChannelMatrix::new(nof_rx_ports, nof_antenna_ports);
        let mut noise_var = 0.0f32;
        let mut rsrp = 0.0f32;

        for i_rx_port in 0..nof_rx_ports {
            for i_antenna_port in 0..nof_antenna_ports {
                let info = get_srs_information(resource, i_antenna_port);
                let phase_shift_offset =
                    phase_shift_subcarrier * info.mapping_initial_subcarrier as f32 / comb_size as f32;

                let mean_lse = self.temp_lse.get_view_mut(&[i_rx_port, i_antenna_port]);
                self.compensator.compensate(mean_lse, phase_shift_subcarrier, phase_shift_offset);

                if let (Some(sink), Some(rnti)) = (&self.csi_sink, rnti) {
                    sink.notify(&ChannelSnapshot {
                        rnti,
                        rx_port: config.ports[i_rx_port] as u16,
                        tx_port: i_antenna_port as u16,
                        symbol: start_symbol as u16,
                        initial_subcarrier: info.mapping_initial_subcarrier as u32,
                        comb_size: info.comb_size as u32,
                        tones: mean_lse,
                    });
                }

                let coefficient = mean(mean_lse);
                channel_matrix.set_coefficient(coefficient, i_rx_port, i_antenna_port);
                rsrp += coefficient.norm_sqr();

                // Remove the reconstructed pilots of this port from the received signal
                let noise_help = self.temp_noise.get_view_mut(&[noise_parity(i_antenna_port), i_rx_port]);
                if tracks_noise(i_antenna_port) {
                    self.compensator.compensate(noise_help, phase_shift_subcarrier, phase_shift_offset);
                }
                let recovered_scale = coefficient * nof_symbols as f32;
                for (noise, pilot) in noise_help.iter_mut().zip(self.all_sequences.get_view(&[i_antenna_port])) {
                    *noise -= pilot * recovered_scale;
                }
            }

            noise_var += average_power(self.temp_noise.get_view(&[0, i_rx_port])) * sequence_length as f32;
            if interleaved_pilots {
                noise_var += average_power(self.temp_noise.get_view(&[1, i_rx_port])) * sequence_length as f32;
            }
        }

        let nof_estimates = if interleaved_pilots { 2 } else { nof_antenna_ports };
        let correction_factor = if interleaved_pilots { 2 } else { 1 };

        noise_var /= ((nof_symbols * sequence_length - nof_estimates) * correction_factor * nof_rx_ports) as f32;
        epre /= (nof_symbols * correction_factor * nof_rx_ports) as f32;
        rsrp /= (nof_antenna_ports * nof_rx_ports) as f32;

        let noise_std = noise_var.sqrt().max(rsrp.sqrt() * MIN_NOISE_TO_SIGNAL_AMPLITUDE);
        if noise_std > 0.0 {
            channel_matrix *= 1.0 / noise_std;
        }

        let result = SrsEstimatorResult {
            channel_matrix,
            time_alignment,
            noise_variance: noise_var,
            epre_db: convert_power_to_db(epre),
            rsrp_db: convert_power_to_db(rsrp),
        };

        trace!(
            "SRS estimation slot={} ports={:?}: ta={:.3}us rsrp={:.1}dB epre={:.1}dB noise_var={:.3e}",
            config.slot,
            config.ports,
            result.time_alignment.time_alignment * 1e6,
            result.rsrp_db,
            result.epre_db,
            result.noise_variance
        );

        result
    }
}

fn add_assign(acc: &mut [Complex32], values: &[Complex32]) {
    for (a, v) in acc.iter_mut().zip(values) {
        *a += *v;
    }
}

fn average_power(values: &[Complex32]) -> f32 {
    values.iter().map(|v| v.norm_sqr()).sum::<f32>() / values.len() as f32
}

fn mean(values: &[Complex32]) -> Complex32 {
    values.iter().sum::<Complex32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::resource_grid::ResourceGrid;
    use crate::phy::srs::configuration::{SrsContext, SrsNofPorts, SrsNofSymbols, SrsResourceConfiguration, TxComb};
    use approx::assert_relative_eq;
    use common::types::{CyclicPrefix, Rnti, SlotPoint};
    use common::utils::convert_db_to_power;
    use ndarray::{Array2, ArrayView2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};
    use std::sync::Mutex;

    struct OnesSequenceGenerator;

    impl SrsSequenceGenerator for OnesSequenceGenerator {
        fn generate(&self, sequence: &mut [Complex32], _u: u32, _v: u32, _n_cs: u32, _n_cs_max: u32) {
            sequence.fill(Complex32::new(1.0, 0.0));
        }
    }

    struct FixedTimeAlignment(f64);

    impl TimeAlignmentEstimator for FixedTimeAlignment {
        fn estimate(
            &mut self,
            _lse: ArrayView2<'_, Complex32>,
            stride: usize,
            scs: common::types::SubcarrierSpacing,
            max_ta: f64,
        ) -> TimeAlignmentMeasurement {
            TimeAlignmentMeasurement {
                time_alignment: self.0,
                resolution: 1.0 / (4096.0 * stride as f64 * scs.to_hz()),
                min: -max_ta,
                max: max_ta,
            }
        }
    }

    /// Hands out one preset measurement per call, cycling through the list
    struct ScriptedTimeAlignment {
        measurements: Vec<TimeAlignmentMeasurement>,
        next: usize,
    }

    impl TimeAlignmentEstimator for ScriptedTimeAlignment {
        fn estimate(
            &mut self,
            _lse: ArrayView2<'_, Complex32>,
            _stride: usize,
            _scs: common::types::SubcarrierSpacing,
            _max_ta: f64,
        ) -> TimeAlignmentMeasurement {
            let measurement = self.measurements[self.next % self.measurements.len()];
            self.next += 1;
            measurement
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        snapshots: Mutex<Vec<(u16, u16, u16, u32, u32, usize)>>,
    }

    impl CsiSink for RecordingSink {
        fn notify(&self, snapshot: &ChannelSnapshot<'_>) {
            self.snapshots.lock().unwrap().push((
                snapshot.rx_port,
                snapshot.tx_port,
                snapshot.symbol,
                snapshot.initial_subcarrier,
                snapshot.comb_size,
                snapshot.tones.len(),
            ));
        }
    }

    fn estimator_with(
        sequence_generator: Box<dyn SrsSequenceGenerator>,
        ta_estimator: Box<dyn TimeAlignmentEstimator>,
        max_nof_prb: usize,
    ) -> GenericSrsEstimator {
        let dependencies = SrsEstimatorDependencies {
            sequence_generator,
            ta_estimator,
            cexp_table: Arc::new(ComplexExpTable::new(CEXP_TABLE_SIZE)),
            csi_sink: None,
        };
        GenericSrsEstimator::new(dependencies, max_nof_prb).unwrap()
    }

    fn config(resource: SrsResourceConfiguration, ports: Vec<u8>) -> SrsEstimatorConfiguration {
        SrsEstimatorConfiguration {
            slot: SlotPoint::new(1, 512, 7),
            resource,
            ports,
            context: None,
        }
    }

    fn resource(
        nof_antenna_ports: SrsNofPorts,
        comb_size: TxComb,
        cyclic_shift: u8,
        configuration_index: u8,
    ) -> SrsResourceConfiguration {
        SrsResourceConfiguration {
            nof_antenna_ports,
            comb_size,
            cyclic_shift,
            configuration_index,
            sequence_id: 77,
            ..Default::default()
        }
    }

    /// Grid with the pilots of every port through `channel` `[rx, tx]`,
    /// delayed by `delay` seconds, plus complex white noise
    fn sounding_grid(
        config: &SrsEstimatorConfiguration,
        channel: &Array2<Complex32>,
        nof_prb: u16,
        delay: f64,
        noise_variance: f32,
        seed: u64,
    ) -> ResourceGrid {
        let nof_grid_ports = *config.ports.iter().max().unwrap() as usize + 1;
        let mut grid = ResourceGrid::new(nof_grid_ports, nof_prb, CyclicPrefix::Normal).unwrap();
        let generator = LowPaprSequenceGenerator::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0f32, (noise_variance / 2.0).sqrt()).unwrap();
        let scs_hz = config.slot.scs().unwrap().to_hz();
        let nof_subcarriers = nof_prb as usize * 12;
        let resource = &config.resource;
        let start_symbol = resource.start_symbol;

        for (i_rx, &rx_port) in config.ports.iter().enumerate() {
            for symbol in start_symbol..start_symbol + resource.nof_symbols.value() as u8 {
                let mut symbol_data = vec![Complex32::new(0.0, 0.0); nof_subcarriers];

                for i_tx in 0..resource.nof_antenna_ports.value() {
                    let info = get_srs_information(resource, i_tx);
                    let mut pilots = vec![Complex32::new(0.0, 0.0); info.sequence_length];
                    generator.generate(&mut pilots, info.sequence_group, info.sequence_number, info.n_cs, info.n_cs_max);

                    for (n, pilot) in pilots.iter().enumerate() {
                        let k = info.mapping_initial_subcarrier + n * info.comb_size;
                        let delay_phase = -TAU * k as f64 * scs_hz * delay;
                        symbol_data[k] += channel[(i_rx, i_tx)] * pilot * Complex32::from_polar(1.0, delay_phase as f32);
                    }
                }

                if noise_variance > 0.0 {
                    for value in symbol_data.iter_mut() {
                        *value += Complex32::new(noise.sample(&mut rng), noise.sample(&mut rng));
                    }
                }

                grid.put(rx_port as usize, symbol, 0, 1, &symbol_data).unwrap();
            }
        }

        grid
    }

    fn test_channel(nof_rx: usize, nof_tx: usize) -> Array2<Complex32> {
        Array2::from_shape_fn((nof_rx, nof_tx), |(rx, tx)| {
            Complex32::from_polar(0.5 + 0.25 * tx as f32, 0.7 * rx as f32 - 1.1 * tx as f32)
        })
    }

    /// Undo the noise normalisation of the channel matrix
    fn denormalised(result: &SrsEstimatorResult, rx: usize, tx: usize) -> Complex32 {
        let rsrp = convert_db_to_power(result.rsrp_db);
        let noise_std = result.noise_variance.sqrt().max(rsrp.sqrt() * 0.01);
        result.channel_matrix.get_coefficient(rx, tx) * noise_std
    }

    fn flat_grid(value: Complex32, symbols: &[u8]) -> ResourceGrid {
        let mut grid = ResourceGrid::new(1, 52, CyclicPrefix::Normal).unwrap();
        let data = vec![value; 52 * 12];
        for &symbol in symbols {
            grid.put(0, symbol, 0, 1, &data).unwrap();
        }
        grid
    }

    #[test]
    fn test_flat_channel_without_noise() {
        let mut estimator = estimator_with(
            Box::new(OnesSequenceGenerator),
            Box::new(DftTimeAlignmentEstimator::default()),
            52,
        );
        let config = config(resource(SrsNofPorts::One, TxComb::Four, 0, 12), vec![0]);
        let grid = flat_grid(Complex32::new(2.0, 0.0), &[13]);

        let result = estimator.estimate(&grid, &config);

        // Noise floor clamped to 1% of the coefficient amplitude
        let coefficient = result.channel_matrix.get_coefficient(0, 0);
        assert_relative_eq!(coefficient.re, 100.0, max_relative = 1e-4);
        assert_relative_eq!(coefficient.im, 0.0, epsilon = 1e-3);
        assert_eq!(result.noise_variance, 0.0);
        assert_relative_eq!(result.rsrp_db, 20.0 * 2.0f32.log10(), epsilon = 1e-4);
        assert_relative_eq!(result.epre_db, 20.0 * 2.0f32.log10(), epsilon = 1e-4);
        assert_eq!(result.time_alignment.time_alignment, 0.0);
        assert!(result.time_alignment.min <= 0.0 && result.time_alignment.max >= 0.0);
    }

    #[test]
    fn test_two_symbols_match_one_symbol() {
        let mut estimator = estimator_with(
            Box::new(OnesSequenceGenerator),
            Box::new(DftTimeAlignmentEstimator::default()),
            52,
        );
        let one_symbol = config(resource(SrsNofPorts::One, TxComb::Four, 0, 12), vec![0]);
        let mut two_symbols = one_symbol.clone();
        two_symbols.resource.nof_symbols = SrsNofSymbols::Two;
        two_symbols.resource.start_symbol = 12;

        let single = estimator.estimate(&flat_grid(Complex32::new(2.0, 0.0), &[13]), &one_symbol);
        let double = estimator.estimate(&flat_grid(Complex32::new(2.0, 0.0), &[12, 13]), &two_symbols);

        assert_eq!(single, double);
    }

    #[test]
    fn test_noise_variance_two_ports() {
        let noise_variance = 0.05;
        let channel = test_channel(4, 2);

        // Short sequence: 288 tones per port
        let mut estimator = estimator_with(
            Box::new(LowPaprSequenceGenerator::new()),
            Box::new(FixedTimeAlignment(0.0)),
            52,
        );
        let short = config(resource(SrsNofPorts::Two, TxComb::Two, 0, 12), vec![0, 1, 2, 3]);
        let grid = sounding_grid(&short, &channel, 52, 0.0, noise_variance, 1);
        let result = estimator.estimate(&grid, &short);
        assert_relative_eq!(result.noise_variance, noise_variance, max_relative = 0.15);

        // Longest sequence: 1632 tones per port
        let mut estimator = estimator_with(
            Box::new(LowPaprSequenceGenerator::new()),
            Box::new(FixedTimeAlignment(0.0)),
            275,
        );
        let long = config(resource(SrsNofPorts::Two, TxComb::Two, 0, 61), vec![0, 1, 2, 3]);
        let grid = sounding_grid(&long, &channel, 273, 0.0, noise_variance, 2);
        let result = estimator.estimate(&grid, &long);
        assert_relative_eq!(result.noise_variance, noise_variance, max_relative = 0.05);

        for rx in 0..4 {
            for tx in 0..2 {
                let error = denormalised(&result, rx, tx) - channel[(rx, tx)];
                assert!(error.norm() < 0.05, "coefficient ({}, {}) off by {}", rx, tx, error.norm());
            }
        }
    }

    #[test]
    fn test_noise_variance_interleaved_pilots() {
        let noise_variance = 0.1;
        let channel = test_channel(2, 4);
        let mut estimator = estimator_with(
            Box::new(LowPaprSequenceGenerator::new()),
            Box::new(FixedTimeAlignment(0.0)),
            52,
        );
        let config = config(resource(SrsNofPorts::Four, TxComb::Four, 6, 12), vec![0, 1]);
        assert!(has_interleaved_pilots(&config.resource));

        let grid = sounding_grid(&config, &channel, 52, 0.0, noise_variance, 3);
        let result = estimator.estimate(&grid, &config);

        assert_relative_eq!(result.noise_variance, noise_variance, max_relative = 0.15);
        assert_eq!(result.channel_matrix.nof_rx_ports(), 2);
        assert_eq!(result.channel_matrix.nof_tx_ports(), 4);
        for rx in 0..2 {
            for tx in 0..4 {
                let error = denormalised(&result, rx, tx) - channel[(rx, tx)];
                assert!(error.norm() < 0.15, "coefficient ({}, {}) off by {}", rx, tx, error.norm());
            }
        }
    }

    #[test]
    fn test_interleaved_noise_normalisation() {
        let noise_variance = 0.1f32;
        let channel = test_channel(2, 4);
        let mut estimator = estimator_with(
            Box::new(LowPaprSequenceGenerator::new()),
            Box::new(FixedTimeAlignment(0.0)),
            52,
        );
        let config = config(resource(SrsNofPorts::Four, TxComb::Four, 6, 12), vec![0, 1]);
        assert!(has_interleaved_pilots(&config.resource));
        let symbol = config.resource.start_symbol;

        // Disturbance on each comb orthogonal to the pilots of both ports sharing it,
        // so the residual after reconstruction is exactly that disturbance
        let mut grid = sounding_grid(&config, &channel, 52, 0.0, 0.0, 0);
        let generator = LowPaprSequenceGenerator::new();
        for rx in 0..2 {
            for parity in 0..2 {
                let info = get_srs_information(&config.resource, parity);
                let length = info.sequence_length;
                let mut base = vec![Complex32::new(0.0, 0.0); length];
                generator.generate(&mut base, info.sequence_group, info.sequence_number, 0, info.n_cs_max);

                let amplitude = Complex32::from_polar(noise_variance.sqrt(), (rx + parity) as f32);
                for (n, pilot) in base.iter().enumerate() {
                    let k = info.mapping_initial_subcarrier + n * info.comb_size;
                    let tilt = Complex32::from_polar(1.0, (TAU * 5.0 * n as f64 / length as f64) as f32);
                    let value = grid.get_re(rx, k, symbol).unwrap() + amplitude * pilot * tilt;
                    grid.map_re(rx, k, symbol, value).unwrap();
                }
            }
        }

        let result = estimator.estimate(&grid, &config);

        // Two estimates per comb out of 144 tones, averaged over both combs
        let length = get_srs_information(&config.resource, 0).sequence_length;
        assert_eq!(length, 144);
        let expected = noise_variance * length as f32 / (length - 2) as f32;
        assert_relative_eq!(result.noise_variance, expected, max_relative = 1e-3);

        for rx in 0..2 {
            for tx in 0..4 {
                let error = denormalised(&result, rx, tx) - channel[(rx, tx)];
                assert!(error.norm() < 1e-3, "coefficient ({}, {}) off by {}", rx, tx, error.norm());
            }
        }
    }

    #[test]
    fn test_port_time_alignments_are_combined() {
        let first = TimeAlignmentMeasurement {
            time_alignment: 1e-7,
            resolution: 1e-9,
            min: -5e-7,
            max: 4e-7,
        };
        let second = TimeAlignmentMeasurement {
            time_alignment: 3e-7,
            resolution: 2e-9,
            min: -3e-7,
            max: 6e-7,
        };
        let mut estimator = estimator_with(
            Box::new(LowPaprSequenceGenerator::new()),
            Box::new(ScriptedTimeAlignment { measurements: vec![first, second], next: 0 }),
            52,
        );
        let config = config(resource(SrsNofPorts::Two, TxComb::Four, 0, 12), vec![0]);
        let grid = sounding_grid(&config, &test_channel(1, 2), 52, 0.0, 0.0, 0);

        let ta = estimator.estimate(&grid, &config).time_alignment;

        assert_relative_eq!(ta.time_alignment, 2e-7, max_relative = 1e-12);
        assert_eq!(ta.resolution, 2e-9);
        assert_eq!(ta.min, -3e-7);
        assert_eq!(ta.max, 4e-7);
        assert!(ta.min <= ta.time_alignment && ta.time_alignment <= ta.max);
    }

    #[test]
    fn test_time_alignment_is_compensated() {
        let mut estimator = GenericSrsEstimator::new(SrsEstimatorDependencies::default(), 52).unwrap();
        let mut resource = resource(SrsNofPorts::One, TxComb::Two, 0, 12);
        resource.freq_shift = 1;
        let config = config(resource, vec![0]);

        let scs_hz = config.slot.scs().unwrap().to_hz();
        let resolution = 1.0 / (4096.0 * 2.0 * scs_hz);
        let delay = 20.0 * resolution;
        let channel = Array2::from_elem((1, 1), Complex32::new(0.8, -0.6));
        let grid = sounding_grid(&config, &channel, 52, delay, 0.0, 0);

        let result = estimator.estimate(&grid, &config);

        let ta = result.time_alignment;
        assert_relative_eq!(ta.time_alignment, delay, max_relative = 1e-6);
        assert_relative_eq!(ta.resolution, resolution, max_relative = 1e-9);
        assert!(ta.min <= ta.time_alignment && ta.time_alignment <= ta.max);

        let coefficient = denormalised(&result, 0, 0);
        assert_relative_eq!(coefficient.re, 0.8, epsilon = 2e-3);
        assert_relative_eq!(coefficient.im, -0.6, epsilon = 2e-3);
    }

    #[test]
    fn test_repeated_estimation_is_identical() {
        let mut estimator = GenericSrsEstimator::new(SrsEstimatorDependencies::default(), 52).unwrap();
        let config = config(resource(SrsNofPorts::Two, TxComb::Four, 3, 12), vec![1, 0]);
        let grid = sounding_grid(&config, &test_channel(2, 2), 52, 0.0, 0.01, 4);

        let first = estimator.estimate(&grid, &config);
        let second = estimator.estimate(&grid, &config);
        assert_eq!(first, second);

        let ta = first.time_alignment;
        assert!(ta.min <= ta.time_alignment && ta.time_alignment <= ta.max);

        let norm = first.channel_matrix.frobenius_norm();
        assert!(norm.is_finite());
        assert!(norm * norm <= 2.0 * 2.0 * 1e4 * (1.0 + 1e-4));
    }

    #[test]
    fn test_empty_grid_gives_finite_matrix() {
        let mut estimator = GenericSrsEstimator::new(SrsEstimatorDependencies::default(), 52).unwrap();
        let config = config(resource(SrsNofPorts::Two, TxComb::Two, 0, 12), vec![0, 1]);
        let grid = ResourceGrid::new(2, 52, CyclicPrefix::Normal).unwrap();

        let result = estimator.estimate(&grid, &config);
        for rx in 0..2 {
            for tx in 0..2 {
                assert!(result.channel_matrix.get_coefficient(rx, tx).norm().is_finite());
            }
        }
        assert_eq!(result.noise_variance, 0.0);
    }

    #[test]
    fn test_csi_sink_notifications() {
        let sink = Arc::new(RecordingSink::default());
        let dependencies = SrsEstimatorDependencies::default().with_csi_sink(sink.clone());
        let mut with_sink = GenericSrsEstimator::new(dependencies, 52).unwrap();
        let mut without_sink = GenericSrsEstimator::new(SrsEstimatorDependencies::default(), 52).unwrap();

        let mut config = config(resource(SrsNofPorts::Two, TxComb::Four, 0, 12), vec![2, 0]);
        let grid = sounding_grid(&config, &test_channel(2, 2), 52, 0.0, 0.01, 5);

        // No context, no snapshots
        with_sink.estimate(&grid, &config);
        assert!(sink.snapshots.lock().unwrap().is_empty());

        config.context = Some(SrsContext { sector_id: 0, rnti: Rnti::new(0) });
        with_sink.estimate(&grid, &config);
        assert!(sink.snapshots.lock().unwrap().is_empty());

        config.context = Some(SrsContext { sector_id: 0, rnti: Rnti::new(0x4601) });
        let observed = with_sink.estimate(&grid, &config);
        let reference = without_sink.estimate(&grid, &config);
        assert_eq!(observed, reference);

        let snapshots = sink.snapshots.lock().unwrap();
        assert_eq!(
            *snapshots,
            vec![
                (2, 0, 13, 0, 4, 144),
                (2, 1, 13, 0, 4, 144),
                (0, 0, 13, 0, 4, 144),
                (0, 1, 13, 0, 4, 144),
            ]
        );
    }

    #[test]
    #[should_panic(expected = "exceeds the number of symbols per slot")]
    fn test_invalid_configuration_panics() {
        let mut estimator = GenericSrsEstimator::new(SrsEstimatorDependencies::default(), 52).unwrap();
        let mut config = config(resource(SrsNofPorts::One, TxComb::Four, 0, 12), vec![0]);
        config.resource.nof_symbols = SrsNofSymbols::Two;
        config.resource.start_symbol = 13;
        let grid = ResourceGrid::new(1, 52, CyclicPrefix::Normal).unwrap();
        estimator.estimate(&grid, &config);
    }

    #[test]
    fn test_estimator_rejects_bad_size() {
        assert!(GenericSrsEstimator::new(SrsEstimatorDependencies::default(), 0).is_err());
        assert!(GenericSrsEstimator::new(SrsEstimatorDependencies::default(), 300).is_err());
    }
}
