//! Host pipeline over synthetic sounding occasions
//!
//! Each occasion draws a Rayleigh channel per port pair, maps the delayed pilots
//! of every transmit port into a fresh grid, adds white noise at the configured
//! SNR and runs the SRS estimator. With CSI capture enabled the estimator
//! reports its per-tone estimates to a [`CsiLogger`] owned by this pipeline.

use crate::config::SimulationConfig;
use anyhow::{anyhow, Result};
use common::types::{CyclicPrefix, Rnti, SlotPoint, SubcarrierSpacing};
use common::utils::convert_db_to_power;
use interfaces::csi_log::CsiLogger;
use layers::phy::resource_grid::{ResourceGrid, ResourceGridReader};
use layers::phy::sequence::{LowPaprSequenceGenerator, SrsSequenceGenerator};
use layers::phy::srs::{
    get_srs_information, GenericSrsEstimator, SrsContext, SrsEstimator, SrsEstimatorConfiguration,
    SrsEstimatorDependencies, SrsValidator,
};
use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::TAU;
use std::sync::Arc;
use tracing::{debug, info};

/// Aggregate outcome of a simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationReport {
    pub occasions: u32,
    /// Noise variance injected per resource element
    pub expected_noise_variance: f32,
    /// Average of the estimated noise variances
    pub mean_noise_variance: f32,
    /// Average absolute time alignment error in nanoseconds
    pub mean_ta_error_ns: f64,
    pub records_written: u64,
    pub records_dropped: u64,
}

/// Generates the received grids
struct SoundingSynthesizer {
    rng: StdRng,
    fading: Normal<f32>,
    noise: Normal<f32>,
    generator: LowPaprSequenceGenerator,
    symbol_data: Vec<Complex32>,
    pilots: Vec<Complex32>,
}

impl SoundingSynthesizer {
    fn new(seed: u64, noise_variance: f32, nof_subcarriers: usize) -> Result<Self> {
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            fading: Normal::new(0.0, std::f32::consts::FRAC_1_SQRT_2)
                .map_err(|e| anyhow!("Invalid fading distribution: {}", e))?,
            noise: Normal::new(0.0, (noise_variance / 2.0).sqrt())
                .map_err(|e| anyhow!("Invalid noise level: {}", e))?,
            generator: LowPaprSequenceGenerator::new(),
            symbol_data: vec![Complex32::new(0.0, 0.0); nof_subcarriers],
            pilots: Vec::new(),
        })
    }

    /// Unit-power complex Gaussian coefficient
    fn draw_coefficient(&mut self) -> Complex32 {
        Complex32::new(self.fading.sample(&mut self.rng), self.fading.sample(&mut self.rng))
    }

    /// Channel matrix `[rx][tx]`
    fn draw_channel(&mut self, nof_rx: usize, nof_tx: usize) -> Vec<Vec<Complex32>> {
        (0..nof_rx)
            .map(|_| (0..nof_tx).map(|_| self.draw_coefficient()).collect())
            .collect()
    }

    fn fill(
        &mut self,
        grid: &mut ResourceGrid,
        request: &SrsEstimatorConfiguration,
        channel: &[Vec<Complex32>],
        scs: SubcarrierSpacing,
        delay: f64,
    ) -> Result<()> {
        let resource = &request.resource;
        let start_symbol = resource.start_symbol;
        let end_symbol = start_symbol + resource.nof_symbols.value() as u8;

        for (i_rx, &rx_port) in request.ports.iter().enumerate() {
            for symbol in start_symbol..end_symbol {
                self.symbol_data.fill(Complex32::new(0.0, 0.0));

                for i_tx in 0..resource.nof_antenna_ports.value() {
                    let info = get_srs_information(resource, i_tx);
                    self.pilots.resize(info.sequence_length, Complex32::new(0.0, 0.0));
                    self.generator.generate(
                        &mut self.pilots,
                        info.sequence_group,
                        info.sequence_number,
                        info.n_cs,
                        info.n_cs_max,
                    );

                    for (n, pilot) in self.pilots.iter().enumerate() {
                        let k = info.mapping_initial_subcarrier + n * info.comb_size;
                        let delay_phase = -TAU * k as f64 * scs.to_hz() * delay;
                        self.symbol_data[k] +=
                            channel[i_rx][i_tx] * pilot * Complex32::from_polar(1.0, delay_phase as f32);
                    }
                }

                for value in self.symbol_data.iter_mut() {
                    *value += Complex32::new(self.noise.sample(&mut self.rng), self.noise.sample(&mut self.rng));
                }

                grid.put(rx_port as usize, symbol, 0, 1, &self.symbol_data)?;
            }
        }

        Ok(())
    }
}

/// Run the scenario and collect statistics
pub fn simulate(config: &SimulationConfig) -> Result<SimulationReport> {
    let scs = SubcarrierSpacing::from_numerology(config.numerology)
        .ok_or_else(|| anyhow!("Invalid numerology: {}", config.numerology))?;
    let nof_prb = config.nof_prb as usize;

    let base_request = SrsEstimatorConfiguration {
        slot: SlotPoint::new(config.numerology, 0, 0),
        resource: config.resource.clone(),
        ports: config.rx_ports.clone(),
        context: Some(SrsContext {
            sector_id: 0,
            rnti: Rnti::new(config.rnti),
        }),
    };
    SrsValidator::new(nof_prb)?.is_valid(&base_request)?;

    let logger = if config.csi_log.enabled {
        Some(Arc::new(CsiLogger::spawn(config.csi_log.clone())?))
    } else {
        None
    };

    let mut dependencies = SrsEstimatorDependencies::default();
    if let Some(logger) = &logger {
        dependencies = dependencies.with_csi_sink(logger.clone());
    }
    let mut estimator = GenericSrsEstimator::new(dependencies, nof_prb)?;

    let nof_grid_ports = config.rx_ports.iter().max().map_or(1, |&port| port as usize + 1);
    let mut grid = ResourceGrid::new(nof_grid_ports, config.nof_prb, CyclicPrefix::Normal)?;

    let noise_variance = convert_db_to_power(-config.snr_db);
    let delay = config.delay_ns * 1e-9;
    let mut synthesizer = SoundingSynthesizer::new(config.seed, noise_variance, grid.nof_subcarriers())?;
    let slots_per_frame = base_request.slot.slots_per_frame() as u32;

    info!(
        "Simulating {} SRS occasions: {} PRB, {} rx ports, {} tx ports, SNR {} dB, delay {} ns",
        config.occasions,
        config.nof_prb,
        config.rx_ports.len(),
        config.resource.nof_antenna_ports,
        config.snr_db,
        config.delay_ns
    );

    let mut noise_sum = 0.0f64;
    let mut ta_error_sum = 0.0f64;

    for occasion in 0..config.occasions {
        let mut request = base_request.clone();
        request.slot = SlotPoint::new(
            config.numerology,
            ((occasion / slots_per_frame) % 1024) as u16,
            (occasion % slots_per_frame) as u16,
        );

        let channel = synthesizer.draw_channel(request.ports.len(), request.resource.nof_antenna_ports.value());
        grid.clear();
        synthesizer.fill(&mut grid, &request, &channel, scs, delay)?;

        let result = estimator.estimate(&grid, &request);

        let ta_error = result.time_alignment.time_alignment - delay;
        noise_sum += result.noise_variance as f64;
        ta_error_sum += ta_error.abs();

        info!(
            "Occasion {} slot {}: rsrp={:.1}dB epre={:.1}dB noise_var={:.3e} ta={:.1}ns",
            occasion,
            request.slot,
            result.rsrp_db,
            result.epre_db,
            result.noise_variance,
            result.time_alignment.time_alignment * 1e9
        );
        debug!("Channel matrix: {:?}", result.channel_matrix.to_array());
    }

    let (records_written, records_dropped) = match &logger {
        Some(logger) => {
            logger.shutdown();
            (logger.records_written(), logger.records_dropped())
        }
        None => (0, 0),
    };

    let occasions = config.occasions.max(1) as f64;
    Ok(SimulationReport {
        occasions: config.occasions,
        expected_noise_variance: noise_variance,
        mean_noise_variance: (noise_sum / occasions) as f32,
        mean_ta_error_ns: ta_error_sum / occasions * 1e9,
        records_written,
        records_dropped,
    })
}

/// `simulate` subcommand
pub fn run(config: &SimulationConfig) -> Result<()> {
    let report = simulate(config)?;

    info!(
        "Noise variance: estimated {:.3e}, injected {:.3e}",
        report.mean_noise_variance, report.expected_noise_variance
    );
    info!("Mean time alignment error: {:.2} ns", report.mean_ta_error_ns);
    if config.csi_log.enabled {
        info!(
            "CSI records written: {}, dropped: {}",
            report.records_written, report.records_dropped
        );
    }

    Ok(())
}
