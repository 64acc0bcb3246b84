//! Time alignment estimation from frequency-domain channel estimates
//! 
//! The per-receive-port estimates are transformed to the delay domain with a
//! zero-padded inverse DFT; the delay of the strongest combined tap within the
//! unambiguous window is the time alignment.

use common::types::SubcarrierSpacing;
use ndarray::ArrayView2;
use rustfft::{FftPlanner, num_complex::Complex32, Fft};
use std::sync::Arc;
use tracing::debug;

/// Default delay-domain resolution in DFT points
pub const DEFAULT_DFT_SIZE: usize = 4096;

/// Time alignment measurement in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeAlignmentMeasurement {
    /// Estimated time alignment
    pub time_alignment: f64,
    /// Measurement resolution
    pub resolution: f64,
    /// Smallest measurable value
    pub min: f64,
    /// Largest measurable value
    pub max: f64,
}

/// Delay estimator over a matrix of channel estimates `[rx port, subcarrier]`
pub trait TimeAlignmentEstimator: Send {
    /// `stride` is the spacing in subcarriers between consecutive estimates and
    /// `max_ta` the largest absolute delay to search for
    fn estimate(
        &mut self,
        lse: ArrayView2<'_, Complex32>,
        stride: usize,
        scs: SubcarrierSpacing,
        max_ta: f64,
    ) -> TimeAlignmentMeasurement;
}

/// IDFT based time alignment estimator
pub struct DftTimeAlignmentEstimator {
    dft_size: usize,
    idft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex32>,
    scratch: Vec<Complex32>,
    power: Vec<f32>,
}

impl DftTimeAlignmentEstimator {
    /// Create an estimator with a DFT of `dft_size` points
    pub fn new(dft_size: usize) -> Self {
        assert!(dft_size >= 2 && dft_size.is_power_of_two(), "DFT size {} must be a power of two", dft_size);

        let mut fft_planner = FftPlanner::new();
        let idft = fft_planner.plan_fft_inverse(dft_size);
        let scratch = vec![Complex32::new(0.0, 0.0); idft.get_inplace_scratch_len()];

        debug!("Time alignment estimator initialized with {} point IDFT", dft_size);

        Self {
            dft_size,
            idft,
            buffer: vec![Complex32::new(0.0, 0.0); dft_size],
            scratch,
            power: vec![0.0; dft_size],
        }
    }

    pub fn dft_size(&self) -> usize {
        self.dft_size
    }
}

impl Default for DftTimeAlignmentEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_DFT_SIZE)
    }
}

impl TimeAlignmentEstimator for DftTimeAlignmentEstimator {
    fn estimate(
        &mut self,
        lse: ArrayView2<'_, Complex32>,
        stride: usize,
        scs: SubcarrierSpacing,
        max_ta: f64,
    ) -> TimeAlignmentMeasurement {
        assert!(
            lse.ncols() <= self.dft_size,
            "{} channel estimates exceed the DFT size of {}",
            lse.ncols(),
            self.dft_size
        );

        // Combine the delay profiles of all receive ports non-coherently
        self.power.fill(0.0);
        for row in lse.rows() {
            self.buffer.fill(Complex32::new(0.0, 0.0));
            for (dst, src) in self.buffer.iter_mut().zip(row.iter()) {
                *dst = *src;
            }

            self.idft.process_with_scratch(&mut self.buffer, &mut self.scratch);

            for (power, value) in self.power.iter_mut().zip(self.buffer.iter()) {
                *power += value.norm_sqr();
            }
        }

        let resolution = 1.0 / (self.dft_size as f64 * stride as f64 * scs.to_hz());
        let max_index = ((max_ta / resolution + 1e-9).floor().max(0.0) as usize).min(self.dft_size / 2 - 1);

        // Positive delays at the start of the buffer, negative ones wrap around
        let mut best_index: i64 = 0;
        let mut best_power = self.power[0];
        for index in 1..=max_index {
            if self.power[index] > best_power {
                best_power = self.power[index];
                best_index = index as i64;
            }
        }
        for index in (self.dft_size - max_index)..self.dft_size {
            if self.power[index] > best_power {
                best_power = self.power[index];
                best_index = index as i64 - self.dft_size as i64;
            }
        }

        TimeAlignmentMeasurement {
            time_alignment: best_index as f64 * resolution,
            resolution,
            min: -(max_index as f64) * resolution,
            max: max_index as f64 * resolution,
        }
    }
}
