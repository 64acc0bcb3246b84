//! SRS estimation results

use super::{MAX_NOF_RX_PORTS, MAX_NOF_TX_PORTS};
use crate::phy::time_alignment::TimeAlignmentMeasurement;
use ndarray::Array2;
use num_complex::Complex32;
use std::ops::MulAssign;

/// Wideband channel matrix, one row per receive port and one column per
/// transmit port
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SrsChannelMatrix {
    coefficients: [Complex32; MAX_NOF_RX_PORTS * MAX_NOF_TX_PORTS],
    nof_rx_ports: usize,
    nof_tx_ports: usize,
}

impl SrsChannelMatrix {
    /// Zero matrix of the given shape
    pub fn new(nof_rx_ports: usize, nof_tx_ports: usize) -> Self {
        assert!(
            nof_rx_ports <= MAX_NOF_RX_PORTS && nof_tx_ports <= MAX_NOF_TX_PORTS,
            "Channel matrix of {}x{} exceeds {}x{}",
            nof_rx_ports,
            nof_tx_ports,
            MAX_NOF_RX_PORTS,
            MAX_NOF_TX_PORTS
        );
        Self {
            coefficients: [Complex32::new(0.0, 0.0); MAX_NOF_RX_PORTS * MAX_NOF_TX_PORTS],
            nof_rx_ports,
            nof_tx_ports,
        }
    }

    pub fn nof_rx_ports(&self) -> usize {
        self.nof_rx_ports
    }

    pub fn nof_tx_ports(&self) -> usize {
        self.nof_tx_ports
    }

    pub fn get_coefficient(&self, rx_port: usize, tx_port: usize) -> Complex32 {
        self.coefficients[self.index(rx_port, tx_port)]
    }

    pub fn set_coefficient(&mut self, value: Complex32, rx_port: usize, tx_port: usize) {
        let index = self.index(rx_port, tx_port);
        self.coefficients[index] = value;
    }

    /// Frobenius norm
    pub fn frobenius_norm(&self) -> f32 {
        self.coefficients().iter().map(|c| c.norm_sqr()).sum::<f32>().sqrt()
    }

    /// Copy of the matrix as `[rx port, tx port]`
    pub fn to_array(&self) -> Array2<Complex32> {
        Array2::from_shape_fn((self.nof_rx_ports, self.nof_tx_ports), |(rx, tx)| {
            self.get_coefficient(rx, tx)
        })
    }

    fn coefficients(&self) -> &[Complex32] {
        &self.coefficients[..self.nof_rx_ports * self.nof_tx_ports]
    }

    fn index(&self, rx_port: usize, tx_port: usize) -> usize {
        assert!(
            rx_port < self.nof_rx_ports && tx_port < self.nof_tx_ports,
            "Coefficient ({}, {}) outside a {}x{} matrix",
            rx_port,
            tx_port,
            self.nof_rx_ports,
            self.nof_tx_ports
        );
        rx_port * self.nof_tx_ports + tx_port
    }
}

impl MulAssign<f32> for SrsChannelMatrix {
    fn mul_assign(&mut self, scale: f32) {
        let len = self.nof_rx_ports * self.nof_tx_ports;
        for coefficient in &mut self.coefficients[..len] {
            *coefficient *= scale;
        }
    }
}

/// Output of one SRS estimation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SrsEstimatorResult {
    /// Channel coefficients normalised by the noise standard deviation
    pub channel_matrix: SrsChannelMatrix,
    /// Time alignment in seconds
    pub time_alignment: TimeAlignmentMeasurement,
    /// Noise variance per resource element
    pub noise_variance: f32,
    /// Average received energy per resource element in dB
    pub epre_db: f32,
    /// Average received power of the channel coefficients in dB
    pub rsrp_db: f32,
}
