//! Resource Grid for 5G NR
//! 
//! Received frequency-domain resource elements of one slot, indexed by
//! receive port, OFDM symbol and subcarrier according to 3GPP TS 38.211

use crate::LayerError;
use common::types::CyclicPrefix;
use common::utils::NOF_SUBCARRIERS_PER_RB;
use num_complex::Complex32;
use ndarray::{s, Array3};
use tracing::{debug, warn};

/// Read access to a slot of resource elements
pub trait ResourceGridReader {
    /// Number of receive ports
    fn nof_ports(&self) -> usize;

    /// Number of subcarriers per OFDM symbol
    fn nof_subcarriers(&self) -> usize;

    /// Number of OFDM symbols per slot
    fn nof_symbols(&self) -> usize;

    /// Copy `symbols.len()` resource elements of `port` and `symbol`, starting
    /// at subcarrier `k_init` and taking one out of every `stride` subcarriers.
    ///
    /// # Panics
    ///
    /// Panics if the requested elements are outside the grid.
    fn get(&self, symbols: &mut [Complex32], port: usize, symbol: u8, k_init: usize, stride: usize);
}

/// Resource grid for one slot
#[derive(Debug, Clone)]
pub struct ResourceGrid {
    /// 3D grid: [ports, symbols, subcarriers]
    grid: Array3<Complex32>,
    /// Number of resource blocks
    num_rbs: u16,
    /// Number of symbols per slot
    symbols_per_slot: u8,
}

impl ResourceGrid {
    /// Create a new resource grid
    pub fn new(nof_ports: usize, num_rbs: u16, cp: CyclicPrefix) -> Result<Self, LayerError> {
        if nof_ports == 0 || num_rbs == 0 {
            return Err(LayerError::InvalidConfiguration(format!(
                "Resource grid needs at least one port and one RB (ports={}, rbs={})",
                nof_ports, num_rbs
            )));
        }

        let symbols_per_slot = cp.symbols_per_slot();
        let num_subcarriers = num_rbs as usize * NOF_SUBCARRIERS_PER_RB;

        debug!(
            "Creating resource grid with dimensions: ({}, {}, {})",
            nof_ports, symbols_per_slot, num_subcarriers
        );
        let grid = Array3::zeros((nof_ports, symbols_per_slot as usize, num_subcarriers));

        Ok(Self {
            grid,
            num_rbs,
            symbols_per_slot,
        })
    }

    /// Number of resource blocks
    pub fn num_rbs(&self) -> u16 {
        self.num_rbs
    }

    /// Clear the entire grid
    pub fn clear(&mut self) {
        self.grid.fill(Complex32::new(0.0, 0.0));
    }

    /// Clear a specific symbol on all ports
    pub fn clear_symbol(&mut self, symbol: u8) {
        if symbol >= self.symbols_per_slot {
            warn!("Attempting to clear invalid symbol {} (max: {})", symbol, self.symbols_per_slot - 1);
            return;
        }

        self.grid
            .slice_mut(s![.., symbol as usize, ..])
            .fill(Complex32::new(0.0, 0.0));
    }

    /// Map a resource element
    pub fn map_re(&mut self, port: usize, subcarrier: usize, symbol: u8, value: Complex32) -> Result<(), LayerError> {
        match self.grid.get_mut((port, symbol as usize, subcarrier)) {
            Some(elem) => {
                *elem = value;
                Ok(())
            }
            None => Err(LayerError::InvalidConfiguration(format!(
                "RE out of bounds: port={}, subcarrier={}, symbol={}",
                port, subcarrier, symbol
            ))),
        }
    }

    /// Map a comb-spaced sequence starting at subcarrier `k_init`
    pub fn put(
        &mut self,
        port: usize,
        symbol: u8,
        k_init: usize,
        stride: usize,
        values: &[Complex32],
    ) -> Result<(), LayerError> {
        let last = values.len().saturating_sub(1) * stride + k_init;
        if values.is_empty() || stride == 0 || last >= self.nof_subcarriers() {
            return Err(LayerError::InvalidConfiguration(format!(
                "Sequence of {} REs with stride {} from subcarrier {} does not fit in {} subcarriers",
                values.len(),
                stride,
                k_init,
                self.nof_subcarriers()
            )));
        }

        for (i, value) in values.iter().enumerate() {
            self.map_re(port, k_init + i * stride, symbol, *value)?;
        }
        Ok(())
    }

    /// Get resource element value
    pub fn get_re(&self, port: usize, subcarrier: usize, symbol: u8) -> Option<Complex32> {
        self.grid.get((port, symbol as usize, subcarrier)).copied()
    }
}

impl ResourceGridReader for ResourceGrid {
    fn nof_ports(&self) -> usize {
        self.grid.shape()[0]
    }

    fn nof_subcarriers(&self) -> usize {
        self.grid.shape()[2]
    }

    fn nof_symbols(&self) -> usize {
        self.symbols_per_slot as usize
    }

    fn get(&self, symbols: &mut [Complex32], port: usize, symbol: u8, k_init: usize, stride: usize) {
        let row = self.grid.slice(s![port, symbol as usize, ..]);
        let last = symbols.len().saturating_sub(1) * stride + k_init;
        assert!(
            last < row.len(),
            "Subcarrier {} is outside the grid of {} subcarriers",
            last,
            row.len()
        );

        for (i, out) in symbols.iter_mut().enumerate() {
            *out = row[k_init + i * stride];
        }
    }
}
