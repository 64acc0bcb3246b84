//! Linear phase compensation with a complex exponential lookup table

use num_complex::Complex32;
use std::f32::consts::TAU;
use std::sync::Arc;

/// Table of exp(j·2π·i/size) for i in 0..size
#[derive(Debug, Clone)]
pub struct ComplexExpTable {
    table: Vec<Complex32>,
}

impl ComplexExpTable {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "Table size must be positive");
        let table = (0..size)
            .map(|i| {
                let phase = std::f64::consts::TAU * i as f64 / size as f64;
                Complex32::new(phase.cos() as f32, phase.sin() as f32)
            })
            .collect();
        Self { table }
    }

    pub fn size(&self) -> usize {
        self.table.len()
    }

    /// Table entry closest to the phase `phase` in radians
    pub fn index_of(&self, phase: f32) -> usize {
        let size = self.table.len() as i64;
        ((self.table.len() as f32 * phase / TAU).round() as i64).rem_euclid(size) as usize
    }

    pub fn get(&self, index: usize) -> Complex32 {
        self.table[index]
    }

    /// Write the table entries selected by `indices` into `out`
    pub fn generate(&self, out: &mut [Complex32], indices: &[usize]) {
        for (value, &index) in out.iter_mut().zip(indices) {
            *value = self.table[index];
        }
    }
}

/// Multiplies sequences by exp(j·(n·phase_per_subcarrier + phase_offset))
pub struct PhaseCompensator {
    table: Arc<ComplexExpTable>,
    phase_indices: Vec<usize>,
    cexp: Vec<Complex32>,
}

impl PhaseCompensator {
    /// Compensator for sequences of up to `max_length` elements
    pub fn new(table: Arc<ComplexExpTable>, max_length: usize) -> Self {
        Self {
            table,
            phase_indices: vec![0; max_length],
            cexp: vec![Complex32::new(0.0, 0.0); max_length],
        }
    }

    pub fn compensate(&mut self, sequence: &mut [Complex32], phase_per_subcarrier: f32, phase_offset: f32) {
        let len = sequence.len();
        assert!(
            len <= self.phase_indices.len(),
            "Sequence of {} elements exceeds the compensator capacity of {}",
            len,
            self.phase_indices.len()
        );

        let indices = &mut self.phase_indices[..len];
        for (n, index) in indices.iter_mut().enumerate() {
            *index = self.table.index_of(n as f32 * phase_per_subcarrier + phase_offset);
        }

        let cexp = &mut self.cexp[..len];
        self.table.generate(cexp, indices);

        for (value, rotation) in sequence.iter_mut().zip(cexp.iter()) {
            *value *= *rotation;
        }
    }
}
