//! Low-PAPR sequence generation
//! 
//! Implements the cyclically shifted Zadoff-Chu based sequences
//! r^(α)_(u,v)(n) of 3GPP TS 38.211 Section 5.2.2 for lengths of at least
//! 36 subcarriers.

use common::utils::prev_prime;
use num_complex::Complex32;
use std::f64::consts::PI;

/// Minimum sequence length supported by the Zadoff-Chu construction
pub const MIN_SEQUENCE_LENGTH: usize = 36;

/// Sounding pilot sequence source
pub trait SrsSequenceGenerator: Send {
    /// Fill `sequence` with the pilot of group `u`, base sequence `v` and
    /// cyclic shift `n_cs` out of `n_cs_max`
    fn generate(&self, sequence: &mut [Complex32], u: u32, v: u32, n_cs: u32, n_cs_max: u32);
}

/// Zadoff-Chu based low-PAPR sequence generator
#[derive(Debug, Clone, Copy, Default)]
pub struct LowPaprSequenceGenerator;

impl LowPaprSequenceGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl SrsSequenceGenerator for LowPaprSequenceGenerator {
    fn generate(&self, sequence: &mut [Complex32], u: u32, v: u32, n_cs: u32, n_cs_max: u32) {
        let length = sequence.len();
        assert!(
            length >= MIN_SEQUENCE_LENGTH,
            "Sequence length {} is below the minimum of {}",
            length,
            MIN_SEQUENCE_LENGTH
        );
        assert!(n_cs < n_cs_max, "Cyclic shift {} out of range 0..{}", n_cs, n_cs_max);

        let n_zc = prev_prime(length).expect("lengths above 2 have a smaller prime") as u64;

        // Root index q from the group and base sequence numbers
        let q_bar = n_zc as f64 * (u + 1) as f64 / 31.0;
        let mut q = (q_bar + 0.5).floor() as i64;
        if v != 0 {
            if (2.0 * q_bar).floor() as i64 % 2 == 0 {
                q += v as i64;
            } else {
                q -= v as i64;
            }
        }
        let q = q.rem_euclid(2 * n_zc as i64) as u64;

        for (n, value) in sequence.iter_mut().enumerate() {
            let m = n as u64 % n_zc;
            // Phases reduced in integer arithmetic to stay exact for long sequences
            let zc_index = (q * m % (2 * n_zc)) * (m + 1) % (2 * n_zc);
            let shift_index = (n_cs as u64 * n as u64) % n_cs_max as u64;

            let phase = -PI * zc_index as f64 / n_zc as f64
                + 2.0 * PI * shift_index as f64 / n_cs_max as f64;
            *value = Complex32::from_polar(1.0, phase as f32);
        }
    }
}
