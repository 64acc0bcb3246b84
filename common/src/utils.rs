//! Common Utilities
//! 
//! Provides utility functions used across the uplink processing chain

/// Number of subcarriers per resource block
pub const NOF_SUBCARRIERS_PER_RB: usize = 12;

/// Convert a linear power ratio to decibels
pub fn convert_power_to_db(power: f32) -> f32 {
    10.0 * power.log10()
}

/// Convert decibels to a linear power ratio
pub fn convert_db_to_power(db: f32) -> f32 {
    10.0_f32.powf(db / 10.0)
}

/// Check whether a number is prime
pub fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut i = 3;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

/// Largest prime strictly lower than `n`
pub fn prev_prime(n: usize) -> Option<usize> {
    (2..n).rev().find(|&k| is_prime(k))
}
