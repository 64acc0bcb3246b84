//! Channel snapshot sink

use common::types::Rnti;
use num_complex::Complex32;

/// Post-compensation channel estimate of one (receive port, transmit port) pair
#[derive(Debug, Clone, Copy)]
pub struct ChannelSnapshot<'a> {
    /// UE the sounding occasion belongs to
    pub rnti: Rnti,
    /// Receive port index
    pub rx_port: u16,
    /// Transmit antenna port index
    pub tx_port: u16,
    /// First OFDM symbol carrying the pilots
    pub symbol: u16,
    /// Subcarrier of the first tone
    pub initial_subcarrier: u32,
    /// Distance between consecutive tones, in subcarriers
    pub comb_size: u32,
    /// One least-squares estimate per tone
    pub tones: &'a [Complex32],
}

impl ChannelSnapshot<'_> {
    /// Grid subcarrier carrying tone `index`
    pub fn subcarrier(&self, index: usize) -> u32 {
        self.initial_subcarrier + index as u32 * self.comb_size
    }
}

/// Observer of per-tone channel estimates.
///
/// Implementations must return promptly and must not fail: whatever happens
/// inside `notify` is invisible to the caller.
pub trait CsiSink: Send + Sync {
    /// Receive one snapshot
    fn notify(&self, snapshot: &ChannelSnapshot<'_>);
}
