//! Binary CSI record codec

use super::sink::ChannelSnapshot;
use crate::InterfaceError;
use bytes::{Buf, BufMut};

/// Size of the record header in bytes
pub const HEADER_SIZE: usize = 16;

/// Size of one per-tone sample in bytes
pub const SAMPLE_SIZE: usize = 12;

/// Upper bound on tones per record accepted by the decoder
pub const MAX_TONES_PER_RECORD: u16 = 10_000;

/// Record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsiRecordHeader {
    /// Microseconds since the Unix epoch
    pub timestamp_us: u64,
    pub rnti: u16,
    pub rx_port: u16,
    pub tx_port: u16,
    pub num_tones: u16,
}

impl CsiRecordHeader {
    /// Write the header
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.timestamp_us);
        buf.put_u16_le(self.rnti);
        buf.put_u16_le(self.rx_port);
        buf.put_u16_le(self.tx_port);
        buf.put_u16_le(self.num_tones);
    }

    /// Read and sanity-check a header
    pub fn decode(buf: &mut impl Buf) -> Result<Self, InterfaceError> {
        if buf.remaining() < HEADER_SIZE {
            return Err(InterfaceError::Truncated {
                expected: HEADER_SIZE,
                actual: buf.remaining(),
            });
        }

        let header = Self {
            timestamp_us: buf.get_u64_le(),
            rnti: buf.get_u16_le(),
            rx_port: buf.get_u16_le(),
            tx_port: buf.get_u16_le(),
            num_tones: buf.get_u16_le(),
        };

        if header.num_tones == 0 || header.num_tones > MAX_TONES_PER_RECORD {
            return Err(InterfaceError::InvalidRecord(format!(
                "suspicious tone count {}",
                header.num_tones
            )));
        }

        Ok(header)
    }

    /// Number of payload bytes following the header
    pub fn payload_len(&self) -> usize {
        self.num_tones as usize * SAMPLE_SIZE
    }
}

/// Channel estimate of a single tone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CsiSample {
    pub subcarrier: u16,
    pub symbol: u16,
    pub re: f32,
    pub im: f32,
}

impl CsiSample {
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u16_le(self.subcarrier);
        buf.put_u16_le(self.symbol);
        buf.put_f32_le(self.re);
        buf.put_f32_le(self.im);
    }

    pub fn decode(buf: &mut impl Buf) -> Self {
        Self {
            subcarrier: buf.get_u16_le(),
            symbol: buf.get_u16_le(),
            re: buf.get_f32_le(),
            im: buf.get_f32_le(),
        }
    }

    /// Magnitude of the estimate
    pub fn magnitude(&self) -> f32 {
        self.re.hypot(self.im)
    }

    /// Phase of the estimate in degrees
    pub fn phase_deg(&self) -> f32 {
        self.im.atan2(self.re).to_degrees()
    }
}

/// One SRS occasion for one port pair
#[derive(Debug, Clone, PartialEq)]
pub struct CsiRecord {
    pub header: CsiRecordHeader,
    pub samples: Vec<CsiSample>,
}

impl CsiRecord {
    /// Encoded size of a snapshot
    pub fn encoded_len(snapshot: &ChannelSnapshot<'_>) -> usize {
        HEADER_SIZE + snapshot.tones.len() * SAMPLE_SIZE
    }

    /// Serialize a snapshot straight into `buf`
    pub fn encode_snapshot(snapshot: &ChannelSnapshot<'_>, timestamp_us: u64, buf: &mut impl BufMut) {
        let header = CsiRecordHeader {
            timestamp_us,
            rnti: snapshot.rnti.value(),
            rx_port: snapshot.rx_port,
            tx_port: snapshot.tx_port,
            num_tones: snapshot.tones.len() as u16,
        };
        header.encode(buf);

        for (index, tone) in snapshot.tones.iter().enumerate() {
            CsiSample {
                subcarrier: snapshot.subcarrier(index) as u16,
                symbol: snapshot.symbol,
                re: tone.re,
                im: tone.im,
            }
            .encode(buf);
        }
    }

    /// Serialize the record
    pub fn encode(&self, buf: &mut impl BufMut) {
        self.header.encode(buf);
        for sample in &self.samples {
            sample.encode(buf);
        }
    }

    /// Decode one complete record
    pub fn decode(buf: &mut impl Buf) -> Result<Self, InterfaceError> {
        let header = CsiRecordHeader::decode(buf)?;
        Self::decode_payload(header, buf)
    }

    /// Decode the samples that follow an already decoded header
    pub fn decode_payload(header: CsiRecordHeader, buf: &mut impl Buf) -> Result<Self, InterfaceError> {
        let expected = header.payload_len();
        if buf.remaining() < expected {
            return Err(InterfaceError::Truncated {
                expected,
                actual: buf.remaining(),
            });
        }

        let samples = (0..header.num_tones)
            .map(|_| CsiSample::decode(buf))
            .collect();

        Ok(Self { header, samples })
    }
}
