//! Sequential reader of binary CSI logs

use super::record::{CsiRecord, CsiRecordHeader, HEADER_SIZE};
use crate::InterfaceError;
use std::io::{ErrorKind, Read};

/// Iterates over the records of a CSI log
pub struct CsiLogReader<R: Read> {
    inner: R,
    offset: u64,
    finished: bool,
}

impl<R: Read> CsiLogReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            finished: false,
        }
    }

    /// Byte offset of the next record
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next record, `Ok(None)` on a clean end of file
    pub fn next_record(&mut self) -> Result<Option<CsiRecord>, InterfaceError> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        let read = self.fill(&mut header_bytes)?;
        if read == 0 {
            return Ok(None);
        }
        if read < HEADER_SIZE {
            return Err(InterfaceError::Truncated {
                expected: HEADER_SIZE,
                actual: read,
            });
        }

        let header = CsiRecordHeader::decode(&mut &header_bytes[..]).map_err(|e| match e {
            InterfaceError::InvalidRecord(msg) => {
                InterfaceError::InvalidRecord(format!("{} at offset {}", msg, self.offset))
            }
            other => other,
        })?;

        let mut payload = vec![0u8; header.payload_len()];
        let read = self.fill(&mut payload)?;
        if read < payload.len() {
            return Err(InterfaceError::Truncated {
                expected: payload.len(),
                actual: read,
            });
        }

        self.offset += (HEADER_SIZE + payload.len()) as u64;
        CsiRecord::decode_payload(header, &mut &payload[..]).map(Some)
    }

    /// Read until `buf` is full or the input ends
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, InterfaceError> {
        let mut total = 0;
        while total < buf.len() {
            match self.inner.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(total)
    }
}

impl<R: Read> Iterator for CsiLogReader<R> {
    type Item = Result<CsiRecord, InterfaceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csi_log::record::{CsiSample, SAMPLE_SIZE};
    use bytes::BytesMut;

    fn record(rnti: u16, num_tones: u16) -> CsiRecord {
        CsiRecord {
            header: CsiRecordHeader { timestamp_us: 1_000, rnti, rx_port: 0, tx_port: 1, num_tones },
            samples: (0..num_tones)
                .map(|i| CsiSample { subcarrier: i * 4, symbol: 12, re: 1.0, im: i as f32 })
                .collect(),
        }
    }

    #[test]
    fn test_reads_consecutive_records() {
        let mut buf = BytesMut::new();
        record(1, 3).encode(&mut buf);
        record(2, 5).encode(&mut buf);

        let mut reader = CsiLogReader::new(&buf[..]);
        assert_eq!(reader.next_record().unwrap().unwrap(), record(1, 3));
        assert_eq!(reader.offset(), (HEADER_SIZE + 3 * SAMPLE_SIZE) as u64);
        assert_eq!(reader.next_record().unwrap().unwrap(), record(2, 5));
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_truncated_tail_is_reported_once() {
        let mut buf = BytesMut::new();
        record(1, 3).encode(&mut buf);
        record(2, 5).encode(&mut buf);
        buf.truncate(buf.len() - 1);

        let results: Vec<_> = CsiLogReader::new(&buf[..]).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(InterfaceError::Truncated { .. })));
    }

    #[test]
    fn test_partial_header() {
        let bytes = [0u8; 7];
        let mut reader = CsiLogReader::new(&bytes[..]);
        assert!(matches!(
            reader.next_record(),
            Err(InterfaceError::Truncated { expected: HEADER_SIZE, actual: 7 })
        ));
    }
}
