//! Binary CSI log to CSV conversion

use anyhow::{Context, Result};
use chrono::DateTime;
use interfaces::csi_log::{CsiLogReader, CsiRecord};
use interfaces::InterfaceError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{info, warn};

const CSV_HEADER: &str =
    "entry_num,timestamp_us,timestamp_readable,rnti,rx_port,tx_port,num_tones,subcarrier,symbol,real,imag,magnitude,phase_deg";

/// Totals of one conversion
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConversionSummary {
    /// Records converted
    pub occasions: u64,
    /// CSV rows written
    pub samples: u64,
    /// Byte offset of the first unreadable record, if the log ended early
    pub stopped_at: Option<u64>,
}

impl ConversionSummary {
    pub fn average_tones(&self) -> f64 {
        if self.occasions == 0 {
            0.0
        } else {
            self.samples as f64 / self.occasions as f64
        }
    }
}

/// Convert every readable record of `input` into CSV rows on `output`.
///
/// A corrupt or truncated record ends the conversion; the rows written so far
/// are kept.
pub fn convert(input: impl Read, mut output: impl Write) -> Result<ConversionSummary, InterfaceError> {
    let mut reader = CsiLogReader::new(input);
    let mut summary = ConversionSummary::default();

    writeln!(output, "{}", CSV_HEADER)?;

    loop {
        let offset = reader.offset();
        let record = match reader.next_record() {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(err) => {
                warn!("Stopping at offset {}: {}", offset, err);
                summary.stopped_at = Some(offset);
                break;
            }
        };

        summary.occasions += 1;
        summary.samples += write_record(&mut output, summary.occasions, &record)?;
    }

    output.flush()?;
    Ok(summary)
}

fn write_record(output: &mut impl Write, entry_num: u64, record: &CsiRecord) -> Result<u64, InterfaceError> {
    let header = &record.header;
    let readable = DateTime::from_timestamp_micros(header.timestamp_us as i64)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.6f").to_string())
        .unwrap_or_default();

    for sample in &record.samples {
        writeln!(
            output,
            "{},{},{},0x{:04x},{},{},{},{},{},{:.6},{:.6},{:.6},{:.2}",
            entry_num,
            header.timestamp_us,
            readable,
            header.rnti,
            header.rx_port,
            header.tx_port,
            header.num_tones,
            sample.subcarrier,
            sample.symbol,
            sample.re,
            sample.im,
            sample.magnitude(),
            sample.phase_deg()
        )?;
    }

    Ok(record.samples.len() as u64)
}

/// `bin2csv` subcommand
pub fn run(input: &Path, output: &Path) -> Result<()> {
    let file = File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    let out = File::create(output).with_context(|| format!("Failed to create {}", output.display()))?;

    let summary = convert(BufReader::new(file), BufWriter::new(out))?;

    info!("Converted {} SRS occasions ({} samples)", summary.occasions, summary.samples);
    info!("Average tones per occasion: {:.1}", summary.average_tones());
    if let Some(offset) = summary.stopped_at {
        warn!("Log ends with an unreadable record at byte {}", offset);
    }

    Ok(())
}
