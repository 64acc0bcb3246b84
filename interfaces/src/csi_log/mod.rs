//! SRS Channel-State Information Log
//! 
//! Best-effort capture of post-compensation per-tone channel estimates. The
//! estimator only sees the [`CsiSink`] trait; the host pipeline owns the
//! [`CsiLogger`] service, which moves records off the real-time path and into
//! per-RNTI rotating binary files.
//!
//! File layout (little-endian):
//!
//! ```text
//! header  : timestamp_us u64 | rnti u16 | rx_port u16 | tx_port u16 | num_tones u16
//! sample  : subcarrier u16 | symbol u16 | real f32 | imag f32      (num_tones times)
//! ```

pub mod sink;
pub mod record;
pub mod writer;
pub mod logger;
pub mod reader;
pub mod metadata;

pub use sink::{ChannelSnapshot, CsiSink};
pub use record::{CsiRecord, CsiRecordHeader, CsiSample};
pub use writer::CsiLogWriter;
pub use logger::CsiLogger;
pub use reader::CsiLogReader;
pub use metadata::{MetadataEntry, SessionEvent};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata file name inside the output directory
pub const METADATA_FILE_NAME: &str = "session_metadata.jsonl";

/// CSI log configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CsiLogConfig {
    /// Enable CSI collection
    #[serde(default)]
    pub enabled: bool,
    /// Output directory for binary logs and session metadata
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// File size that triggers a rotation, in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Number of records buffered between the PHY and the writer thread
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/var/tmp/srs_csi_log")
}

fn default_max_file_size() -> u64 {
    100 * 1024 * 1024  // 100 MB
}

fn default_queue_size() -> usize {
    4096
}

impl Default for CsiLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: default_output_dir(),
            max_file_size: default_max_file_size(),
            queue_size: default_queue_size(),
        }
    }
}
