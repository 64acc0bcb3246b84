//! Per-RNTI rotating file writer
//!
//! Files are opened for each record and closed right after, so the number of
//! identities seen never translates into open descriptors.

use super::metadata::{MetadataEntry, SessionEvent};
use super::{CsiLogConfig, METADATA_FILE_NAME};
use crate::InterfaceError;
use common::types::Rnti;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Output stream of one RNTI
#[derive(Debug)]
struct CsiStream {
    rnti: Rnti,
    session_start: String,
    file_counter: u32,
    current_size: u64,
    path: PathBuf,
}

impl CsiStream {
    fn new(rnti: Rnti, output_dir: &Path) -> Self {
        let session_start = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut stream = Self {
            rnti,
            session_start,
            file_counter: 0,
            current_size: 0,
            path: PathBuf::new(),
        };
        stream.advance_file(output_dir);
        stream
    }

    /// Point the stream at its next file
    fn advance_file(&mut self, output_dir: &Path) {
        self.file_counter += 1;
        self.current_size = 0;
        self.path = output_dir.join(format!(
            "srs_csi_rnti_0x{:04x}_{}_{}.bin",
            self.rnti.value(),
            self.session_start,
            self.file_counter
        ));
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn write(&mut self, payload: &[u8]) -> Result<(), InterfaceError> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(payload)?;
        self.current_size += payload.len() as u64;
        Ok(())
    }
}

/// Writes encoded CSI records into one rotating file set per RNTI
#[derive(Debug)]
pub struct CsiLogWriter {
    config: CsiLogConfig,
    metadata_path: PathBuf,
    streams: HashMap<Rnti, CsiStream>,
}

impl CsiLogWriter {
    /// Create a writer; the output directory is created if missing
    pub fn new(config: CsiLogConfig) -> Result<Self, InterfaceError> {
        if config.max_file_size == 0 {
            return Err(InterfaceError::InvalidConfig(
                "max_file_size must be positive".to_string(),
            ));
        }
        fs::create_dir_all(&config.output_dir)?;
        let metadata_path = config.output_dir.join(METADATA_FILE_NAME);

        info!("CSI log writing to {}", config.output_dir.display());

        Ok(Self {
            config,
            metadata_path,
            streams: HashMap::new(),
        })
    }

    /// Append one encoded record to the stream of `rnti`
    pub fn write(&mut self, rnti: Rnti, payload: &[u8]) -> Result<(), InterfaceError> {
        let output_dir = self.config.output_dir.as_path();
        let max_file_size = self.config.max_file_size;

        let stream = match self.streams.entry(rnti) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let stream = CsiStream::new(rnti, output_dir);
                debug!("Opening CSI session for RNTI {}", rnti);
                Self::record_event(&self.metadata_path, &stream, SessionEvent::SessionStart);
                entry.insert(stream)
            }
        };

        if stream.current_size > 0 && stream.current_size + payload.len() as u64 > max_file_size {
            stream.advance_file(output_dir);
            debug!("Rotating CSI log for RNTI {} to {}", rnti, stream.path.display());
            Self::record_event(&self.metadata_path, stream, SessionEvent::FileRotation);
        }

        stream.write(payload)
    }

    /// Current file of an RNTI
    pub fn current_file(&self, rnti: Rnti) -> Option<&Path> {
        self.streams.get(&rnti).map(|stream| stream.path.as_path())
    }

    /// Number of RNTIs seen so far
    pub fn nof_sessions(&self) -> usize {
        self.streams.len()
    }

    fn record_event(metadata_path: &Path, stream: &CsiStream, event: SessionEvent) {
        let entry = MetadataEntry {
            rnti: stream.rnti.value(),
            file: stream.file_name(),
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            event,
        };
        if let Err(e) = entry.append_to(metadata_path) {
            warn!("Failed to append CSI session metadata: {}", e);
        }
    }
}
