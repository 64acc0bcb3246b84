//! Non-blocking CSI logging service
//!
//! The PHY thread encodes each snapshot and hands it to a bounded queue. A
//! dedicated writer thread drains the queue into a [`CsiLogWriter`]. When the
//! queue is full the record is dropped and counted; nothing ever blocks the
//! caller of [`CsiSink::notify`].

use super::record::CsiRecord;
use super::sink::{ChannelSnapshot, CsiSink};
use super::writer::CsiLogWriter;
use super::CsiLogConfig;
use crate::InterfaceError;
use bytes::{Bytes, BytesMut};
use common::types::Rnti;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

/// Message from the PHY side to the writer thread
#[derive(Debug)]
enum CsiEvent {
    Record { rnti: Rnti, payload: Bytes },
    Shutdown,
}

/// Counters shared with the writer thread
#[derive(Debug, Default)]
struct CsiLogStats {
    written: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

/// CSI logging service owned by the host pipeline
pub struct CsiLogger {
    tx: mpsc::Sender<CsiEvent>,
    stats: Arc<CsiLogStats>,
    writer_handle: Mutex<Option<JoinHandle<()>>>,
}

impl CsiLogger {
    /// Create the writer and start its thread
    pub fn spawn(config: CsiLogConfig) -> Result<Self, InterfaceError> {
        if config.queue_size == 0 {
            return Err(InterfaceError::InvalidConfig(
                "queue_size must be positive".to_string(),
            ));
        }

        let writer = CsiLogWriter::new(config.clone())?;
        let (tx, rx) = mpsc::channel::<CsiEvent>(config.queue_size);
        let stats = Arc::new(CsiLogStats::default());

        let thread_stats = stats.clone();
        let writer_handle = std::thread::Builder::new()
            .name("csi-log".to_string())
            .spawn(move || Self::writer_loop(writer, rx, thread_stats))
            .map_err(|e| InterfaceError::InitializationFailed(format!(
                "Failed to spawn CSI writer thread: {}", e
            )))?;

        info!("CSI logger started (queue size {})", config.queue_size);

        Ok(Self {
            tx,
            stats,
            writer_handle: Mutex::new(Some(writer_handle)),
        })
    }

    fn writer_loop(mut writer: CsiLogWriter, mut rx: mpsc::Receiver<CsiEvent>, stats: Arc<CsiLogStats>) {
        while let Some(event) = rx.blocking_recv() {
            match event {
                CsiEvent::Record { rnti, payload } => match writer.write(rnti, &payload) {
                    Ok(()) => {
                        stats.written.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        stats.failed.fetch_add(1, Ordering::Relaxed);
                        warn!("Dropping CSI record for RNTI {}: {}", rnti, e);
                    }
                },
                CsiEvent::Shutdown => break,
            }
        }

        debug!("CSI writer thread finished ({} sessions)", writer.nof_sessions());
    }

    /// Records written to disk
    pub fn records_written(&self) -> u64 {
        self.stats.written.load(Ordering::Relaxed)
    }

    /// Records discarded because the queue was full or closed
    pub fn records_dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }

    /// Records that failed to be written
    pub fn records_failed(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }

    /// Drain pending records and stop the writer thread.
    ///
    /// Must not be called from within an async runtime.
    pub fn shutdown(&self) {
        let handle = match self.writer_handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        let Some(handle) = handle else {
            return;
        };

        if self.tx.blocking_send(CsiEvent::Shutdown).is_err() {
            warn!("CSI writer thread already gone");
        }
        if handle.join().is_err() {
            warn!("CSI writer thread panicked");
        }

        info!(
            "CSI logger stopped: {} written, {} dropped, {} failed",
            self.records_written(),
            self.records_dropped(),
            self.records_failed()
        );
    }
}

/// Dropping the logger drains the queue like [`CsiLogger::shutdown`], so it
/// must not be dropped from within an async runtime either.
impl Drop for CsiLogger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl CsiSink for CsiLogger {
    fn notify(&self, snapshot: &ChannelSnapshot<'_>) {
        let timestamp_us = chrono::Utc::now().timestamp_micros().max(0) as u64;
        let mut buf = BytesMut::with_capacity(CsiRecord::encoded_len(snapshot));
        CsiRecord::encode_snapshot(snapshot, timestamp_us, &mut buf);

        let event = CsiEvent::Record {
            rnti: snapshot.rnti,
            payload: buf.freeze(),
        };

        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
