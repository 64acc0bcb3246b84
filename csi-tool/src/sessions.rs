//! Session metadata summary

use anyhow::{Context, Result};
use interfaces::csi_log::metadata::read_sessions;
use interfaces::csi_log::{MetadataEntry, SessionEvent};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Capture history of one UE
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UeSession {
    pub rnti: String,
    pub session_start: String,
    pub rotations: usize,
    pub files: Vec<String>,
}

/// One session per RNTI, ordered by session start
pub fn summarize(sessions: &BTreeMap<u16, Vec<MetadataEntry>>) -> Vec<UeSession> {
    let mut summary: Vec<UeSession> = sessions
        .iter()
        .map(|(rnti, entries)| {
            let session_start = entries
                .iter()
                .find(|entry| entry.event == SessionEvent::SessionStart)
                .or_else(|| entries.first())
                .map(|entry| entry.timestamp.clone())
                .unwrap_or_default();

            UeSession {
                rnti: format!("0x{:04x}", rnti),
                session_start,
                rotations: entries
                    .iter()
                    .filter(|entry| entry.event == SessionEvent::FileRotation)
                    .count(),
                files: entries.iter().map(|entry| entry.file.clone()).collect(),
            }
        })
        .collect();

    summary.sort_by(|a, b| a.session_start.cmp(&b.session_start).then_with(|| a.rnti.cmp(&b.rnti)));
    summary
}

/// `sessions` subcommand
pub fn run(metadata: &Path, export: Option<&Path>) -> Result<()> {
    let file = File::open(metadata).with_context(|| format!("Failed to open {}", metadata.display()))?;
    let sessions = summarize(&read_sessions(file)?);

    info!("Found {} UE sessions", sessions.len());
    for session in &sessions {
        println!("RNTI {}", session.rnti);
        println!("  Session start: {}", session.session_start);
        println!("  File rotations: {}", session.rotations);
        for file in &session.files {
            println!("    {}", file);
        }
    }

    if let Some(path) = export {
        let out = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(out);
        serde_json::to_writer_pretty(&mut writer, &sessions)?;
        writer.flush()?;
        info!("Exported session list to {}", path.display());
    }

    Ok(())
}
