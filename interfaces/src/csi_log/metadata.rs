//! Session metadata (JSON lines)

use crate::InterfaceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

/// Metadata event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    /// First file of an RNTI was opened
    SessionStart,
    /// A new file replaced a full one
    FileRotation,
}

/// One line of `session_metadata.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub rnti: u16,
    /// File name without directory
    pub file: String,
    /// Local time, `%Y-%m-%d %H:%M:%S`
    pub timestamp: String,
    pub event: SessionEvent,
}

impl MetadataEntry {
    /// Append the entry as one JSON line
    pub fn append_to(&self, path: &Path) -> Result<(), InterfaceError> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        file.write_all(&line)?;
        Ok(())
    }
}

/// Read all entries, grouped by RNTI in ascending order. Blank lines are skipped.
pub fn read_sessions(reader: impl Read) -> Result<BTreeMap<u16, Vec<MetadataEntry>>, InterfaceError> {
    let mut sessions: BTreeMap<u16, Vec<MetadataEntry>> = BTreeMap::new();

    for line in BufReader::new(reader).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: MetadataEntry = serde_json::from_str(&line)?;
        sessions.entry(entry.rnti).or_default().push(entry);
    }

    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_format() {
        let entry = MetadataEntry {
            rnti: 17921,
            file: "srs_csi_rnti_0x4601_20260108_203000_1.bin".to_string(),
            timestamp: "2026-01-08 20:30:00".to_string(),
            event: SessionEvent::SessionStart,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"rnti":17921,"file":"srs_csi_rnti_0x4601_20260108_203000_1.bin","timestamp":"2026-01-08 20:30:00","event":"session_start"}"#
        );
    }

    #[test]
    fn test_read_sessions_groups_by_rnti() {
        let text = concat!(
            r#"{"rnti":2,"file":"b_1.bin","timestamp":"2026-01-08 20:30:01","event":"session_start"}"#, "\n",
            "\n",
            r#"{"rnti":1,"file":"a_1.bin","timestamp":"2026-01-08 20:30:00","event":"session_start"}"#, "\n",
            r#"{"rnti":1,"file":"a_2.bin","timestamp":"2026-01-08 20:40:00","event":"file_rotation"}"#, "\n",
        );
        let sessions = read_sessions(text.as_bytes()).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[&1].len(), 2);
        assert_eq!(sessions[&1][1].event, SessionEvent::FileRotation);
        assert_eq!(sessions.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }
}
