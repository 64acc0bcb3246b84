//! Diagnostic Interfaces Library
//! 
//! This crate provides the side-observer interfaces of the uplink PHY: the
//! channel-state snapshot sink and the binary CSI log that backs it.

pub mod csi_log;

use thiserror::Error;

/// Interface errors
#[derive(Error, Debug)]
pub enum InterfaceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    
    #[error("Truncated record: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
}
