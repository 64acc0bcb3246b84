//! Protocol Stack Layers Library
//! 
//! This crate implements the uplink physical-layer signal processors of the
//! gNodeB according to 3GPP Release 16.

pub mod phy;

use thiserror::Error;

/// Common errors for protocol layers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
