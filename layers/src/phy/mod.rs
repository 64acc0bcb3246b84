//! Physical Layer (PHY) Submodules
//! 
//! This module contains the uplink sounding chain of the 5G NR physical layer
//! according to 3GPP TS 38.211 and TS 38.214.

pub mod resource_grid;
pub mod sequence;
pub mod tensor;
pub mod time_alignment;
pub mod srs;

// Re-export commonly used types
pub use resource_grid::{ResourceGrid, ResourceGridReader};
pub use sequence::{LowPaprSequenceGenerator, SrsSequenceGenerator};
pub use tensor::StaticTensor;
pub use time_alignment::{DftTimeAlignmentEstimator, TimeAlignmentEstimator, TimeAlignmentMeasurement};
pub use srs::{
    GenericSrsEstimator, SrsEstimator, SrsEstimatorConfiguration, SrsEstimatorDependencies,
    SrsEstimatorResult, SrsResourceConfiguration,
};
