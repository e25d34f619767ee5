//! Error kinds for the proximity pipeline.
//!
//! Every error aborts the run. There is no partial-result mode: a charging
//! station either receives a definitive flag or the whole analysis fails.

use thiserror::Error;

use crate::crs::Crs;

#[derive(Debug, Error)]
pub enum ProximityError {
    /// Source collection missing, unreadable, malformed or empty
    #[error("failed to load data: {0}")]
    DataLoad(String),

    /// Missing/invalid CRS, or a coordinate the transform is undefined for
    #[error("projection failed: {0}")]
    Projection(String),

    /// A linear distance was requested in a degree-based CRS
    #[error("{operation} requires a projected CRS with linear units, got geographic {crs}")]
    UnitMismatch { operation: &'static str, crs: Crs },

    /// Two collections that must share a CRS do not
    #[error("CRS mismatch: expected {expected}, found {found}")]
    CrsMismatch { expected: Crs, found: Crs },

    #[error("buffer radius must be a positive finite number, got {0}")]
    InvalidRadius(f64),
}

pub type Result<T> = std::result::Result<T, ProximityError>;
