//! Substation proximity analysis for EV charging stations.
//!
//! Loads substation and charging station point layers, reprojects them into a
//! common planar CRS, builds a fixed-radius buffer around every substation and
//! flags each charging station as inside or outside the buffer set.

pub mod crs;
pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod proximity;
pub mod reproject;

pub use crs::{Crs, CrsKind};
pub use error::{ProximityError, Result};
pub use models::{ClassifiedStation, Site, SiteCollection, SiteLayer};
pub use pipeline::{AnalysisOutput, AnalysisSummary, ProximityAnalysis};
