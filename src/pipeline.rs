//! End-to-end proximity analysis: reproject, buffer, classify.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::crs::Crs;
use crate::error::{ProximityError, Result};
use crate::models::{ClassifiedStation, SiteCollection};
use crate::proximity::{build_buffers, classify, validate_radius, BufferSet};
use crate::reproject::reproject;

/// Substation buffer radius of the Belfast analysis, in metres
pub const DEFAULT_RADIUS: f64 = 200.0;

/// Analysis parameters, passed explicitly rather than baked into the core
#[derive(Debug, Clone)]
pub struct ProximityAnalysis {
    target_crs: Crs,
    radius: f64,
}

impl ProximityAnalysis {
    /// The target CRS must be projected, since the radius is a linear distance
    pub fn new(target_crs: Crs, radius: f64) -> Result<Self> {
        if target_crs.is_geographic() {
            return Err(ProximityError::UnitMismatch {
                operation: "proximity analysis",
                crs: target_crs,
            });
        }
        validate_radius(radius)?;
        Ok(Self { target_crs, radius })
    }

    pub fn target_crs(&self) -> &Crs {
        &self.target_crs
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Run the full pipeline over both collections.
    ///
    /// Either every station is classified or an error is returned; there is
    /// no partial output.
    pub fn run(
        &self,
        substations: SiteCollection,
        stations: SiteCollection,
    ) -> Result<AnalysisOutput> {
        for collection in [&substations, &stations] {
            if collection.is_empty() {
                return Err(ProximityError::DataLoad(format!(
                    "no {} to analyse",
                    collection.layer
                )));
            }
        }

        info!(
            "Reprojecting {} substations and {} charging stations into {}",
            substations.len(),
            stations.len(),
            self.target_crs
        );
        let substations = reproject(substations, &self.target_crs)?;
        let stations = reproject(stations, &self.target_crs)?;

        let buffers = build_buffers(&substations, self.radius)?;
        let classified = classify(&stations, &buffers)?;

        Ok(AnalysisOutput {
            crs: self.target_crs.clone(),
            substations,
            buffers,
            stations: classified,
        })
    }
}

impl Default for ProximityAnalysis {
    fn default() -> Self {
        Self {
            target_crs: Crs::web_mercator(),
            radius: DEFAULT_RADIUS,
        }
    }
}

/// Everything a downstream renderer needs, all in the analysis CRS
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub crs: Crs,
    pub substations: SiteCollection,
    pub buffers: BufferSet,
    pub stations: Vec<ClassifiedStation>,
}

impl AnalysisOutput {
    pub fn inside(&self) -> impl Iterator<Item = &ClassifiedStation> {
        self.stations.iter().filter(|c| c.within_buffer)
    }

    pub fn outside(&self) -> impl Iterator<Item = &ClassifiedStation> {
        self.stations.iter().filter(|c| !c.within_buffer)
    }

    pub fn summary(&self) -> AnalysisSummary {
        let within_buffer = self.inside().count();
        AnalysisSummary {
            crs: self.crs.to_string(),
            radius: self.buffers.radius(),
            substations: self.substations.len(),
            charging_stations: self.stations.len(),
            within_buffer,
            outside_buffer: self.stations.len() - within_buffer,
            coverage_bounds: self
                .buffers
                .coverage_bounds()
                .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]),
            generated_at: Utc::now(),
        }
    }
}

/// Run report written next to the exported layers
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub crs: String,
    pub radius: f64,
    pub substations: usize,
    pub charging_stations: usize,
    pub within_buffer: usize,
    pub outside_buffer: usize,
    /// [min_x, min_y, max_x, max_y] of all buffers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_bounds: Option<[f64; 4]>,
    pub generated_at: DateTime<Utc>,
}
