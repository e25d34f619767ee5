//! Charging station classification against the substation buffer set.

use geo::Point;
use rayon::prelude::*;
use tracing::{debug, info};

use super::{BufferIndex, BufferSet};
use crate::error::{ProximityError, Result};
use crate::models::{ClassifiedStation, SiteCollection};

/// Flag every charging station as inside or outside the buffer set.
///
/// A station is inside when any buffer contains it (boundary inclusive). The
/// output preserves input order and the inputs are left untouched, so
/// repeated runs over the same data give identical results.
pub fn classify(stations: &SiteCollection, buffers: &BufferSet) -> Result<Vec<ClassifiedStation>> {
    if stations.crs.is_geographic() {
        return Err(ProximityError::UnitMismatch {
            operation: "classification",
            crs: stations.crs.clone(),
        });
    }
    if &stations.crs != buffers.crs() {
        return Err(ProximityError::CrsMismatch {
            expected: buffers.crs().clone(),
            found: stations.crs.clone(),
        });
    }

    if let Some(site) = stations.iter().find(|s| !is_finite(&s.location)) {
        return Err(ProximityError::Projection(format!(
            "{} '{}' has non-finite coordinates ({}, {})",
            stations.layer,
            site.id,
            site.location.x(),
            site.location.y()
        )));
    }

    let index = BufferIndex::build(buffers.buffers());
    if index.is_empty() {
        debug!("No substation buffers, every station is outside");
    } else {
        debug!(
            "Testing {} stations against {} indexed buffers",
            stations.len(),
            index.len()
        );
    }

    // Each test reads the shared index only; collect keeps input order
    let classified: Vec<ClassifiedStation> = stations
        .sites
        .par_iter()
        .map(|site| {
            let covering: Vec<String> = index
                .lookup(&site.location)
                .into_iter()
                .map(|b| b.substation_id.clone())
                .collect();
            ClassifiedStation::new(site.clone(), covering)
        })
        .collect();

    let inside = classified.iter().filter(|c| c.within_buffer).count();
    info!(
        "Classified {} {}: {} within {} of a substation, {} outside",
        classified.len(),
        stations.layer,
        inside,
        buffers.radius(),
        classified.len() - inside
    );
    for c in classified.iter().filter(|c| c.covering_substations.len() > 1) {
        debug!(
            "Station '{}' is covered by {} substations",
            c.site.id,
            c.covering_substations.len()
        );
    }

    Ok(classified)
}

fn is_finite(point: &Point<f64>) -> bool {
    point.x().is_finite() && point.y().is_finite()
}
