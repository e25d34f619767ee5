//! Fixed-radius buffers around substations.

use geo::{Coord, LineString, Point, Polygon, Rect};
use std::f64::consts::TAU;
use tracing::debug;

use crate::crs::Crs;
use crate::error::{ProximityError, Result};
use crate::models::SiteCollection;

/// Vertex count of the rendered buffer ring (16 per quarter circle)
pub const DEFAULT_SEGMENTS: usize = 64;

/// The disc of all locations within `radius` of a substation.
///
/// Membership is evaluated against the exact disc; [`Buffer::to_polygon`] is
/// only an approximation for renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    pub substation_id: String,
    pub center: Point<f64>,
    pub radius: f64,
}

impl Buffer {
    /// Boundary-inclusive containment: a point at exactly `radius` is inside
    pub fn contains_point(&self, point: &Point<f64>) -> bool {
        let dx = point.x() - self.center.x();
        let dy = point.y() - self.center.y();
        dx.hypot(dy) <= self.radius
    }

    pub fn bounding_rect(&self) -> Rect<f64> {
        let (x, y) = (self.center.x(), self.center.y());
        Rect::new(
            Coord {
                x: x - self.radius,
                y: y - self.radius,
            },
            Coord {
                x: x + self.radius,
                y: y + self.radius,
            },
        )
    }

    /// Regular polygon inscribed in the disc, starting due east
    pub fn to_polygon(&self, segments: usize) -> Polygon<f64> {
        let segments = segments.max(4);
        let (cx, cy) = (self.center.x(), self.center.y());

        let mut ring: Vec<Coord<f64>> = (0..segments)
            .map(|i| {
                let angle = TAU * i as f64 / segments as f64;
                Coord {
                    x: cx + self.radius * angle.cos(),
                    y: cy + self.radius * angle.sin(),
                }
            })
            .collect();
        ring.push(ring[0]);

        Polygon::new(LineString::new(ring), vec![])
    }
}

/// One buffer per substation, all in the same planar CRS.
///
/// Buffers are kept separate rather than merged so membership can be tested
/// against the whole collection.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferSet {
    crs: Crs,
    radius: f64,
    buffers: Vec<Buffer>,
}

impl BufferSet {
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn buffers(&self) -> &[Buffer] {
        &self.buffers
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.iter()
    }

    /// Total bounds of every buffer disc
    pub fn coverage_bounds(&self) -> Option<Rect<f64>> {
        let mut rects = self.buffers.iter().map(Buffer::bounding_rect);
        let first = rects.next()?;
        Some(rects.fold(first, |acc, r| {
            Rect::new(
                Coord {
                    x: acc.min().x.min(r.min().x),
                    y: acc.min().y.min(r.min().y),
                },
                Coord {
                    x: acc.max().x.max(r.max().x),
                    y: acc.max().y.max(r.max().y),
                },
            )
        }))
    }
}

pub(crate) fn validate_radius(radius: f64) -> Result<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(ProximityError::InvalidRadius(radius))
    }
}

/// Build a buffer of `radius` CRS units around every substation.
///
/// The substations must already be in a projected CRS: a radius in degrees is
/// rejected with [`ProximityError::UnitMismatch`].
pub fn build_buffers(substations: &SiteCollection, radius: f64) -> Result<BufferSet> {
    if substations.crs.is_geographic() {
        return Err(ProximityError::UnitMismatch {
            operation: "buffering",
            crs: substations.crs.clone(),
        });
    }
    validate_radius(radius)?;

    let buffers: Vec<Buffer> = substations
        .iter()
        .map(|s| {
            if !s.location.x().is_finite() || !s.location.y().is_finite() {
                return Err(ProximityError::Projection(format!(
                    "{} '{}' has non-finite coordinates ({}, {})",
                    substations.layer,
                    s.id,
                    s.location.x(),
                    s.location.y()
                )));
            }
            Ok(Buffer {
                substation_id: s.id.clone(),
                center: s.location,
                radius,
            })
        })
        .collect::<Result<_>>()?;

    debug!(
        "Built {} buffers of radius {} in {}",
        buffers.len(),
        radius,
        substations.crs
    );

    Ok(BufferSet {
        crs: substations.crs.clone(),
        radius,
        buffers,
    })
}
