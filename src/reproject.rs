//! CRS transforms for site collections and derived geometry.

use geo::{Coord, MapCoords, Point, Polygon};
#[cfg(feature = "proj")]
use proj::Proj;
use tracing::debug;

use crate::crs::Crs;
use crate::error::{ProximityError, Result};
use crate::models::SiteCollection;

/// A transform between two CRSs.
///
/// Identical source and target short-circuit to a no-op without touching PROJ.
pub struct CoordinateTransform {
    source: Crs,
    target: Crs,
    #[cfg(feature = "proj")]
    proj: Option<Proj>,
}

impl CoordinateTransform {
    pub fn new(source: &Crs, target: &Crs) -> Result<Self> {
        if source == target {
            return Ok(Self {
                source: source.clone(),
                target: target.clone(),
                #[cfg(feature = "proj")]
                proj: None,
            });
        }

        #[cfg(feature = "proj")]
        let proj = Some(build_proj(source, target)?);
        #[cfg(not(feature = "proj"))]
        build_proj(source, target)?;

        Ok(Self {
            source: source.clone(),
            target: target.clone(),
            #[cfg(feature = "proj")]
            proj,
        })
    }

    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    pub fn source(&self) -> &Crs {
        &self.source
    }

    pub fn target(&self) -> &Crs {
        &self.target
    }

    /// Transform a single coordinate, rejecting non-finite input or output
    pub fn convert(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Err(ProximityError::Projection(format!(
                "non-finite coordinate ({}, {}) in {}",
                coord.x, coord.y, self.source
            )));
        }

        let (x, y) = self.convert_raw(coord.x, coord.y)?;

        if !x.is_finite() || !y.is_finite() {
            return Err(ProximityError::Projection(format!(
                "transform from {} to {} is undefined at ({}, {})",
                self.source, self.target, coord.x, coord.y
            )));
        }

        Ok(Coord { x, y })
    }

    #[cfg(feature = "proj")]
    fn convert_raw(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match &self.proj {
            None => Ok((x, y)),
            Some(proj) => proj.convert((x, y)).map_err(|e| {
                ProximityError::Projection(format!(
                    "failed to transform ({}, {}) from {} to {}: {}",
                    x, y, self.source, self.target, e
                ))
            }),
        }
    }

    #[cfg(not(feature = "proj"))]
    fn convert_raw(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        Ok((x, y))
    }

    pub fn convert_point(&self, point: Point<f64>) -> Result<Point<f64>> {
        self.convert(point.0).map(Point::from)
    }

    pub fn convert_polygon(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>> {
        if self.is_identity() {
            return Ok(polygon.clone());
        }
        polygon.try_map_coords(|c| self.convert(c))
    }
}

#[cfg(feature = "proj")]
fn build_proj(source: &Crs, target: &Crs) -> Result<Proj> {
    Proj::new_known_crs(source.definition(), target.definition(), None).map_err(|e| {
        ProximityError::Projection(format!(
            "failed to create transform from {} to {}: {}",
            source, target, e
        ))
    })
}

#[cfg(not(feature = "proj"))]
fn build_proj(source: &Crs, target: &Crs) -> Result<()> {
    Err(ProximityError::Projection(format!(
        "cannot transform from {} to {}: built without the `proj` feature",
        source, target
    )))
}

/// Reproject every site in `collection` into `target`.
///
/// Ids, attributes and ordering are preserved; only locations change. When the
/// collection is already in `target` the locations are kept as they are, but
/// every coordinate is still checked to be finite.
pub fn reproject(mut collection: SiteCollection, target: &Crs) -> Result<SiteCollection> {
    let transform = CoordinateTransform::new(&collection.crs, target)?;

    for site in &mut collection.sites {
        site.location = transform.convert_point(site.location).map_err(|e| match e {
            ProximityError::Projection(msg) => {
                ProximityError::Projection(format!("{} '{}': {}", collection.layer, site.id, msg))
            }
            other => other,
        })?;
    }

    if transform.is_identity() {
        debug!(
            "{} already in {}, coordinates left unchanged",
            collection.layer, target
        );
    } else {
        debug!(
            "Reprojected {} {} from {} to {}",
            collection.len(),
            collection.layer,
            collection.crs,
            target
        );
    }

    collection.crs = target.clone();
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::CrsKind;
    use crate::models::{Site, SiteLayer};

    fn sample(crs: Crs) -> SiteCollection {
        SiteCollection::new(
            SiteLayer::Substations,
            crs,
            vec![
                Site::new("a", 1.0, 2.0).with_attribute("NAME", "Alpha"),
                Site::new("b", 3.0, 4.0),
            ],
        )
    }

    #[test]
    fn test_identity_is_noop() {
        let original = sample(Crs::web_mercator());
        let out = reproject(original.clone(), &Crs::web_mercator()).unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn test_reproject_idempotent() {
        let target = Crs::web_mercator();
        let once = reproject(sample(Crs::web_mercator()), &target).unwrap();
        let twice = reproject(once.clone(), &target).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_identity_rejects_non_finite() {
        let transform = CoordinateTransform::new(&Crs::wgs84(), &Crs::wgs84()).unwrap();
        assert!(transform.is_identity());
        assert!(transform.convert(Coord { x: f64::NAN, y: 0.0 }).is_err());
        assert!(transform
            .convert(Coord {
                x: 1.0,
                y: f64::INFINITY
            })
            .is_err());
    }

    #[test]
    fn test_same_crs_rejects_non_finite_sites() {
        let crs = Crs::new("EPSG:29903", CrsKind::Projected);
        let collection = SiteCollection::new(
            SiteLayer::ChargingStations,
            crs.clone(),
            vec![Site::new("ok", 10.0, 20.0), Site::new("bad", f64::NAN, 0.0)],
        );
        match reproject(collection, &crs) {
            Err(ProximityError::Projection(msg)) => assert!(msg.contains("'bad'"), "{}", msg),
            other => panic!("expected a projection error, got {:?}", other),
        }

        let infinite = SiteCollection::new(
            SiteLayer::Substations,
            crs.clone(),
            vec![Site::new("inf", f64::INFINITY, 0.0)],
        );
        assert!(matches!(
            reproject(infinite, &crs),
            Err(ProximityError::Projection(_))
        ));
    }

    #[cfg(feature = "proj")]
    #[test]
    fn test_wgs84_to_web_mercator() {
        let transform = CoordinateTransform::new(&Crs::wgs84(), &Crs::web_mercator())
            .expect("proj feature is enabled, so EPSG:4326 -> EPSG:3857 must build");
        assert!(!transform.is_identity());
        let origin = transform.convert(Coord { x: 0.0, y: 0.0 }).unwrap();
        assert!(origin.x.abs() < 1e-6);
        assert!(origin.y.abs() < 1e-6);

        // Belfast city hall, roughly
        let belfast = transform
            .convert(Coord {
                x: -5.9301,
                y: 54.5964,
            })
            .unwrap();
        assert!((belfast.x + 660_135.0).abs() < 1_000.0);
        assert!((belfast.y - 7_283_926.0).abs() < 1_000.0);
    }

    #[cfg(feature = "proj")]
    #[test]
    fn test_reproject_preserves_attributes() {
        let collection = SiteCollection::new(
            SiteLayer::ChargingStations,
            Crs::wgs84(),
            vec![Site::new("cs-1", -5.93, 54.6).with_attribute("operator", "ESB")],
        );
        let out = reproject(collection, &Crs::web_mercator()).unwrap();
        assert_eq!(out.crs, Crs::web_mercator());
        assert_eq!(out.sites[0].id, "cs-1");
        assert_eq!(out.sites[0].attributes["operator"], "ESB");
        assert!(out.sites[0].location.x() < -600_000.0);

        let again = reproject(out.clone(), &Crs::web_mercator()).unwrap();
        assert_eq!(again, out);
    }

    #[cfg(not(feature = "proj"))]
    #[test]
    fn test_without_proj_only_identity() {
        let source = Crs::new("EPSG:29903", CrsKind::Projected);
        assert!(CoordinateTransform::new(&source, &Crs::web_mercator()).is_err());
    }

    #[test]
    fn test_declared_kind_survives_identity() {
        let crs = Crs::new("EPSG:2263", CrsKind::Projected);
        let out = reproject(sample(crs.clone()), &crs).unwrap();
        assert_eq!(out.crs.kind(), CrsKind::Projected);
    }
}
