//! Output layers for the static and interactive map renderers.
//!
//! GeoJSON layers are reprojected into an export CRS (WGS84 by default, which
//! web maps expect). The CSV table stays in the analysis CRS.

use anyhow::{Context, Result};
use geo::Polygon;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::crs::Crs;
use crate::models::{ClassifiedStation, Site, SiteCollection};
use crate::pipeline::{AnalysisOutput, AnalysisSummary};
use crate::proximity::BufferSet;
use crate::reproject::CoordinateTransform;

fn feature(value: geojson::Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn point_value(site: &Site, transform: &CoordinateTransform) -> Result<geojson::Value> {
    let p = transform
        .convert_point(site.location)
        .with_context(|| format!("Failed to reproject site '{}' for export", site.id))?;
    Ok(geojson::Value::Point(vec![p.x(), p.y()]))
}

fn polygon_value(polygon: &Polygon<f64>) -> geojson::Value {
    let ring = polygon
        .exterior()
        .coords()
        .map(|c| vec![c.x, c.y])
        .collect();
    geojson::Value::Polygon(vec![ring])
}

fn site_properties(site: &Site) -> JsonObject {
    let mut properties: JsonObject = site
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    properties.insert("id".to_string(), Value::String(site.id.clone()));
    properties
}

fn write_collection(path: &Path, features: Vec<Feature>) -> Result<()> {
    let count = features.len();
    let geojson = GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    });
    fs::write(path, geojson.to_string())
        .with_context(|| format!("Failed to write GeoJSON file: {}", path.display()))?;
    debug!("Wrote {} features to {}", count, path.display());
    Ok(())
}

/// Buffer polygons with their substation id and radius
pub fn write_buffers_geojson(
    path: &Path,
    buffers: &BufferSet,
    transform: &CoordinateTransform,
    segments: usize,
) -> Result<()> {
    let features = buffers
        .iter()
        .map(|buffer| {
            let polygon = transform
                .convert_polygon(&buffer.to_polygon(segments))
                .with_context(|| {
                    format!(
                        "Failed to reproject buffer of substation '{}'",
                        buffer.substation_id
                    )
                })?;
            let mut properties = JsonObject::new();
            properties.insert(
                "substation_id".to_string(),
                Value::String(buffer.substation_id.clone()),
            );
            properties.insert("radius".to_string(), Value::from(buffer.radius));
            Ok(feature(polygon_value(&polygon), properties))
        })
        .collect::<Result<Vec<_>>>()?;

    write_collection(path, features)
}

pub fn write_substations_geojson(
    path: &Path,
    substations: &SiteCollection,
    transform: &CoordinateTransform,
) -> Result<()> {
    let features = substations
        .iter()
        .map(|site| Ok(feature(point_value(site, transform)?, site_properties(site))))
        .collect::<Result<Vec<_>>>()?;

    write_collection(path, features)
}

/// Stations with their attributes plus `within_buffer` and `covering_substations`
pub fn write_stations_geojson<'a>(
    path: &Path,
    stations: impl IntoIterator<Item = &'a ClassifiedStation>,
    transform: &CoordinateTransform,
) -> Result<()> {
    let features = stations
        .into_iter()
        .map(|station| {
            let mut properties = site_properties(&station.site);
            properties.insert(
                "within_buffer".to_string(),
                Value::Bool(station.within_buffer),
            );
            properties.insert(
                "covering_substations".to_string(),
                Value::from(station.covering_substations.clone()),
            );
            Ok(feature(point_value(&station.site, transform)?, properties))
        })
        .collect::<Result<Vec<_>>>()?;

    write_collection(path, features)
}

/// Flat table of the classification in the analysis CRS
pub fn write_stations_csv(path: &Path, stations: &[ClassifiedStation]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    writer.write_record(["id", "x", "y", "within_buffer", "covering_substations"])?;
    for station in stations {
        writer.write_record([
            station.site.id.clone(),
            station.site.location.x().to_string(),
            station.site.location.y().to_string(),
            station.within_buffer.to_string(),
            station.covering_substations.join(";"),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_summary_json(path: &Path, summary: &AnalysisSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write summary file: {}", path.display()))?;
    Ok(())
}

/// Write every output layer into `dir`, returning the files written
pub fn export_all(
    output: &AnalysisOutput,
    dir: &Path,
    export_crs: &Crs,
    segments: usize,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let transform = CoordinateTransform::new(&output.crs, export_crs)
        .context("Failed to set up export reprojection")?;

    let mut written = Vec::new();
    let mut target = |name: &str| {
        let path = dir.join(name);
        written.push(path.clone());
        path
    };

    write_buffers_geojson(&target("buffers.geojson"), &output.buffers, &transform, segments)?;
    write_substations_geojson(&target("substations.geojson"), &output.substations, &transform)?;
    write_stations_geojson(&target("stations.geojson"), &output.stations, &transform)?;
    write_stations_geojson(&target("stations_inside.geojson"), output.inside(), &transform)?;
    write_stations_geojson(&target("stations_outside.geojson"), output.outside(), &transform)?;
    write_stations_csv(&target("stations.csv"), &output.stations)?;
    write_summary_json(&target("summary.json"), &output.summary())?;

    info!(
        "Exported {} files to {} ({})",
        written.len(),
        dir.display(),
        export_crs
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::CrsKind;
    use crate::models::SiteLayer;
    use crate::pipeline::ProximityAnalysis;

    fn sample_output() -> AnalysisOutput {
        let crs = Crs::new("EPSG:29903", CrsKind::Projected);
        let substations = SiteCollection::new(
            SiteLayer::Substations,
            crs.clone(),
            vec![Site::new("S1", 0.0, 0.0).with_attribute("NAME", "Cregagh")],
        );
        let stations = SiteCollection::new(
            SiteLayer::ChargingStations,
            crs.clone(),
            vec![
                Site::new("C1", 0.0, 150.0).with_attribute("operator", "ESB"),
                Site::new("C2", 0.0, 250.0),
            ],
        );
        ProximityAnalysis::new(crs, 200.0)
            .unwrap()
            .run(substations, stations)
            .unwrap()
    }

    fn read_features(path: &Path) -> Vec<Feature> {
        let text = fs::read_to_string(path).unwrap();
        match text.parse::<GeoJson>().unwrap() {
            GeoJson::FeatureCollection(fc) => fc.features,
            _ => panic!("expected a feature collection"),
        }
    }

    #[test]
    fn test_export_all_in_analysis_crs() {
        let output = sample_output();
        let dir = tempfile::tempdir().unwrap();
        let written = export_all(&output, dir.path(), &output.crs, 32).unwrap();
        assert_eq!(written.len(), 7);
        assert!(written.iter().all(|p| p.exists()));

        let stations = read_features(&dir.path().join("stations.geojson"));
        assert_eq!(stations.len(), 2);
        let first = stations[0].properties.as_ref().unwrap();
        assert_eq!(first["id"], "C1");
        assert_eq!(first["operator"], "ESB");
        assert_eq!(first["within_buffer"], true);
        assert_eq!(first["covering_substations"], serde_json::json!(["S1"]));

        let inside = read_features(&dir.path().join("stations_inside.geojson"));
        let outside = read_features(&dir.path().join("stations_outside.geojson"));
        assert_eq!(inside.len(), 1);
        assert_eq!(outside.len(), 1);
        assert_eq!(outside[0].properties.as_ref().unwrap()["within_buffer"], false);

        let buffers = read_features(&dir.path().join("buffers.geojson"));
        assert_eq!(buffers.len(), 1);
        match &buffers[0].geometry.as_ref().unwrap().value {
            geojson::Value::Polygon(rings) => assert_eq!(rings[0].len(), 33),
            other => panic!("unexpected geometry {:?}", other),
        }

        let substations = read_features(&dir.path().join("substations.geojson"));
        assert_eq!(substations[0].properties.as_ref().unwrap()["NAME"], "Cregagh");
    }

    #[test]
    fn test_csv_table() {
        let output = sample_output();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stations.csv");
        write_stations_csv(&path, &output.stations).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "C1");
        assert_eq!(&rows[0][3], "true");
        assert_eq!(&rows[0][4], "S1");
        assert_eq!(&rows[1][3], "false");
        assert_eq!(&rows[1][4], "");
    }

    #[test]
    fn test_summary_json() {
        let output = sample_output();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_summary_json(&path, &output.summary()).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["within_buffer"], 1);
        assert_eq!(value["outside_buffer"], 1);
        assert_eq!(value["radius"], 200.0);
        assert!(value["generated_at"].is_string());
    }
}
