//! Point collection loading from shapefiles and GeoJSON.

use geo::Point;
use geojson::GeoJson;
use serde_json::Value;
use shapefile::dbase::FieldValue;
use shapefile::{Reader, Shape};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::crs::Crs;
use crate::error::{ProximityError, Result};
use crate::models::{Site, SiteCollection, SiteLayer};

/// How to interpret a source file
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Source CRS; overrides any `.prj` sidecar
    pub crs: Option<Crs>,

    /// Attribute holding the record id; falls back to the record index
    pub id_field: Option<String>,
}

/// Load a point collection, choosing the reader by file extension
pub fn load_sites(path: &Path, layer: SiteLayer, options: &LoadOptions) -> Result<SiteCollection> {
    if !path.exists() {
        return Err(ProximityError::DataLoad(format!(
            "{} file not found: {}",
            layer,
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let collection = match extension.as_deref() {
        Some("shp") => load_shapefile(path, layer, options)?,
        Some("geojson") | Some("json") => load_geojson(path, layer, options)?,
        _ => {
            return Err(ProximityError::DataLoad(format!(
                "unsupported file type for {}: {}",
                layer,
                path.display()
            )))
        }
    };

    if collection.is_empty() {
        return Err(ProximityError::DataLoad(format!(
            "{} file contains no records: {}",
            layer,
            path.display()
        )));
    }

    info!(
        "Loaded {} {} from {} ({})",
        collection.len(),
        layer,
        path.display(),
        collection.crs
    );
    Ok(collection)
}

fn load_shapefile(path: &Path, layer: SiteLayer, options: &LoadOptions) -> Result<SiteCollection> {
    let crs = match &options.crs {
        Some(crs) => crs.clone(),
        None => read_prj(path)?,
    };

    let mut reader = Reader::from_path(path).map_err(|e| {
        ProximityError::DataLoad(format!("failed to open {}: {}", path.display(), e))
    })?;

    let mut sites = Vec::new();
    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.map_err(|e| {
            ProximityError::DataLoad(format!(
                "failed to read record {} of {}: {}",
                index,
                path.display(),
                e
            ))
        })?;

        let (x, y) = match shape {
            Shape::Point(p) => (p.x, p.y),
            Shape::PointM(p) => (p.x, p.y),
            Shape::PointZ(p) => (p.x, p.y),
            _ => {
                return Err(ProximityError::DataLoad(format!(
                    "record {} of {} is not a point",
                    index,
                    path.display()
                )))
            }
        };

        let attributes: BTreeMap<String, Value> = record
            .into_iter()
            .map(|(name, value)| (name, field_value_to_json(value)))
            .collect();

        let id = resolve_id(&attributes, options.id_field.as_deref(), None, index);
        sites.push(Site {
            id,
            location: Point::new(x, y),
            attributes,
        });
    }

    Ok(SiteCollection::new(layer, crs, sites))
}

/// CRS from the `.prj` sidecar next to a shapefile
fn read_prj(shp_path: &Path) -> Result<Crs> {
    let prj_path = shp_path.with_extension("prj");
    if !prj_path.exists() {
        return Err(ProximityError::Projection(format!(
            "no CRS configured for {} and no .prj sidecar found",
            shp_path.display()
        )));
    }

    let wkt = fs::read_to_string(&prj_path).map_err(|e| {
        ProximityError::Projection(format!("failed to read {}: {}", prj_path.display(), e))
    })?;
    debug!("Using CRS from {}", prj_path.display());
    Crs::from_wkt(&wkt)
}

fn field_value_to_json(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(s) => s
            .map(|s| Value::String(s.trim_end().to_string()))
            .unwrap_or(Value::Null),
        FieldValue::Memo(s) => Value::String(s),
        FieldValue::Numeric(n) => n.map(json_number).unwrap_or(Value::Null),
        FieldValue::Float(f) => f.map(|f| json_number(f as f64)).unwrap_or(Value::Null),
        FieldValue::Double(d) | FieldValue::Currency(d) => json_number(d),
        FieldValue::Integer(i) => Value::from(i),
        FieldValue::Logical(b) => b.map(Value::Bool).unwrap_or(Value::Null),
        // Dates are kept in their dBASE rendering
        other => Value::String(format!("{:?}", other)),
    }
}

fn json_number(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn load_geojson(path: &Path, layer: SiteLayer, options: &LoadOptions) -> Result<SiteCollection> {
    let text = fs::read_to_string(path).map_err(|e| {
        ProximityError::DataLoad(format!("failed to read {}: {}", path.display(), e))
    })?;
    let geojson: GeoJson = text.parse().map_err(|e| {
        ProximityError::DataLoad(format!("invalid GeoJSON in {}: {}", path.display(), e))
    })?;

    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(ProximityError::DataLoad(format!(
                "{} holds a bare geometry, expected features",
                path.display()
            )))
        }
    };

    let mut sites = Vec::with_capacity(features.len());
    for (index, feature) in features.into_iter().enumerate() {
        let (x, y) = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(geojson::Value::Point(position)) if position.len() >= 2 => {
                (position[0], position[1])
            }
            _ => {
                return Err(ProximityError::DataLoad(format!(
                    "feature {} of {} is not a point",
                    index,
                    path.display()
                )))
            }
        };

        let feature_id = feature.id.as_ref().map(|id| match id {
            geojson::feature::Id::String(s) => s.clone(),
            geojson::feature::Id::Number(n) => n.to_string(),
        });

        let attributes: BTreeMap<String, Value> =
            feature.properties.unwrap_or_default().into_iter().collect();

        let id = resolve_id(&attributes, options.id_field.as_deref(), feature_id, index);
        sites.push(Site {
            id,
            location: Point::new(x, y),
            attributes,
        });
    }

    // RFC 7946 coordinates are WGS84 unless told otherwise
    let crs = options.crs.clone().unwrap_or_else(Crs::wgs84);
    Ok(SiteCollection::new(layer, crs, sites))
}

fn resolve_id(
    attributes: &BTreeMap<String, Value>,
    id_field: Option<&str>,
    fallback: Option<String>,
    index: usize,
) -> String {
    let from_field = id_field
        .and_then(|field| attributes.get(field))
        .and_then(|value| match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                _ => n.to_string(),
            }),
            other => Some(other.to_string()),
        });

    from_field.or(fallback).unwrap_or_else(|| index.to_string())
}
