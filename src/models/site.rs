//! Point records for substations and charging stations.

use geo::Point;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::crs::Crs;

/// Which input dataset a collection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteLayer {
    Substations,
    ChargingStations,
}

impl std::fmt::Display for SiteLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteLayer::Substations => write!(f, "substations"),
            SiteLayer::ChargingStations => write!(f, "charging stations"),
        }
    }
}

/// A single point record.
///
/// The attribute bag is carried through the pipeline untouched; only the
/// location is ever rewritten (by reprojection).
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    /// Identifier taken from the configured id field, or the record index
    pub id: String,

    /// Location in the owning collection's CRS
    pub location: Point<f64>,

    /// Source attributes, ordered by field name
    pub attributes: BTreeMap<String, Value>,
}

impl Site {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            location: Point::new(x, y),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}

/// A set of sites sharing one CRS
#[derive(Debug, Clone, PartialEq)]
pub struct SiteCollection {
    pub layer: SiteLayer,
    pub crs: Crs,
    pub sites: Vec<Site>,
}

impl SiteCollection {
    pub fn new(layer: SiteLayer, crs: Crs, sites: Vec<Site>) -> Self {
        Self { layer, crs, sites }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter()
    }
}
