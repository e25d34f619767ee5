//! Coordinate reference system descriptors.
//!
//! A [`Crs`] pairs a definition string understood by PROJ (`EPSG:3857` or a
//! WKT blob from a `.prj` sidecar) with its [`CrsKind`]. The kind decides
//! whether linear distances such as a buffer radius are meaningful.

use std::fmt;

use crate::error::{ProximityError, Result};

/// Whether coordinates are angular (degrees) or planar (linear units)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrsKind {
    Geographic,
    Projected,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Crs {
    definition: String,
    kind: CrsKind,
}

impl Crs {
    /// Declare a CRS whose kind is known to the caller.
    ///
    /// An `epsg:` prefix is normalised to `EPSG:` so equal codes compare equal.
    pub fn new(definition: impl Into<String>, kind: CrsKind) -> Self {
        let definition = definition.into();
        let definition = definition.trim();
        let definition = match definition.get(..5) {
            Some(prefix) if prefix.eq_ignore_ascii_case("EPSG:") => {
                format!("EPSG:{}", definition[5..].trim())
            }
            _ => definition.to_string(),
        };
        Self { definition, kind }
    }

    /// Look up an EPSG code in the built-in table
    pub fn epsg(code: u32) -> Result<Self> {
        let kind = epsg_kind(code).ok_or_else(|| {
            ProximityError::Projection(format!(
                "EPSG:{} is not in the known CRS table; declare its kind explicitly",
                code
            ))
        })?;
        Ok(Self {
            definition: format!("EPSG:{}", code),
            kind,
        })
    }

    /// Classify a WKT definition by its root keyword
    pub fn from_wkt(wkt: &str) -> Result<Self> {
        let wkt = wkt.trim().trim_start_matches('\u{feff}');
        let root = wkt
            .split(|c: char| c == '[' || c == '(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();

        let kind = match root.as_str() {
            "PROJCS" | "PROJCRS" | "PROJECTEDCRS" => CrsKind::Projected,
            "GEOGCS" | "GEOGCRS" | "GEOGRAPHICCRS" | "GEODCRS" | "GEODETICCRS" => {
                CrsKind::Geographic
            }
            "" => return Err(ProximityError::Projection("empty CRS definition".to_string())),
            other => {
                return Err(ProximityError::Projection(format!(
                    "unsupported WKT root '{}'",
                    other
                )))
            }
        };

        Ok(Self::new(wkt, kind))
    }

    /// Parse `EPSG:<code>` (any case) or a WKT definition
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let upper = text.to_ascii_uppercase();
        if let Some(code) = upper.strip_prefix("EPSG:") {
            let code: u32 = code.trim().parse().map_err(|_| {
                ProximityError::Projection(format!("invalid EPSG code in '{}'", text))
            })?;
            return Self::epsg(code);
        }
        Self::from_wkt(text)
    }

    pub fn web_mercator() -> Self {
        Self::new("EPSG:3857", CrsKind::Projected)
    }

    pub fn wgs84() -> Self {
        Self::new("EPSG:4326", CrsKind::Geographic)
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn kind(&self) -> CrsKind {
        self.kind
    }

    pub fn is_geographic(&self) -> bool {
        self.kind == CrsKind::Geographic
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.definition.len() > 60 {
            // WKT blobs are unreadable in log lines
            let head: String = self.definition.chars().take(57).collect();
            write!(f, "{}...", head)
        } else {
            write!(f, "{}", self.definition)
        }
    }
}

fn epsg_kind(code: u32) -> Option<CrsKind> {
    match code {
        // WGS84, ETRS89, NAD83, OSGB36, TM65, TM75
        4326 | 4258 | 4269 | 4277 | 4299 | 4300 => Some(CrsKind::Geographic),
        // Web Mercator, Irish Grid variants, ITM, British National Grid, LAEA Europe
        3857 | 29900..=29903 | 2157 | 27700 | 3035 => Some(CrsKind::Projected),
        // UTM zones on WGS84 (north/south) and ETRS89
        32601..=32660 | 32701..=32760 | 25828..=25838 => Some(CrsKind::Projected),
        _ => None,
    }
}
