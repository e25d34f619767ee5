use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use substation_proximity::crs::Crs;
use substation_proximity::io::LoadOptions;
use substation_proximity::pipeline::DEFAULT_RADIUS;
use substation_proximity::proximity::DEFAULT_SEGMENTS;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub substations: LayerConfig,
    pub charging_stations: LayerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    pub radius: f64,
    pub target_crs: String,
    pub buffer_segments: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            target_crs: "EPSG:3857".to_string(),
            buffer_segments: DEFAULT_SEGMENTS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LayerConfig {
    pub path: PathBuf,
    /// Falls back to the `.prj` sidecar (shapefiles) or WGS84 (GeoJSON)
    pub crs: Option<String>,
    pub id_field: Option<String>,
}

impl LayerConfig {
    pub fn load_options(&self) -> Result<LoadOptions> {
        let crs = self
            .crs
            .as_deref()
            .map(Crs::parse)
            .transpose()
            .with_context(|| format!("Invalid CRS for {}", self.path.display()))?;
        Ok(LoadOptions {
            crs,
            id_field: self.id_field.clone(),
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub export_crs: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            export_crs: "EPSG:4326".to_string(),
        }
    }
}

impl Config {
    /// Relative layer paths resolve against the config file's directory
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let mut config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        if let Some(base) = path.parent() {
            for layer in [&mut config.substations, &mut config.charging_stations] {
                if layer.path.is_relative() {
                    layer.path = base.join(&layer.path);
                }
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            [analysis]
            radius = 250.0
            target_crs = "EPSG:2157"

            [substations]
            path = "Data/belfastSubstations.shp"
            crs = "EPSG:29903"
            id_field = "NAME"

            [charging_stations]
            path = "Data/evChargingStations_Belfast.shp"

            [output]
            dir = "maps"
            "#,
        )
        .unwrap();

        assert_eq!(config.analysis.radius, 250.0);
        assert_eq!(config.analysis.buffer_segments, DEFAULT_SEGMENTS);
        assert_eq!(config.substations.id_field.as_deref(), Some("NAME"));
        assert!(config.charging_stations.crs.is_none());
        assert_eq!(config.output.dir, PathBuf::from("maps"));
        assert_eq!(config.output.export_crs, "EPSG:4326");

        let options = config.substations.load_options().unwrap();
        assert_eq!(options.crs.unwrap().definition(), "EPSG:29903");
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str(
            r#"
            [substations]
            path = "a.shp"
            [charging_stations]
            path = "b.geojson"
            "#,
        )
        .unwrap();
        assert_eq!(config.analysis.radius, DEFAULT_RADIUS);
        assert_eq!(config.analysis.target_crs, "EPSG:3857");
        assert_eq!(config.output.dir, PathBuf::from("output"));
    }

    #[test]
    fn test_relative_paths_resolve_against_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        fs::write(
            &path,
            "[substations]\npath = \"Data/subs.shp\"\n[charging_stations]\npath = \"/abs/ev.shp\"\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.substations.path, dir.path().join("Data/subs.shp"));
        assert_eq!(config.charging_stations.path, PathBuf::from("/abs/ev.shp"));
    }

    #[test]
    fn test_bad_crs() {
        let layer = LayerConfig {
            path: PathBuf::from("a.shp"),
            crs: Some("EPSG:nope".to_string()),
            id_field: None,
        };
        assert!(layer.load_options().is_err());
    }
}
