//! Scene ingestion
//!
//! Multispectral scenes are described by a local manifest shaped like a STAC
//! item collection: each item carries an acquisition `datetime`, an
//! `eo:cloud_cover` percentage, an optional `bbox`, and `assets` pointing at
//! single-band GeoTIFFs. A [`SceneQuery`] filters the archive by region, date
//! and cloud cover; only qualifying scenes are read from disk.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use terraval_algorithms::imagery::{BandPair, DateWindow};
use terraval_core::io::read_geotiff;
use terraval_core::Roi;

use crate::error::{AuditError, Result};
use crate::layers::crop_to_region;

/// Asset keys accepted for the near-infrared band (Sentinel-2 B8)
const NIR_KEYS: [&str; 2] = ["nir", "B8"];
/// Asset keys accepted for the red band (Sentinel-2 B4)
const RED_KEYS: [&str; 2] = ["red", "B4"];

/// Region, half-open date range and cloud ceiling of a scene search
#[derive(Debug, Clone, PartialEq)]
pub struct SceneQuery {
    pub roi: Roi,
    pub start: NaiveDate,
    /// First day no longer in the window
    pub end: NaiveDate,
    /// Scenes qualify when their cloud cover is strictly below this value
    pub max_cloud_pct: f64,
}

impl SceneQuery {
    /// Query for one year's window
    pub fn for_year(roi: Roi, year: i32, window: &DateWindow, max_cloud_pct: f64) -> Result<Self> {
        let (start, end) = window.date_range(year)?;
        Ok(Self {
            roi,
            start,
            end,
            max_cloud_pct,
        })
    }

    /// Whether scene metadata passes the date, cloud and footprint filters
    pub fn accepts(&self, date: NaiveDate, cloud_pct: Option<f64>, bbox: Option<&[f64]>) -> bool {
        let in_window = date >= self.start && date < self.end;
        let clear = cloud_pct.is_some_and(|c| c < self.max_cloud_pct);
        let overlaps = bbox.is_none_or(|b| self.roi.intersects_bbox(b));
        in_window && clear && overlaps
    }
}

/// One qualifying scene; geographic bands are cropped to the query region
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub date: NaiveDate,
    pub cloud_pct: f64,
    pub bands: BandPair,
}

/// Anything able to answer a scene search
pub trait SceneSource {
    fn scenes(&self, query: &SceneQuery) -> Result<Vec<Scene>>;
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Scene archive manifest (a STAC-like item collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneManifest {
    #[serde(rename = "type", default = "feature_collection")]
    pub type_: String,
    pub features: Vec<ManifestItem>,
}

fn feature_collection() -> String {
    "FeatureCollection".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestItem {
    pub id: String,
    /// `[west, south, east, north]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    pub properties: ManifestProperties,
    pub assets: HashMap<String, ManifestAsset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestProperties {
    /// ISO 8601 date or datetime
    pub datetime: String,
    /// Cloud cover percentage (EO extension); items without it never qualify
    #[serde(rename = "eo:cloud_cover", skip_serializing_if = "Option::is_none")]
    pub eo_cloud_cover: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestAsset {
    /// Path relative to the manifest, or absolute
    pub href: String,
}

impl ManifestItem {
    /// Acquisition date
    pub fn date(&self) -> Result<NaiveDate> {
        parse_date(&self.properties.datetime).ok_or_else(|| {
            AuditError::Catalog(format!(
                "scene '{}': unrecognised datetime '{}'",
                self.id, self.properties.datetime
            ))
        })
    }

    fn asset(&self, keys: &[&str]) -> Result<&ManifestAsset> {
        keys.iter()
            .find_map(|k| self.assets.get(*k))
            .ok_or_else(|| {
                AuditError::Catalog(format!("scene '{}' has no '{}' asset", self.id, keys[0]))
            })
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// Scene archive backed by a manifest file and GeoTIFF band assets
#[derive(Debug, Clone)]
pub struct ManifestCatalog {
    manifest: SceneManifest,
    base_dir: PathBuf,
}

impl ManifestCatalog {
    /// Read a manifest; asset paths resolve against its directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
        let manifest: SceneManifest = serde_json::from_str(&text)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        tracing::info!(
            path = %path.display(),
            items = manifest.features.len(),
            "opened scene manifest"
        );
        Ok(Self { manifest, base_dir })
    }

    pub fn from_manifest(manifest: SceneManifest, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest,
            base_dir: base_dir.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.manifest.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.features.is_empty()
    }

    fn resolve(&self, href: &str) -> PathBuf {
        let p = Path::new(href);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    fn load_band(&self, asset: &ManifestAsset, roi: &Roi) -> Result<terraval_core::Raster<f64>> {
        let path = self.resolve(&asset.href);
        let raster = read_geotiff::<f64, _>(&path).map_err(|e| match e {
            terraval_core::Error::Io(source) => AuditError::io(&path, source),
            other => AuditError::Engine(other),
        })?;
        crop_to_region(raster, roi, &asset.href)
    }
}

impl SceneSource for ManifestCatalog {
    fn scenes(&self, query: &SceneQuery) -> Result<Vec<Scene>> {
        let mut scenes = Vec::new();
        for item in &self.manifest.features {
            let date = item.date()?;
            if !query.accepts(date, item.properties.eo_cloud_cover, item.bbox.as_deref()) {
                continue;
            }
            let (nir_asset, red_asset) = (item.asset(&NIR_KEYS)?, item.asset(&RED_KEYS)?);
            let nir = self.load_band(nir_asset, &query.roi)?;
            let red = self.load_band(red_asset, &query.roi)?;
            if !nir.same_grid(&red) {
                return Err(AuditError::Catalog(format!(
                    "scene '{}': nir and red bands are on different grids",
                    item.id
                )));
            }
            scenes.push(Scene {
                id: item.id.clone(),
                date,
                cloud_pct: item.properties.eo_cloud_cover.unwrap_or(100.0),
                bands: BandPair { nir, red },
            });
        }
        tracing::info!(
            start = %query.start,
            end = %query.end,
            max_cloud = query.max_cloud_pct,
            matched = scenes.len(),
            "scene search"
        );
        Ok(scenes)
    }
}

/// Scenes held in memory, for synthetic runs and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryScenes {
    scenes: Vec<Scene>,
}

impl InMemoryScenes {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self { scenes }
    }

    pub fn push(&mut self, scene: Scene) {
        self.scenes.push(scene);
    }
}

impl SceneSource for InMemoryScenes {
    fn scenes(&self, query: &SceneQuery) -> Result<Vec<Scene>> {
        self.scenes
            .iter()
            .filter(|s| query.accepts(s.date, Some(s.cloud_pct), None))
            .map(|s| {
                Ok(Scene {
                    bands: BandPair {
                        nir: crop_to_region(s.bands.nir.clone(), &query.roi, &s.id)?,
                        red: crop_to_region(s.bands.red.clone(), &query.roi, &s.id)?,
                    },
                    ..s.clone()
                })
            })
            .collect()
    }
}
