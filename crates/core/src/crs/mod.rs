//! Coordinate Reference System handling
//!
//! The engine never reprojects: rasters carry the CRS they were read with,
//! and vector exports must name a CRS equivalent to the mask they trace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// EPSG codes of geographic (lon/lat degree) systems the engine recognises.
const GEOGRAPHIC_EPSG: [u32; 3] = [4326, 4269, 4258];

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// EPSG code if known
    epsg: Option<u32>,
    /// WKT representation, when read from a file without an EPSG key
    wkt: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Whether coordinates are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        match self.epsg {
            Some(code) => GEOGRAPHIC_EPSG.contains(&code),
            None => self
                .wkt
                .as_deref()
                .map(|w| w.trim_start().starts_with("GEOGCS") || w.trim_start().starts_with("GEOGCRS"))
                .unwrap_or(false),
        }
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(50)]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl FromStr for CRS {
    type Err = Error;

    /// Parse `EPSG:<code>` (case-insensitive) or a bare EPSG number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = match trimmed.split_once(':') {
            Some((authority, code)) if authority.eq_ignore_ascii_case("epsg") => code,
            Some(_) => {
                return Err(Error::invalid("crs", trimmed, "only EPSG authority codes are supported"));
            }
            None => trimmed,
        };
        digits
            .trim()
            .parse::<u32>()
            .map(CRS::from_epsg)
            .map_err(|_| Error::invalid("crs", trimmed, "expected EPSG:<code>"))
    }
}
