//! Region of interest
//!
//! An axis-aligned WGS84 longitude/latitude box, fixed for a run. Every crop,
//! reduction and vectorization is bounded by the same `Roi`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Axis-aligned bounding box over WGS84 longitude/latitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Roi {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Roi {
    /// Build a validated region from `[west, south, east, north]`.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        let roi = Self { west, south, east, north };
        roi.validate()?;
        Ok(roi)
    }

    /// Reject non-finite, inverted or out-of-range bounds.
    pub fn validate(&self) -> Result<()> {
        let values = [self.west, self.south, self.east, self.north];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid("roi", format!("{:?}", values), "bounds must be finite"));
        }
        if self.west < -180.0 || self.east > 180.0 {
            return Err(Error::invalid(
                "roi",
                format!("{:?}", values),
                "longitudes must lie within [-180, 180]",
            ));
        }
        if self.south < -90.0 || self.north > 90.0 {
            return Err(Error::invalid(
                "roi",
                format!("{:?}", values),
                "latitudes must lie within [-90, 90]",
            ));
        }
        if self.west >= self.east || self.south >= self.north {
            return Err(Error::invalid(
                "roi",
                format!("{:?}", values),
                "west < east and south < north required",
            ));
        }
        Ok(())
    }

    /// The box grown by `dlon` degrees east and west and `dlat` degrees north
    /// and south, clamped to the valid longitude/latitude range.
    pub fn expanded(&self, dlon: f64, dlat: f64) -> Self {
        Self {
            west: (self.west - dlon.max(0.0)).max(-180.0),
            south: (self.south - dlat.max(0.0)).max(-90.0),
            east: (self.east + dlon.max(0.0)).min(180.0),
            north: (self.north + dlat.max(0.0)).min(90.0),
        }
    }

    /// Whether the box overlaps `(min_x, min_y, max_x, max_y)` bounds
    pub fn intersects_bounds(&self, bounds: (f64, f64, f64, f64)) -> bool {
        let (min_x, min_y, max_x, max_y) = bounds;
        self.west < max_x && self.east > min_x && self.south < max_y && self.north > min_y
    }

    /// Whether the box overlaps a STAC-style `[west, south, east, north]` bbox
    pub fn intersects_bbox(&self, bbox: &[f64]) -> bool {
        bbox.len() >= 4 && self.intersects_bounds((bbox[0], bbox[1], bbox[2], bbox[3]))
    }
}

impl Default for Roi {
    /// South Gurgaon / Aravalli mining belt
    fn default() -> Self {
        Self {
            west: 76.9,
            south: 28.1,
            east: 77.3,
            north: 28.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Roi::default().validate().is_ok());
        assert_eq!(Roi::default().west, 76.9);
    }

    #[test]
    fn test_rejects_inverted() {
        assert!(Roi::new(77.3, 28.1, 76.9, 28.5).is_err());
        assert!(Roi::new(76.9, 28.5, 77.3, 28.1).is_err());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Roi::new(-181.0, 0.0, 0.0, 1.0).is_err());
        assert!(Roi::new(0.0, 0.0, 1.0, 91.0).is_err());
        assert!(Roi::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_expanded_is_clamped() {
        let roi = Roi::new(179.5, 89.5, 179.9, 89.9).unwrap().expanded(1.0, 0.25);
        assert_eq!(roi.west, 178.5);
        assert_eq!(roi.east, 180.0);
        assert_eq!(roi.south, 89.25);
        assert_eq!(roi.north, 90.0);
        assert!(roi.validate().is_ok());
    }

    #[test]
    fn test_intersects() {
        let roi = Roi::new(0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(roi.intersects_bbox(&[0.5, 0.5, 2.0, 2.0]));
        assert!(!roi.intersects_bbox(&[1.5, 1.5, 2.0, 2.0]));
        assert!(!roi.intersects_bbox(&[0.5]));
    }
}
