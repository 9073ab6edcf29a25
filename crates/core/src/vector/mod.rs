//! Vector features produced by polygonization and handed to export jobs

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crs::CRS;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<&AttributeValue> for serde_json::Value {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Null => serde_json::Value::Null,
            AttributeValue::Bool(b) => serde_json::Value::from(*b),
            AttributeValue::Int(i) => serde_json::Value::from(*i),
            AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttributeValue::String(s) => serde_json::Value::from(s.as_str()),
        }
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes, ordered by key for stable output
    pub properties: BTreeMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: BTreeMap::new(),
            id: None,
        }
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    fn to_geojson(&self) -> geojson::Feature {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
            .collect();
        geojson::Feature {
            bbox: None,
            geometry: self
                .geometry
                .as_ref()
                .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
            id: self.id.clone().map(geojson::feature::Id::String),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Collection of features sharing one CRS
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub crs: Option<CRS>,
}

impl FeatureCollection {
    pub fn new(crs: Option<CRS>) -> Self {
        Self {
            features: Vec::new(),
            crs,
        }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Convert to a GeoJSON FeatureCollection.
    ///
    /// Non-WGS84 collections carry a legacy `crs` member naming the EPSG code.
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        let foreign_members = self
            .crs
            .as_ref()
            .filter(|crs| crs.epsg() != Some(4326))
            .map(|crs| {
                let mut members = serde_json::Map::new();
                members.insert(
                    "crs".to_string(),
                    serde_json::json!({
                        "type": "name",
                        "properties": { "name": crs.identifier() }
                    }),
                );
                members
            });
        geojson::FeatureCollection {
            bbox: None,
            features: self.features.iter().map(Feature::to_geojson).collect(),
            foreign_members,
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};

    fn square_feature() -> Feature {
        let poly = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
            vec![],
        );
        let mut f = Feature::new(Geometry::Polygon(poly));
        f.set_property("risk_zone", AttributeValue::Int(1));
        f
    }

    #[test]
    fn test_geojson_properties() {
        let mut fc = FeatureCollection::new(Some(CRS::wgs84()));
        fc.push(square_feature());
        let gj = fc.to_geojson();

        assert_eq!(gj.features.len(), 1);
        let props = gj.features[0].properties.as_ref().unwrap();
        assert_eq!(props["risk_zone"], serde_json::json!(1));
        assert!(gj.foreign_members.is_none());
    }

    #[test]
    fn test_geojson_projected_crs_member() {
        let mut fc = FeatureCollection::new(Some(CRS::from_epsg(32643)));
        fc.push(square_feature());
        let text = serde_json::to_string(&fc.to_geojson()).unwrap();
        assert!(text.contains("EPSG:32643"));
    }

    #[test]
    fn test_nan_property_becomes_null() {
        let v = serde_json::Value::from(&AttributeValue::Float(f64::NAN));
        assert!(v.is_null());
    }
}
