//! Mask polygonization
//!
//! Turns the true cells of a mask into polygon features. Connected components
//! are found with 4- or 8-connectivity, then each component's boundary is
//! walked along pixel edges into closed rings.
//!
//! Rings are walked with the component on the right-hand side in pixel space
//! (rows grow downward), which makes outer rings counter-clockwise and holes
//! clockwise once mapped to north-up coordinates. Where two diagonal cells of
//! the same component meet at a corner, the walk turns right under
//! 4-connectivity (keeping the cells apart) and left under 8-connectivity
//! (joining them into one ring).

use geo::Contains;
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use rayon::prelude::*;
use std::collections::HashMap;
use terraval_core::raster::{GeoTransform, Mask, Neighborhood, MASK_NODATA, MASK_TRUE};
use terraval_core::vector::{AttributeValue, Feature, FeatureCollection};
use terraval_core::{Error, Result, Roi, CRS};

use crate::resample::{native_scale_m, AnalysisGrid};
use crate::terrain::RowAreas;

/// Parameters for [`polygonize`]
#[derive(Debug, Clone)]
pub struct PolygonizeParams {
    /// Vectorization scale in metres; `None` keeps the mask's resolution
    pub scale_m: Option<f64>,
    /// Expected CRS of the output. No reprojection is done: it must match the mask.
    pub crs: Option<CRS>,
    /// Join diagonal neighbours into one feature
    pub eight_connected: bool,
    /// Property receiving the traced cell value
    pub label_property: String,
    /// Largest number of grid cells the job may touch
    pub max_pixels: u64,
    /// Traced components are grouped into `tile_scale²` spatial batches that
    /// run one after another (1..=16). This sets parallel granularity only:
    /// labeling covers the whole grid first, so peak memory does not shrink.
    pub tile_scale: u32,
}

impl Default for PolygonizeParams {
    fn default() -> Self {
        Self {
            scale_m: None,
            crs: None,
            eight_connected: false,
            label_property: "label".to_string(),
            max_pixels: 10_000_000_000_000,
            tile_scale: 1,
        }
    }
}

/// A component's cells as flat `row * cols + col` indices
type Component = Vec<usize>;

/// Polygonize the true cells of `mask` within `roi`.
///
/// Each feature carries `label_property = 1` and a `hectares` property with
/// the true area of its cells.
pub fn polygonize(mask: &Mask, roi: Option<&Roi>, params: &PolygonizeParams) -> Result<FeatureCollection> {
    if !(1..=16).contains(&params.tile_scale) {
        return Err(Error::invalid("tile_scale", params.tile_scale, "must lie in 1..=16"));
    }
    if params.label_property.is_empty() {
        return Err(Error::invalid("label_property", "\"\"", "must not be empty"));
    }
    if let (Some(want), Some(have)) = (&params.crs, mask.crs())
        && !have.is_equivalent(want)
    {
        return Err(Error::CrsMismatch(have.identifier(), want.identifier()));
    }

    let scale = params.scale_m.unwrap_or_else(|| native_scale_m(mask));
    let grid = AnalysisGrid::new(mask, roi, scale)?;
    grid.check_budget("polygonize", params.max_pixels)?;
    let work = grid.resample(mask, MASK_NODATA)?;

    let (rows, cols) = work.shape();
    let cells: Vec<u8> = work.data().iter().copied().collect();
    let (labels, components) = label_components(&cells, rows, cols, params.eight_connected);

    let ts = params.tile_scale as usize;
    let mut batches: Vec<Vec<usize>> = vec![Vec::new(); ts * ts];
    for (id, component) in components.iter().enumerate() {
        let first = component[0];
        let (r, c) = (first / cols, first % cols);
        batches[(r * ts / rows) * ts + c * ts / cols].push(id);
    }

    let areas = RowAreas::new(&grid.transform, rows, grid.geographic);
    let tracer = Tracer {
        labels: &labels,
        rows,
        cols,
        eight_connected: params.eight_connected,
        transform: &grid.transform,
    };

    let mut traced: Vec<(usize, Feature)> = Vec::with_capacity(components.len());
    for (index, batch) in batches.iter().enumerate().filter(|(_, b)| !b.is_empty()) {
        let features: Vec<(usize, Feature)> = batch
            .par_iter()
            .map(|&id| {
                let geometry = tracer.trace(id as u32 + 1, &components[id])?;
                let m2: f64 = components[id].iter().map(|&i| areas.area(i / cols)).sum();
                let mut feature = Feature::new(geometry);
                feature.id = Some(id.to_string());
                feature.set_property(params.label_property.clone(), AttributeValue::Int(1));
                feature.set_property("hectares", AttributeValue::Float(m2 / 10_000.0));
                Ok((id, feature))
            })
            .collect::<Result<_>>()?;
        tracing::debug!(batch = index, features = features.len(), "traced batch");
        traced.extend(features);
    }
    traced.sort_by_key(|(id, _)| *id);

    let mut collection = FeatureCollection::new(params.crs.clone().or_else(|| mask.crs().cloned()));
    for (_, feature) in traced {
        collection.push(feature);
    }

    tracing::debug!(
        features = collection.len(),
        rows,
        cols,
        native = grid.native,
        "polygonized mask"
    );
    Ok(collection)
}

/// Component labels (0 = background, `k + 1` = component `k`) and each component's cells
fn label_components(cells: &[u8], rows: usize, cols: usize, eight: bool) -> (Vec<u32>, Vec<Component>) {
    let offsets = Neighborhood::connectivity(eight).offsets_no_center();
    let mut labels = vec![0u32; cells.len()];
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for start in 0..cells.len() {
        if cells[start] != MASK_TRUE || labels[start] != 0 {
            continue;
        }
        let label = components.len() as u32 + 1;
        let mut component = Vec::new();
        labels[start] = label;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            component.push(idx);
            let (r, c) = ((idx / cols) as isize, (idx % cols) as isize);
            for &(dr, dc) in &offsets {
                let (nr, nc) = (r + dr, c + dc);
                if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                    continue;
                }
                let n = nr as usize * cols + nc as usize;
                if cells[n] == MASK_TRUE && labels[n] == 0 {
                    labels[n] = label;
                    stack.push(n);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }

    (labels, components)
}

/// Corner coordinates: x = column edge, y = row edge
type Vertex = (i64, i64);

struct Tracer<'a> {
    labels: &'a [u32],
    rows: usize,
    cols: usize,
    eight_connected: bool,
    transform: &'a GeoTransform,
}

impl Tracer<'_> {
    fn same(&self, label: u32, r: i64, c: i64) -> bool {
        r >= 0
            && c >= 0
            && (r as usize) < self.rows
            && (c as usize) < self.cols
            && self.labels[r as usize * self.cols + c as usize] == label
    }

    /// Directed boundary edges of a component, interior on the right
    fn edges(&self, label: u32, cells: &[usize]) -> Vec<(Vertex, Vertex)> {
        let mut edges = Vec::new();
        for &idx in cells {
            let (r, c) = ((idx / self.cols) as i64, (idx % self.cols) as i64);
            if !self.same(label, r - 1, c) {
                edges.push(((c, r), (c + 1, r)));
            }
            if !self.same(label, r, c + 1) {
                edges.push(((c + 1, r), (c + 1, r + 1)));
            }
            if !self.same(label, r + 1, c) {
                edges.push(((c + 1, r + 1), (c, r + 1)));
            }
            if !self.same(label, r, c - 1) {
                edges.push(((c, r + 1), (c, r)));
            }
        }
        edges
    }

    fn trace(&self, label: u32, cells: &[usize]) -> Result<Geometry<f64>> {
        let edges = self.edges(label, cells);
        let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::with_capacity(edges.len());
        for (i, (start, _)) in edges.iter().enumerate() {
            outgoing.entry(*start).or_default().push(i);
        }

        let direction = |e: usize| {
            let ((x0, y0), (x1, y1)) = edges[e];
            (x1 - x0, y1 - y0)
        };
        let successor = |e: usize| -> Option<usize> {
            let candidates = outgoing.get(&edges[e].1)?;
            if candidates.len() == 1 {
                return Some(candidates[0]);
            }
            let (dx, dy) = direction(e);
            let wanted = if self.eight_connected { (dy, -dx) } else { (-dy, dx) };
            candidates.iter().copied().find(|&n| direction(n) == wanted)
        };

        let mut visited = vec![false; edges.len()];
        let mut exteriors: Vec<LineString<f64>> = Vec::new();
        let mut holes: Vec<LineString<f64>> = Vec::new();

        for first in 0..edges.len() {
            if visited[first] {
                continue;
            }
            let mut ring: Vec<Vertex> = Vec::new();
            let mut previous = None;
            let mut e = first;
            loop {
                visited[e] = true;
                let d = direction(e);
                if previous != Some(d) {
                    ring.push(edges[e].0);
                }
                previous = Some(d);
                e = successor(e).ok_or_else(|| {
                    Error::Algorithm("open boundary while tracing component".into())
                })?;
                if e == first {
                    break;
                }
                if visited[e] {
                    return Err(Error::Algorithm("boundary walk revisited an edge".into()));
                }
            }
            if previous == Some(direction(first)) {
                ring.remove(0);
            }

            let area2: i64 = ring
                .iter()
                .zip(ring.iter().cycle().skip(1))
                .map(|(&(x0, y0), &(x1, y1))| x0 * y1 - x1 * y0)
                .sum();
            let line = self.to_line(&ring);
            if area2 > 0 {
                exteriors.push(line);
            } else {
                holes.push(line);
            }
        }

        Ok(assemble(exteriors, holes))
    }

    fn to_line(&self, ring: &[Vertex]) -> LineString<f64> {
        let mut coords: Vec<Coord<f64>> = ring
            .iter()
            .map(|&(x, y)| {
                let (gx, gy) = self.transform.fractional_to_geo(x as f64, y as f64);
                Coord { x: gx, y: gy }
            })
            .collect();
        if let Some(&first) = coords.first() {
            coords.push(first);
        }
        LineString::new(coords)
    }
}

fn assemble(exteriors: Vec<LineString<f64>>, holes: Vec<LineString<f64>>) -> Geometry<f64> {
    if exteriors.len() == 1 {
        let exterior = exteriors.into_iter().next().unwrap_or_else(|| LineString::new(vec![]));
        return Geometry::Polygon(Polygon::new(exterior, holes));
    }

    let shells: Vec<Polygon<f64>> = exteriors
        .iter()
        .map(|e| Polygon::new(e.clone(), vec![]))
        .collect();
    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); exteriors.len()];
    for hole in holes {
        let hole_poly = Polygon::new(hole.clone(), vec![]);
        let owner = shells.iter().position(|s| s.contains(&hole_poly)).unwrap_or(0);
        interiors[owner].push(hole);
    }

    Geometry::MultiPolygon(MultiPolygon::new(
        exteriors
            .into_iter()
            .zip(interiors)
            .map(|(e, h)| Polygon::new(e, h))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::Area;
    use terraval_core::raster::Raster;

    fn mask(values: Vec<u8>, rows: usize, cols: usize) -> Mask {
        let mut m = Raster::from_vec(values, rows, cols).unwrap();
        m.set_transform(GeoTransform::new(700_000.0, 3_100_000.0, 10.0, -10.0));
        m.set_crs(Some(CRS::from_epsg(32643)));
        m.set_nodata(Some(MASK_NODATA));
        m
    }

    fn polygon(feature: &Feature) -> &Polygon<f64> {
        match feature.geometry.as_ref().unwrap() {
            Geometry::Polygon(p) => p,
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn test_single_cell() {
        let m = mask(vec![0, 0, 0, 0, 1, 0, 0, 0, 0], 3, 3);
        let fc = polygonize(&m, None, &PolygonizeParams::default()).unwrap();
        assert_eq!(fc.len(), 1);

        let f = &fc.features[0];
        let p = polygon(f);
        assert_eq!(p.exterior().0.len(), 5);
        assert!(p.interiors().is_empty());
        assert_relative_eq!(p.unsigned_area(), 100.0);
        // counter-clockwise exterior in map coordinates
        assert!(p.signed_area() > 0.0);
        assert_eq!(f.get_property("label"), Some(&AttributeValue::Int(1)));
        assert_eq!(f.get_property("hectares"), Some(&AttributeValue::Float(0.01)));
    }

    #[test]
    fn test_collinear_vertices_removed() {
        let m = mask(vec![1, 1, 1, 1], 1, 4);
        let fc = polygonize(&m, None, &PolygonizeParams::default()).unwrap();
        let p = polygon(&fc.features[0]);
        assert_eq!(p.exterior().0.len(), 5);
        assert_relative_eq!(p.unsigned_area(), 400.0);
    }

    #[test]
    fn test_diagonal_cells_connectivity() {
        let m = mask(vec![1, 0, 0, 1], 2, 2);

        let four = polygonize(&m, None, &PolygonizeParams::default()).unwrap();
        assert_eq!(four.len(), 2);

        let params = PolygonizeParams {
            eight_connected: true,
            ..Default::default()
        };
        let eight = polygonize(&m, None, &params).unwrap();
        assert_eq!(eight.len(), 1);
        let p = polygon(&eight.features[0]);
        assert_eq!(p.exterior().0.len(), 9);
        assert_relative_eq!(p.unsigned_area(), 200.0);
    }

    #[test]
    fn test_hole_is_attached() {
        #[rustfmt::skip]
        let m = mask(vec![
            1, 1, 1,
            1, 0, 1,
            1, 1, 1,
        ], 3, 3);
        let fc = polygonize(&m, None, &PolygonizeParams::default()).unwrap();
        assert_eq!(fc.len(), 1);
        let p = polygon(&fc.features[0]);
        assert_eq!(p.interiors().len(), 1);
        assert!(p.interiors()[0].0.len() == 5);
        assert_relative_eq!(p.unsigned_area(), 800.0);
        match fc.features[0].get_property("hectares") {
            Some(AttributeValue::Float(ha)) => assert_relative_eq!(*ha, 0.08, epsilon = 1e-12),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_masked_cells_are_background() {
        let m = mask(vec![1, 255, 1], 1, 3);
        let params = PolygonizeParams {
            label_property: "risk_zone".into(),
            ..Default::default()
        };
        let fc = polygonize(&m, None, &params).unwrap();
        assert_eq!(fc.len(), 2);
        assert!(fc.iter().all(|f| f.get_property("risk_zone").is_some()));
    }

    #[test]
    fn test_batches_do_not_change_output() {
        let values: Vec<u8> = (0..400).map(|i| if (i * 7 + i / 20) % 3 == 0 { 1 } else { 0 }).collect();
        let m = mask(values, 20, 20);
        let one = polygonize(&m, None, &PolygonizeParams::default()).unwrap();
        for tile_scale in [2, 8, 16] {
            let params = PolygonizeParams {
                tile_scale,
                ..Default::default()
            };
            let many = polygonize(&m, None, &params).unwrap();
            assert_eq!(one.len(), many.len());
            for (a, b) in one.iter().zip(many.iter()) {
                assert_eq!(a.id, b.id);
                assert_eq!(a.geometry, b.geometry);
                assert_eq!(a.get_property("hectares"), b.get_property("hectares"));
            }
        }
    }

    #[test]
    fn test_parameter_validation() {
        let m = mask(vec![1; 4], 2, 2);
        let bad_tiles = PolygonizeParams {
            tile_scale: 17,
            ..Default::default()
        };
        assert!(polygonize(&m, None, &bad_tiles).is_err());

        let wrong_crs = PolygonizeParams {
            crs: Some(CRS::wgs84()),
            ..Default::default()
        };
        assert!(matches!(polygonize(&m, None, &wrong_crs), Err(Error::CrsMismatch(_, _))));

        let tight = PolygonizeParams {
            max_pixels: 3,
            ..Default::default()
        };
        assert!(matches!(
            polygonize(&m, None, &tight),
            Err(Error::PixelBudgetExceeded { required: 4, .. })
        ));
    }
}
