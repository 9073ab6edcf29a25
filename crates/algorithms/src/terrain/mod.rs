//! Terrain analysis algorithms
//!
//! - Cell area: true per-cell area on the WGS84 spheroid
//! - Relief: height above local ground level, Zone A / Zone B classification

mod cell_area;
mod relief;

pub use cell_area::{
    cell_dimensions, metres_to_degrees, metric_cell_size, CellDimensions, RowAreas,
};
pub use relief::{
    local_relief, relief_support, relief_zones, ReliefParams, ReliefZones, ReliefZoning,
};
