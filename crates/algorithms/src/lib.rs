//! # Terra-Valuation Algorithms
//!
//! The local raster engine behind the audit workflow.
//!
//! ## Available Algorithm Categories
//!
//! - **imagery**: NDVI, scene compositing, class remapping, vegetation-loss detection
//! - **mask**: thresholds and boolean algebra over masks
//! - **statistics**: focal min/mode, region reduction under a pixel budget
//! - **terrain**: true cell area, local relief and relief zones
//! - **vector**: mask polygonization
//!
//! Every operation returns a new raster; inputs are never modified.

pub mod imagery;
pub mod mask;
pub mod resample;
pub mod statistics;
pub mod terrain;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        composite_ndvi, ndvi, normalized_difference, remap, vegetation_loss, BandPair,
        Compositing, DateWindow, LossRule, RemapParams, VegetationLoss,
    };
    pub use crate::mask::{
        and, not, restrict_to, self_mask, threshold, to_values, update_mask, Comparison,
    };
    pub use crate::resample::{align_to, AnalysisGrid};
    pub use crate::statistics::{focal_min, focal_mode, reduce_area_sum, Kernel, ReduceParams};
    pub use crate::terrain::{
        cell_dimensions, local_relief, relief_support, relief_zones, ReliefParams, ReliefZones,
        ReliefZoning,
    };
    pub use crate::vector::{polygonize, PolygonizeParams};
    pub use terraval_core::prelude::*;
}
