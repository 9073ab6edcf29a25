//! Raster data structures and operations

mod element;
mod geotransform;
mod grid;
mod mask;
mod neighborhood;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::Raster;
pub use mask::{Mask, MASK_FALSE, MASK_NODATA, MASK_TRUE};
pub use neighborhood::Neighborhood;
