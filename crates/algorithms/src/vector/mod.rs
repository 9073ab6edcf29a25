//! Vector algorithms
//!
//! - Polygonize: boolean mask to polygon features

mod polygonize;

pub use polygonize::{polygonize, PolygonizeParams};
