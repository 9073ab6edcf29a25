//! Imagery analysis algorithms
//!
//! - Spectral indices: normalized difference, NDVI
//! - Compositing: greenest-pixel mosaic and per-band temporal median
//! - Remap: discrete class codes to values
//! - Change detection: vegetated-to-bare transitions between two years

mod change_detection;
mod composite;
mod indices;
mod remap;

pub use change_detection::{vegetation_loss, LossRule, VegetationLoss};
pub use composite::{composite_ndvi, BandPair, Compositing, DateWindow};
pub use indices::{ndvi, normalized_difference};
pub use remap::{remap, RemapParams};
