//! I/O for the static layers (elevation, landcover) and scene bands

mod native;

pub use native::{read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer};
