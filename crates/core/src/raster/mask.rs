//! Boolean mask encoding
//!
//! Masks are `Raster<u8>`: 1 is true, 0 is false, 255 is masked (no data).
//! Masked cells never count as true and never contribute to aggregation.

use super::Raster;

/// Boolean raster
pub type Mask = Raster<u8>;

pub const MASK_FALSE: u8 = 0;
pub const MASK_TRUE: u8 = 1;
pub const MASK_NODATA: u8 = 255;

impl Raster<u8> {
    /// Number of true cells
    pub fn count_true(&self) -> usize {
        self.data().iter().filter(|&&v| v == MASK_TRUE).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_true_ignores_nodata() {
        let mask: Mask = Raster::from_vec(vec![1, 0, 255, 1], 2, 2).unwrap();
        assert_eq!(mask.count_true(), 2);
    }
}
