//! Cell neighborhoods for the majority filter and component tracing

/// Defines a neighborhood pattern around a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// 3x3 without corners (4 neighbors + center): edge connectivity
    Rook,
    /// 3x3 neighborhood (8 neighbors + center): edge and corner connectivity
    Queen,
    /// Square window of given radius in cells
    Square(usize),
}

impl Neighborhood {
    /// Neighborhood for 4- or 8-connected component tracing
    pub fn connectivity(eight_connected: bool) -> Self {
        if eight_connected {
            Neighborhood::Queen
        } else {
            Neighborhood::Rook
        }
    }

    /// Get the radius of the neighborhood
    pub fn radius(&self) -> usize {
        match self {
            Neighborhood::Rook | Neighborhood::Queen => 1,
            Neighborhood::Square(r) => *r,
        }
    }

    /// Check if a relative position is within this neighborhood
    pub fn contains(&self, dr: isize, dc: isize) -> bool {
        match self {
            Neighborhood::Rook => dr.abs() + dc.abs() <= 1,
            Neighborhood::Queen => dr.abs() <= 1 && dc.abs() <= 1,
            Neighborhood::Square(r) => {
                let r = *r as isize;
                dr.abs() <= r && dc.abs() <= r
            }
        }
    }

    /// Relative positions in this neighborhood, center included
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let r = self.radius() as isize;
        let mut offsets = Vec::new();

        for dr in -r..=r {
            for dc in -r..=r {
                if self.contains(dr, dc) {
                    offsets.push((dr, dc));
                }
            }
        }

        offsets
    }

    /// Get offsets excluding the center cell
    pub fn offsets_no_center(&self) -> Vec<(isize, isize)> {
        self.offsets()
            .into_iter()
            .filter(|&(dr, dc)| dr != 0 || dc != 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighborhood_offsets() {
        assert_eq!(Neighborhood::Queen.offsets().len(), 9);
        assert_eq!(Neighborhood::Rook.offsets().len(), 5);
        assert_eq!(Neighborhood::Square(2).offsets().len(), 25);
        assert!(!Neighborhood::Rook.contains(1, 1));
    }

    #[test]
    fn test_connectivity() {
        assert_eq!(Neighborhood::connectivity(false).offsets_no_center().len(), 4);
        assert_eq!(Neighborhood::connectivity(true).offsets_no_center().len(), 8);
    }
}
