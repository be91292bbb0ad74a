//! Affine mapping between world coordinates and geo-array cell indices.

use crate::models::{Dimensions, SpatialExtent, SpatialResolution};

/// Forward and inverse mapping for one geo-array's native grid.
///
/// The grid origin is the north-west corner of the extent: columns grow eastward from
/// `xmin` and rows grow southward from `ymax`. Forward mapping floors the offset so
/// that coordinates just inside a cell boundary land in that cell; inverse mapping
/// returns the cell center. The round trip is exact for cell centers only.
#[derive(Clone, Copy, Debug)]
pub struct Grid<'a> {
    extent: &'a SpatialExtent,
    resolution: &'a SpatialResolution,
    dimensions: &'a Dimensions,
}

impl<'a> Grid<'a> {
    /// Return a new Grid over an array's extent, resolution and dimension bounds.
    pub fn new(
        extent: &'a SpatialExtent,
        resolution: &'a SpatialResolution,
        dimensions: &'a Dimensions,
    ) -> Self {
        Grid {
            extent,
            resolution,
            dimensions,
        }
    }

    /// Column index of the cell containing world coordinate `x`.
    pub fn col(&self, x: f64) -> i64 {
        let offset = (x - self.extent.xmin) / self.resolution.x;
        offset.floor() as i64 + self.dimensions.x.min_index
    }

    /// Row index of the cell containing world coordinate `y`.
    ///
    /// Rows are counted downward from `ymax`.
    pub fn row(&self, y: f64) -> i64 {
        let offset = (self.extent.ymax - y) / self.resolution.y;
        offset.floor() as i64 + self.dimensions.y.min_index
    }

    /// World `x` coordinate of the center of column `col`.
    pub fn x(&self, col: i64) -> f64 {
        let offset = (col - self.dimensions.x.min_index) as f64;
        self.extent.xmin + offset * self.resolution.x + self.resolution.x / 2.0
    }

    /// World `y` coordinate of the center of row `row`.
    pub fn y(&self, row: i64) -> f64 {
        let offset = (row - self.dimensions.y.min_index) as f64;
        self.extent.ymax - offset * self.resolution.y - self.resolution.y / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dimension;

    fn make_parts() -> (SpatialExtent, SpatialResolution, Dimensions) {
        let extent = SpatialExtent {
            xmin: 0.0,
            ymin: 0.0,
            xmax: 100.0,
            ymax: 100.0,
        };
        let resolution = SpatialResolution { x: 1.0, y: 1.0 };
        let dimensions = Dimensions {
            x: Dimension::new("col_id", "x", 0, 99).unwrap(),
            y: Dimension::new("row_id", "y", 0, 99).unwrap(),
            t: Dimension::new("time_id", "t", 0, 0).unwrap(),
        };
        (extent, resolution, dimensions)
    }

    #[test]
    fn forward_mapping() {
        let (extent, resolution, dimensions) = make_parts();
        let grid = Grid::new(&extent, &resolution, &dimensions);
        assert_eq!(0, grid.col(0.5));
        assert_eq!(0, grid.col(0.0));
        assert_eq!(99, grid.col(99.5));
        assert_eq!(0, grid.row(99.5));
        assert_eq!(99, grid.row(0.5));
    }

    #[test]
    fn inverse_returns_cell_center() {
        let (extent, resolution, dimensions) = make_parts();
        let grid = Grid::new(&extent, &resolution, &dimensions);
        assert_eq!(0.5, grid.x(0));
        assert_eq!(1.5, grid.x(1));
        assert_eq!(99.5, grid.y(0));
        assert_eq!(0.5, grid.y(99));
    }

    #[test]
    fn center_round_trip_is_exact() {
        let (extent, resolution, dimensions) = make_parts();
        let grid = Grid::new(&extent, &resolution, &dimensions);
        for cell in [0, 1, 42, 99] {
            assert_eq!(cell, grid.col(grid.x(cell)));
            assert_eq!(cell, grid.row(grid.y(cell)));
        }
    }

    #[test]
    fn floor_not_truncation_for_negative_offsets() {
        let (extent, resolution, dimensions) = make_parts();
        let grid = Grid::new(&extent, &resolution, &dimensions);
        // Coordinates west of the extent must map below min_index, not to it.
        assert_eq!(-1, grid.col(-0.5));
        // Coordinates north of the extent map above ymax to a negative row.
        assert_eq!(-1, grid.row(100.5));
    }

    #[test]
    fn nonzero_min_index() {
        let extent = SpatialExtent {
            xmin: -54.0,
            ymin: -12.0,
            xmax: -50.0,
            ymax: -10.0,
        };
        let resolution = SpatialResolution { x: 0.5, y: 0.5 };
        let dimensions = Dimensions {
            x: Dimension::new("col_id", "x", 10, 17).unwrap(),
            y: Dimension::new("row_id", "y", 20, 23).unwrap(),
            t: Dimension::new("time_id", "t", 0, 0).unwrap(),
        };
        let grid = Grid::new(&extent, &resolution, &dimensions);
        assert_eq!(10, grid.col(-54.0));
        assert_eq!(17, grid.col(-50.1));
        assert_eq!(20, grid.row(-10.1));
        assert_eq!(-53.75, grid.x(10));
        assert_eq!(-10.25, grid.y(20));
        assert_eq!(10, grid.col(grid.x(10)));
        assert_eq!(23, grid.row(grid.y(23)));
    }
}
