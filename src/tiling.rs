//! Fixed geographic tile grid.
//!
//! Tiles are 1°×1° cells over the WGS-ish plane the store uses: 180 rows of
//! 360 columns, row 0 at latitude −90, column 0 at longitude −180. The id is
//! the row-major cell index, which matches how the build pipeline assigns
//! features to tiles.

use crate::GeographicBoundingBox;

pub const GRID_COLUMNS: u32 = 360;
pub const GRID_ROWS: u32 = 180;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

impl TileId {
    pub fn from_cell(row: u32, column: u32) -> Self {
        Self(row * GRID_COLUMNS + column)
    }

    pub fn row(&self) -> u32 {
        self.0 / GRID_COLUMNS
    }

    pub fn column(&self) -> u32 {
        self.0 % GRID_COLUMNS
    }
}

fn lat_cell(lat: f32) -> u32 {
    let row = lat.floor() as i64 + 90;
    row.clamp(0, i64::from(GRID_ROWS) - 1) as u32
}

fn lon_cell(lon: f32) -> u32 {
    let column = lon.floor() as i64 + 180;
    column.clamp(0, i64::from(GRID_COLUMNS) - 1) as u32
}

/// Ids of every cell intersecting the box, in (row, column) order.
///
/// This is the tile cover used by [`crate::Store::for_each_feature`]; the
/// row-major order here fixes the tile visit order of a query.
pub fn tiles_for_bounding_box(bounds: &GeographicBoundingBox) -> Vec<TileId> {
    if bounds.is_empty() {
        return Vec::new();
    }

    let row_min = lat_cell(bounds.min_lat);
    let row_max = lat_cell(bounds.max_lat);
    let col_min = lon_cell(bounds.min_lon);
    let col_max = lon_cell(bounds.max_lon);

    let mut tiles =
        Vec::with_capacity(((row_max - row_min + 1) * (col_max - col_min + 1)) as usize);

    for row in row_min..=row_max {
        for column in col_min..=col_max {
            tiles.push(TileId::from_cell(row, column));
        }
    }

    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cell_cover() {
        let bounds = GeographicBoundingBox::new(53.2, -113.8, 53.9, -113.1);
        let tiles = tiles_for_bounding_box(&bounds);

        assert_eq!(tiles, vec![TileId::from_cell(143, 66)]);
        assert_eq!(tiles[0].row(), 143);
        assert_eq!(tiles[0].column(), 66);
    }

    #[test]
    fn cover_is_row_major() {
        let bounds = GeographicBoundingBox::new(0.5, 0.5, 1.5, 1.5);
        let tiles = tiles_for_bounding_box(&bounds);

        assert_eq!(
            tiles,
            vec![
                TileId::from_cell(90, 180),
                TileId::from_cell(90, 181),
                TileId::from_cell(91, 180),
                TileId::from_cell(91, 181),
            ]
        );
    }

    #[test]
    fn empty_box_covers_nothing() {
        assert!(tiles_for_bounding_box(&GeographicBoundingBox::EMPTY).is_empty());
    }

    #[test]
    fn poles_clamp_into_grid() {
        let bounds = GeographicBoundingBox::new(89.5, 179.5, 95.0, 185.0);
        let tiles = tiles_for_bounding_box(&bounds);

        assert_eq!(tiles, vec![TileId::from_cell(179, 359)]);
    }
}
