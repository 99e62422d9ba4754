//! Map tile geometry.
//!
//! Tiles form a fixed three-level hierarchy over the covered sea area. The
//! root tile (scale 1) spans the whole extent, scale 2 splits it into
//! half-degree by one-degree cells and scale 3 splits those again into
//! quarter-degree by half-degree cells.

use serde::Serialize;

use crate::errors::AisStoreError;

/// Southern edge of the covered extent, in degrees
pub const ROOT_SOUTH: f64 = 54.5;
/// Northern edge of the covered extent, in degrees
pub const ROOT_NORTH: f64 = 57.5;
/// Western edge of the covered extent, in degrees
pub const ROOT_WEST: f64 = 7.0;
/// Eastern edge of the covered extent, in degrees
pub const ROOT_EAST: f64 = 13.0;

/// Zoom scale of a map tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scale {
    /// Scale 1, the single tile covering the whole extent
    Root = 1,
    /// Scale 2
    Region = 2,
    /// Scale 3
    Local = 3,
}

impl Scale {
    /// All scales, from the root down
    pub const ALL: [Scale; 3] = [Scale::Root, Scale::Region, Scale::Local];

    /// Get the numeric scale value
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Cell size as (latitude step, longitude step) in degrees.
    ///
    /// None for the root scale, which is not a regular grid.
    fn cell_size(&self) -> Option<(f64, f64)> {
        match self {
            Scale::Root => None,
            Scale::Region => Some((0.5, 1.0)),
            Scale::Local => Some((0.25, 0.5)),
        }
    }
}

impl TryFrom<i64> for Scale {
    type Error = AisStoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Scale::Root),
            2 => Ok(Scale::Region),
            3 => Ok(Scale::Local),
            other => Err(AisStoreError::InvalidScale(other)),
        }
    }
}

/// Boundaries of a map tile in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileBounds {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl TileBounds {
    /// The root extent
    pub const ROOT: TileBounds = TileBounds {
        south: ROOT_SOUTH,
        north: ROOT_NORTH,
        west: ROOT_WEST,
        east: ROOT_EAST,
    };
}

/// Resolve the bounds of the tile at `scale` containing a position.
///
/// Grid cells are half-open: a position lying exactly on a grid line
/// belongs to the cell north or east of the line.
pub fn resolve_tile(scale: Scale, longitude: f64, latitude: f64) -> TileBounds {
    match scale.cell_size() {
        None => TileBounds::ROOT,
        Some((lat_step, lon_step)) => {
            let (south, north) = cell_edges(latitude, lat_step);
            let (west, east) = cell_edges(longitude, lon_step);
            TileBounds {
                south,
                north,
                west,
                east,
            }
        }
    }
}

/// Lower and upper edge of the grid cell of width `step` containing `value`
fn cell_edges(value: f64, step: f64) -> (f64, f64) {
    let cells = 1.0 / step;
    let index = (value * cells).floor();
    (index / cells, (index + 1.0) / cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_scale_ignores_position() {
        let expected = TileBounds {
            south: 54.5,
            north: 57.5,
            west: 7.0,
            east: 13.0,
        };
        assert_eq!(resolve_tile(Scale::Root, 11.47914, 54.519373), expected);
        assert_eq!(resolve_tile(Scale::Root, -70.0, 10.0), expected);
    }

    #[test]
    fn region_scale() {
        let bounds = resolve_tile(Scale::Region, 11.47914, 54.519373);
        assert_eq!(
            bounds,
            TileBounds {
                south: 54.5,
                north: 55.0,
                west: 11.0,
                east: 12.0,
            }
        );
    }

    #[test]
    fn local_scale() {
        let bounds = resolve_tile(Scale::Local, 11.47914, 54.519373);
        assert_eq!(
            bounds,
            TileBounds {
                south: 54.5,
                north: 54.75,
                west: 11.0,
                east: 11.5,
            }
        );
    }

    #[test]
    fn grid_line_belongs_to_northeast_cell() {
        let bounds = resolve_tile(Scale::Region, 11.0, 55.0);
        assert_eq!(
            bounds,
            TileBounds {
                south: 55.0,
                north: 55.5,
                west: 11.0,
                east: 12.0,
            }
        );

        let bounds = resolve_tile(Scale::Local, 11.5, 54.75);
        assert_eq!(bounds.south, 54.75);
        assert_eq!(bounds.north, 55.0);
        assert_eq!(bounds.west, 11.5);
        assert_eq!(bounds.east, 12.0);
    }

    #[test]
    fn scale_from_integer() {
        assert_eq!(Scale::try_from(1).unwrap(), Scale::Root);
        assert_eq!(Scale::try_from(3).unwrap(), Scale::Local);
        assert!(matches!(
            Scale::try_from(4),
            Err(AisStoreError::InvalidScale(4))
        ));
        assert_eq!(Scale::Region.value(), 2);
    }
}
