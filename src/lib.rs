//! Render still map images from a memory-mapped feature store.
//!
//! A store file holds OSM-derived features grouped by tile id. [`Store`]
//! maps the file read-only and streams the features covering a geographic
//! bounding box without deserializing anything the query does not visit.
//! Each feature is classified into an [`Environment`] category, turned into
//! a z-ordered [`Shape`], and composited onto an RGBA canvas.
//!
//! ```no_run
//! use still_maps::{GeographicBoundingBox, Renderer, RenderQueue, ScreenBoundingBox, Store};
//!
//! # fn main() -> still_maps::Result<()> {
//! let store = Store::open("planet.tiles")?;
//! let renderer = Renderer::new(Default::default());
//!
//! let bounds = GeographicBoundingBox::new(53.0, -114.0, 54.0, -113.0);
//! let mut bbox = ScreenBoundingBox::new();
//! let mut queue = RenderQueue::new();
//!
//! store.for_each_feature(&bounds, |feature| {
//!     renderer.tessellate(feature, &mut bbox, &mut queue);
//!     true
//! })?;
//!
//! let image = renderer.render(queue, &bbox, 1024, 768);
//! # Ok(())
//! # }
//! ```

mod canvas;
mod classify;
mod error;
mod layout;
mod render;
mod shape;
mod store;
mod style;
mod text;
mod tiling;

pub use canvas::{Canvas, RasterCanvas};
pub use classify::{Environment, PropertySet, classify};
pub use error::{Error, Result};
pub use layout::{Coordinates, Utf16Str};
pub use render::{RenderQueue, Renderer, ScreenBoundingBox};
pub use shape::{GeoKind, Shape};
pub use store::Store;
pub use style::{LineStyle, Rgba, StyleTable, TextStyle};
pub use tiling::{TileId, tiles_for_bounding_box};

/// A planar position in the source file's coordinate system.
///
/// `x` runs along longitude, `y` along latitude. Downstream code treats the
/// plane as flat; no reprojection happens anywhere in this crate.
#[derive(Debug, Copy, Clone, PartialEq)]
#[repr(C)]
pub struct Coordinate {
    pub x: f32,
    pub y: f32,
}

impl Coordinate {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Coordinate {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Geometry of a stored feature.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GeometryKind {
    Point = 0,
    Line = 1,
    Polygon = 2,
    MultiPolygon = 3,
}

impl TryFrom<u8> for GeometryKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        let kind = match value {
            0 => GeometryKind::Point,
            1 => GeometryKind::Line,
            2 => GeometryKind::Polygon,
            3 => GeometryKind::MultiPolygon,
            _ => return Err(Error::UnknownGeometryKind(value)),
        };

        Ok(kind)
    }
}

/// Inclusive geographic query window, in the store's planar system.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeographicBoundingBox {
    pub min_lat: f32,
    pub min_lon: f32,
    pub max_lat: f32,
    pub max_lon: f32,
}

impl GeographicBoundingBox {
    /// The box that contains nothing and covers no tiles.
    pub const EMPTY: Self = Self {
        min_lat: f32::INFINITY,
        min_lon: f32::INFINITY,
        max_lat: f32::NEG_INFINITY,
        max_lon: f32::NEG_INFINITY,
    };

    pub fn new(min_lat: f32, min_lon: f32, max_lat: f32, max_lon: f32) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Inclusive on both axes; `x` is longitude, `y` latitude.
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        coordinate.x >= self.min_lon
            && coordinate.x <= self.max_lon
            && coordinate.y >= self.min_lat
            && coordinate.y <= self.max_lat
    }

    pub fn is_empty(&self) -> bool {
        self.min_lat > self.max_lat || self.min_lon > self.max_lon
    }
}

/// One hydrated feature, valid only for the duration of the
/// [`Store::for_each_feature`] callback that received it.
///
/// The label and coordinates borrow directly from the mapped region; the
/// name is the only owned field, looked up from the `name` property.
#[derive(Debug)]
pub struct MapFeatureData<'a> {
    pub id: i64,
    pub geometry: GeometryKind,
    pub label: Option<Utf16Str<'a>>,
    pub coordinates: Coordinates<'a>,
    pub environment: Environment,
    pub name: Option<String>,
}

#[cfg(test)]
pub(crate) mod fixture;
