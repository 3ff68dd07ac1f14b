//! Drawable shape variants.
//!
//! One tagged variant per render layer, with a shared header of screen
//! coordinates and z-index. Lower z draws first; the renderer's queue relies
//! only on the ordering relation, not the concrete values.

use crate::Coordinate;
use crate::canvas::Canvas;
use crate::style::{LineStyle, Rgba, TextStyle};

/// Subtype of a filled area shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GeoKind {
    Plain,
    Desert,
    NationalPark,
    Forest,
    Mountains,
    Lakes,
    Residential,
    Buildings,
}

impl GeoKind {
    fn z_index(self) -> i32 {
        match self {
            GeoKind::Plain => 10,
            GeoKind::Desert => 12,
            GeoKind::NationalPark => 15,
            GeoKind::Forest => 18,
            GeoKind::Mountains => 20,
            GeoKind::Lakes => 25,
            GeoKind::Residential => 30,
            GeoKind::Buildings => 35,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ShapeKind {
    GeoFeature { kind: GeoKind, fill: Rgba },
    Waterway { polygon: bool, fill: Rgba, line: LineStyle },
    Road(LineStyle),
    Highway(LineStyle),
    Railway(LineStyle),
    Border(LineStyle),
    PopulatedPlace { label: String, style: TextStyle },
}

impl ShapeKind {
    fn z_index(&self) -> i32 {
        match self {
            ShapeKind::GeoFeature { kind, .. } => kind.z_index(),
            ShapeKind::Waterway { .. } => 40,
            ShapeKind::Road(_) => 50,
            ShapeKind::Railway(_) => 55,
            ShapeKind::Highway(_) => 60,
            ShapeKind::Border(_) => 70,
            ShapeKind::PopulatedPlace { .. } => 90,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Shape {
    pub screen_coordinates: Vec<Coordinate>,
    pub z_index: i32,
    kind: ShapeKind,
}

impl Shape {
    pub(crate) fn new(kind: ShapeKind, screen_coordinates: Vec<Coordinate>) -> Self {
        let z_index = kind.z_index();

        Self {
            screen_coordinates,
            z_index,
            kind,
        }
    }

    pub fn geo_kind(&self) -> Option<GeoKind> {
        match self.kind {
            ShapeKind::GeoFeature { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Fewer than two screen coordinates cannot produce a stroke or a fill;
    /// the renderer skips such shapes silently.
    pub fn is_degenerate(&self) -> bool {
        self.screen_coordinates.len() < 2
    }

    /// Map every coordinate from the source plane to screen pixels. Screen Y
    /// grows downward, so the vertical axis flips.
    pub fn translate_and_scale(&mut self, origin_x: f32, origin_y: f32, scale: f32, canvas_height: f32) {
        for coordinate in self.screen_coordinates.iter_mut() {
            *coordinate = Coordinate::new(
                (coordinate.x - origin_x) * scale,
                canvas_height - (coordinate.y - origin_y) * scale,
            );
        }
    }

    pub fn draw<C: Canvas>(&self, canvas: &mut C) {
        let points = self.screen_coordinates.as_slice();

        match &self.kind {
            ShapeKind::GeoFeature { fill, .. } => canvas.polygon(points, *fill),
            ShapeKind::Waterway { polygon, fill, line } => {
                if *polygon {
                    canvas.polygon(points, *fill);
                } else {
                    canvas.line(points, line.color, line.width, None);
                }
            }
            ShapeKind::Road(line) | ShapeKind::Highway(line) => {
                canvas.line(points, line.color, line.width, None);
            }
            ShapeKind::Railway(line) | ShapeKind::Border(line) => {
                canvas.line(points, line.color, line.width, line.dash.as_deref());
            }
            ShapeKind::PopulatedPlace { label, style } => {
                if let Some(anchor) = points.first() {
                    canvas.text(*anchor, label, style);
                }
            }
        }
    }
}
