//! Z-ordered rasterization pipeline.
//!
//! [`Renderer::tessellate`] turns classified features into [`Shape`]s,
//! queueing them by z-index while growing the screen bounding box.
//! [`Renderer::render`] drains the queue bottom-up onto a white canvas.

use image::RgbaImage;
use log::{debug, trace};

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::canvas::{Canvas, RasterCanvas};
use crate::classify::Environment;
use crate::shape::{GeoKind, Shape, ShapeKind};
use crate::style::StyleTable;
use crate::{Coordinate, MapFeatureData};

/// Axis-aligned cover of every tessellated shape, in source-plane
/// coordinates. Grows monotonically; starts inverted so the first expand
/// snaps to the first coordinate.
#[derive(Debug, Copy, Clone)]
pub struct ScreenBoundingBox {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl ScreenBoundingBox {
    pub fn new() -> Self {
        Self {
            min_x: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            min_y: f32::INFINITY,
            max_y: f32::NEG_INFINITY,
        }
    }

    pub fn expand(&mut self, coordinate: Coordinate) {
        self.min_x = self.min_x.min(coordinate.x);
        self.max_x = self.max_x.max(coordinate.x);
        self.min_y = self.min_y.min(coordinate.y);
        self.max_y = self.max_y.max(coordinate.y);
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

impl Default for ScreenBoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

struct QueueEntry {
    shape: Shape,
    sequence: u64,
}

impl QueueEntry {
    fn key(&self) -> (i32, u64) {
        (self.shape.z_index, self.sequence)
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Reversed so the binary max-heap pops the smallest (z, sequence) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// Min-heap of shapes keyed by z-index, ties broken by insertion order.
pub struct RenderQueue {
    heap: BinaryHeap<QueueEntry>,
    next_sequence: u64,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    pub fn push(&mut self, shape: Shape) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.heap.push(QueueEntry { shape, sequence });
    }

    pub fn pop(&mut self) -> Option<Shape> {
        self.heap.pop().map(|entry| entry.shape)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the style table; turns features into shapes and shapes into pixels.
pub struct Renderer {
    style: StyleTable,
}

impl Renderer {
    pub fn new(style: StyleTable) -> Self {
        Self { style }
    }

    /// The shape variant a feature renders as, or `None` for categories the
    /// renderer drops.
    pub fn shape(&self, feature: &MapFeatureData<'_>) -> Option<Shape> {
        let style = &self.style;

        let geo = |kind: GeoKind| {
            let fill = match kind {
                GeoKind::Plain => style.plain,
                GeoKind::Desert => style.desert,
                GeoKind::NationalPark => style.national_park,
                GeoKind::Forest => style.forest,
                GeoKind::Mountains => style.mountains,
                GeoKind::Lakes => style.lakes,
                GeoKind::Residential => style.residential,
                GeoKind::Buildings => style.buildings,
            };

            ShapeKind::GeoFeature { kind, fill }
        };

        let kind = match feature.environment {
            Environment::Unknown => return None,
            Environment::Road => ShapeKind::Road(style.road.clone()),
            Environment::Highway => ShapeKind::Highway(style.highway.clone()),
            Environment::Water => ShapeKind::Waterway {
                polygon: matches!(
                    feature.geometry,
                    crate::GeometryKind::Polygon | crate::GeometryKind::MultiPolygon
                ),
                fill: style.water_fill,
                line: style.waterway.clone(),
            },
            Environment::Border => ShapeKind::Border(style.border.clone()),
            Environment::Railway => ShapeKind::Railway(style.railway.clone()),
            Environment::PopulatedPlace => {
                let label = feature
                    .label
                    .map(|label| label.to_string())
                    .or_else(|| feature.name.clone())?;

                ShapeKind::PopulatedPlace {
                    label,
                    style: style.place.clone(),
                }
            }
            Environment::Plain => geo(GeoKind::Plain),
            Environment::Desert => geo(GeoKind::Desert),
            Environment::NationalPark => geo(GeoKind::NationalPark),
            Environment::Forest => geo(GeoKind::Forest),
            Environment::Mountains => geo(GeoKind::Mountains),
            Environment::Lakes => geo(GeoKind::Lakes),
            Environment::Civilian => geo(GeoKind::Residential),
            Environment::Buildings => geo(GeoKind::Buildings),
        };

        Some(Shape::new(kind, feature.coordinates.iter().collect()))
    }

    /// Queue the shape for a feature and grow `bbox` over its coordinates.
    /// Returns whether anything was enqueued.
    pub fn tessellate(
        &self,
        feature: &MapFeatureData<'_>,
        bbox: &mut ScreenBoundingBox,
        queue: &mut RenderQueue,
    ) -> bool {
        let Some(shape) = self.shape(feature) else {
            return false;
        };

        for coordinate in shape.screen_coordinates.iter() {
            bbox.expand(*coordinate);
        }

        trace!(
            "queued {:?} shape z={} with {} coordinates",
            feature.environment,
            shape.z_index,
            shape.screen_coordinates.len()
        );

        queue.push(shape);

        true
    }

    /// Drain the queue in z-order onto a fresh `width`×`height` canvas.
    /// An empty or degenerate scene yields the background-filled image.
    pub fn render(
        &self,
        queue: RenderQueue,
        bbox: &ScreenBoundingBox,
        width: u32,
        height: u32,
    ) -> RgbaImage {
        let mut canvas = RasterCanvas::new(width, height);
        canvas.fill(self.style.background);

        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            debug!("empty scene, returning background canvas");
            return canvas.into_image();
        }

        let scale = (width as f32 / bbox.width()).min(height as f32 / bbox.height());

        debug!(
            "rendering {} shapes at scale {scale} onto {width}x{height}",
            queue.len()
        );

        let mut queue = queue;

        while let Some(mut shape) = queue.pop() {
            if shape.is_degenerate() {
                continue;
            }

            shape.translate_and_scale(bbox.min_x, bbox.min_y, scale, height as f32);
            shape.draw(&mut canvas);
        }

        canvas.into_image()
    }
}
