//! Abstract drawing surface and the bundled CPU rasterizer.

use image::RgbaImage;

use crate::Coordinate;
use crate::style::{Rgba, TextStyle};
use crate::text::FontCollection;

/// The drawing primitives the shape model needs. Implementations own the
/// pixel (or display-list) representation.
pub trait Canvas {
    fn fill(&mut self, color: Rgba);
    fn line(&mut self, points: &[Coordinate], color: Rgba, width: f32, dash: Option<&[f32]>);
    fn polygon(&mut self, points: &[Coordinate], fill: Rgba);
    fn text(&mut self, anchor: Coordinate, text: &str, style: &TextStyle);
}

/// Scanline rasterizer over an RGBA buffer.
pub struct RasterCanvas {
    image: RgbaImage,
    fonts: Option<FontCollection>,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            fonts: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgba, coverage: f32) {
        if x < 0 || y < 0 || x >= i64::from(self.image.width()) || y >= i64::from(self.image.height())
        {
            return;
        }

        let alpha = (color.a * coverage).clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }

        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        let src = [color.r, color.g, color.b];

        for (channel, src) in pixel.0.iter_mut().take(3).zip(src) {
            let dst = *channel as f32 / 255.0;
            let out = src * alpha + dst * (1.0 - alpha);
            *channel = (out * 255.0).round() as u8;
        }

        let dst_a = pixel.0[3] as f32 / 255.0;
        pixel.0[3] = ((alpha + dst_a * (1.0 - alpha)) * 255.0).round() as u8;
    }

    /// Even-odd scanline fill sampling at pixel centers.
    fn fill_polygon(&mut self, points: &[Coordinate], color: Rgba) {
        if points.len() < 3 {
            return;
        }

        let min_y = points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let max_y = points.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);

        let y_start = (min_y.floor().max(0.0)) as i64;
        let y_end = (max_y.ceil().min(self.image.height() as f32)) as i64;

        let mut crossings: Vec<f32> = Vec::new();

        for y in y_start..y_end {
            let sample_y = y as f32 + 0.5;
            crossings.clear();

            for i in 0..points.len() {
                let p = points[i];
                let q = points[(i + 1) % points.len()];

                if (p.y <= sample_y) == (q.y <= sample_y) {
                    continue;
                }

                let t = (sample_y - p.y) / (q.y - p.y);
                crossings.push(p.x + t * (q.x - p.x));
            }

            crossings.sort_by(|a, b| a.total_cmp(b));

            for span in crossings.chunks_exact(2) {
                let x_start = (span[0] - 0.5).ceil().max(0.0) as i64;
                let x_end = ((span[1] - 0.5).floor().min(self.image.width() as f32 - 1.0)) as i64;

                for x in x_start..=x_end {
                    self.blend(x, y, color, 1.0);
                }
            }
        }
    }

    /// One stroked segment as a filled quad, butt-capped.
    fn stroke_segment(&mut self, a: Coordinate, b: Coordinate, color: Rgba, half_width: f32) {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let len = (dx * dx + dy * dy).sqrt();

        if len <= f32::EPSILON {
            return;
        }

        let nx = -dy / len * half_width;
        let ny = dx / len * half_width;

        let quad = [
            Coordinate::new(a.x + nx, a.y + ny),
            Coordinate::new(b.x + nx, b.y + ny),
            Coordinate::new(b.x - nx, b.y - ny),
            Coordinate::new(a.x - nx, a.y - ny),
        ];

        self.fill_polygon(&quad, color);
    }

    fn stroke_polyline(&mut self, points: &[Coordinate], color: Rgba, width: f32, dash: &[f32]) {
        let half_width = (width * 0.5).max(0.5);

        let total: f32 = dash.iter().sum();
        if dash.is_empty() || total <= 0.0 {
            for pair in points.windows(2) {
                self.stroke_segment(pair[0], pair[1], color, half_width);
            }
            return;
        }

        // The dash phase advances along the whole polyline so the pattern
        // survives vertices.
        let mut phase = 0.0f32;

        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let dx = b.x - a.x;
            let dy = b.y - a.y;
            let len = (dx * dx + dy * dy).sqrt();

            if len <= f32::EPSILON {
                continue;
            }

            let ux = dx / len;
            let uy = dy / len;
            let mut t = 0.0;

            while t < len {
                let mut into_pattern = phase % total;
                let mut index = 0;

                while into_pattern >= dash[index] {
                    into_pattern -= dash[index];
                    index = (index + 1) % dash.len();
                }

                let run = (dash[index] - into_pattern).min(len - t);

                // Even entries are on-runs.
                if index % 2 == 0 {
                    let p0 = Coordinate::new(a.x + ux * t, a.y + uy * t);
                    let p1 = Coordinate::new(a.x + ux * (t + run), a.y + uy * (t + run));
                    self.stroke_segment(p0, p1, color, half_width);
                }

                t += run;
                phase += run;
            }
        }
    }
}

impl Canvas for RasterCanvas {
    fn fill(&mut self, color: Rgba) {
        let pixel = image::Rgba(color.to_pixel());

        for p in self.image.pixels_mut() {
            *p = pixel;
        }
    }

    fn line(&mut self, points: &[Coordinate], color: Rgba, width: f32, dash: Option<&[f32]>) {
        if points.len() < 2 {
            return;
        }

        self.stroke_polyline(points, color, width, dash.unwrap_or(&[]));
    }

    fn polygon(&mut self, points: &[Coordinate], fill: Rgba) {
        self.fill_polygon(points, fill);
    }

    fn text(&mut self, anchor: Coordinate, text: &str, style: &TextStyle) {
        let fonts = self.fonts.get_or_insert_with(FontCollection::new);
        let layout = fonts.layout(text, style.size);

        if layout.glyphs.is_empty() {
            return;
        }

        // Centered horizontally on the anchor, baseline at the anchor row.
        let origin_x = anchor.x - layout.width / 2.0;
        let baseline_y = anchor.y;
        let color = style.color;

        for glyph in layout.glyphs {
            let left = origin_x + glyph.x_offset + glyph.metrics.xmin as f32;
            let top = baseline_y - glyph.metrics.ymin as f32 - glyph.metrics.height as f32;

            for row in 0..glyph.metrics.height {
                for column in 0..glyph.metrics.width {
                    let coverage = glyph.coverage[row * glyph.metrics.width + column];

                    if coverage == 0 {
                        continue;
                    }

                    self.blend(
                        (left + column as f32).round() as i64,
                        (top + row as f32).round() as i64,
                        color,
                        coverage as f32 / 255.0,
                    );
                }
            }
        }
    }
}
