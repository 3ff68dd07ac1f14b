//! Label layout and glyph rasterization.

use fontdue::{Font, Metrics};

pub(crate) struct FontCollection {
    font: Font,
}

impl FontCollection {
    pub fn new() -> FontCollection {
        let font = Font::from_bytes(notosans::REGULAR_TTF, Default::default())
            .expect("embedded font parses");

        Self { font }
    }

    /// Lay out a single-line label. Control characters and glyphs missing
    /// from the face are dropped; kerning applies between surviving pairs.
    pub fn layout(&self, text: &str, size: f32) -> LabelLayout {
        let mut glyphs = Vec::new();
        let mut h_offset = 0.0;
        let mut last_glyph = None;

        for c in text.chars() {
            if c.is_control() {
                last_glyph = None;
                continue;
            }

            if self.font.lookup_glyph_index(c) == 0 {
                last_glyph = None;
                continue;
            }

            let kern = last_glyph
                .and_then(|g| self.font.horizontal_kern(g, c, size))
                .unwrap_or_default();

            last_glyph = Some(c);
            h_offset += kern;

            let (metrics, coverage) = self.font.rasterize(c, size);

            if !c.is_whitespace() {
                glyphs.push(GlyphBlit {
                    x_offset: h_offset,
                    metrics,
                    coverage,
                });
            }

            h_offset += metrics.advance_width;
        }

        LabelLayout {
            width: h_offset,
            glyphs,
        }
    }
}

pub(crate) struct LabelLayout {
    pub width: f32,
    pub glyphs: Vec<GlyphBlit>,
}

pub(crate) struct GlyphBlit {
    pub x_offset: f32,
    pub metrics: Metrics,
    pub coverage: Vec<u8>,
}
