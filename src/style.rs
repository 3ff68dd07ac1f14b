//! Style parameters for the rasterizer.
//!
//! The table is fixed at construction; [`StyleTable::load`] accepts a JSON
//! document overriding individual entries. Only the z-order relation between
//! shape variants is semantic, colors and widths are presentation.

use serde::Deserialize;
use smallvec::SmallVec;

use std::str::FromStr;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn with_alpha(&self, alpha: f32) -> Self {
        Self { a: alpha, ..*self }
    }

    pub fn to_pixel(&self) -> [u8; 4] {
        let quantize = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;

        [
            quantize(self.r),
            quantize(self.g),
            quantize(self.b),
            quantize(self.a),
        ]
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Rgba::BLACK
    }
}

impl FromStr for Rgba {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let to_b = |c: u8| {
            if c.is_ascii_digit() {
                c - b'0'
            } else if (b'a'..=b'f').contains(&c) {
                (c - b'a') + 10
            } else if (b'A'..=b'F').contains(&c) {
                (c - b'A') + 10
            } else {
                0
            }
        };

        if s.starts_with('#') && s.len() == 4 {
            let mut c = s.bytes();
            let _ = c.next();
            let r = c.next().map(to_b).unwrap_or_default() << 4;
            let g = c.next().map(to_b).unwrap_or_default() << 4;
            let b = c.next().map(to_b).unwrap_or_default() << 4;

            Ok(Rgba::from_u8(r, g, b))
        } else if s.starts_with('#') && s.len() == 7 {
            let mut c = s.bytes();
            let _ = c.next();
            let r = c.next().map(to_b).unwrap_or_default() << 4;
            let rr = c.next().map(to_b).unwrap_or_default();
            let g = c.next().map(to_b).unwrap_or_default() << 4;
            let gg = c.next().map(to_b).unwrap_or_default();
            let b = c.next().map(to_b).unwrap_or_default() << 4;
            let bb = c.next().map(to_b).unwrap_or_default();

            Ok(Rgba::from_u8(r | rr, g | gg, b | bb))
        } else {
            Err("invalid color")
        }
    }
}

impl<'de> serde::Deserialize<'de> for Rgba {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let s = String::deserialize(deserializer)?;
        Rgba::from_str(&s).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LineStyle {
    pub color: Rgba,
    pub width: f32,
    pub dash: Option<SmallVec<[f32; 8]>>,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: Rgba::BLACK,
            width: 1.0,
            dash: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub color: Rgba,
    pub size: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: Rgba::BLACK,
            size: 14.0,
        }
    }
}

/// Fill, stroke, and label styling for every shape variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StyleTable {
    pub background: Rgba,
    pub plain: Rgba,
    pub desert: Rgba,
    pub national_park: Rgba,
    pub forest: Rgba,
    pub mountains: Rgba,
    pub lakes: Rgba,
    pub residential: Rgba,
    pub buildings: Rgba,
    pub water_fill: Rgba,
    pub waterway: LineStyle,
    pub road: LineStyle,
    pub highway: LineStyle,
    pub railway: LineStyle,
    pub border: LineStyle,
    pub place: TextStyle,
}

impl Default for StyleTable {
    fn default() -> Self {
        Self {
            background: Rgba::WHITE,
            plain: Rgba::from_u8(0xcd, 0xeb, 0xb0),
            desert: Rgba::from_u8(0xf5, 0xe9, 0xc6),
            national_park: Rgba::from_u8(0xc8, 0xfa, 0xcc),
            forest: Rgba::from_u8(0xad, 0xd1, 0x9e),
            mountains: Rgba::from_u8(0xd8, 0xd7, 0xab),
            lakes: Rgba::from_u8(0xaa, 0xd3, 0xdf),
            residential: Rgba::from_u8(0xe0, 0xdf, 0xdf),
            buildings: Rgba::from_u8(0xd9, 0xd0, 0xc9),
            water_fill: Rgba::from_u8(0xaa, 0xd3, 0xdf),
            waterway: LineStyle {
                color: Rgba::from_u8(0xaa, 0xd3, 0xdf),
                width: 2.0,
                dash: None,
            },
            road: LineStyle {
                color: Rgba::from_u8(0xc8, 0xc8, 0xc8),
                width: 2.0,
                dash: None,
            },
            highway: LineStyle {
                color: Rgba::from_u8(0xd6, 0x61, 0x5f),
                width: 4.0,
                dash: None,
            },
            railway: LineStyle {
                color: Rgba::from_u8(0x70, 0x70, 0x70),
                width: 1.5,
                dash: Some(SmallVec::from_slice(&[6.0, 3.0])),
            },
            border: LineStyle {
                color: Rgba::from_u8(0x4a, 0x4a, 0x4a),
                width: 3.0,
                dash: Some(SmallVec::from_slice(&[10.0, 6.0])),
            },
            place: TextStyle {
                color: Rgba::BLACK,
                size: 14.0,
            },
        }
    }
}

impl StyleTable {
    pub fn load<R: std::io::Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }
}
