//! Test support: builds store files in the on-disk layout.

use byteorder::{LittleEndian, WriteBytesExt};

use std::io::Write;

use crate::classify::Environment;
use crate::layout::{self, Coordinates};
use crate::{GeometryKind, MapFeatureData};

pub(crate) struct TileFileBuilder {
    tiles: Vec<TileData>,
}

pub(crate) struct TileData {
    id: u32,
    features: Vec<FeatureData>,
    coordinates: Vec<(f32, f32)>,
    strings: Vec<String>,
}

struct FeatureData {
    id: i64,
    label_offset: i32,
    geometry: u8,
    coordinate_offset: i32,
    coordinate_count: i32,
    properties_offset: i32,
    property_count: i32,
}

impl TileFileBuilder {
    pub fn new() -> Self {
        Self { tiles: Vec::new() }
    }

    pub fn tile(&mut self, id: u32) -> &mut TileData {
        self.tiles.push(TileData {
            id,
            features: Vec::new(),
            coordinates: Vec::new(),
            strings: Vec::new(),
        });

        self.tiles.last_mut().unwrap()
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.write_u32::<LittleEndian>(layout::FILE_VERSION).unwrap();
        out.write_u32::<LittleEndian>(self.tiles.len() as u32).unwrap();

        let index_start = out.len();
        for tile in self.tiles.iter() {
            out.write_u32::<LittleEndian>(tile.id).unwrap();
            out.write_u64::<LittleEndian>(0).unwrap();
        }

        for (i, tile) in self.tiles.iter().enumerate() {
            let base = out.len() as u64;
            let entry = index_start + i * 12 + 4;
            out[entry..entry + 8].copy_from_slice(&base.to_le_bytes());

            let mut entries = Vec::new();
            let mut characters: Vec<u16> = Vec::new();
            for s in tile.strings.iter() {
                let start = characters.len() as u32;
                characters.extend(s.encode_utf16());
                entries.push((start, characters.len() as u32 - start));
            }

            let features_count = tile.features.len() as u64;
            let coordinates_offset = base + 40 + 29 * features_count;
            let strings_offset = coordinates_offset + 8 * tile.coordinates.len() as u64;
            let characters_offset = strings_offset + 8 * entries.len() as u64;

            out.write_u32::<LittleEndian>(tile.features.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(tile.coordinates.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(entries.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(characters.len() as u32).unwrap();
            out.write_u64::<LittleEndian>(coordinates_offset).unwrap();
            out.write_u64::<LittleEndian>(strings_offset).unwrap();
            out.write_u64::<LittleEndian>(characters_offset).unwrap();

            for feature in tile.features.iter() {
                out.write_i64::<LittleEndian>(feature.id).unwrap();
                out.write_i32::<LittleEndian>(feature.label_offset).unwrap();
                out.write_u8(feature.geometry).unwrap();
                out.write_i32::<LittleEndian>(feature.coordinate_offset).unwrap();
                out.write_i32::<LittleEndian>(feature.coordinate_count).unwrap();
                out.write_i32::<LittleEndian>(feature.properties_offset).unwrap();
                out.write_i32::<LittleEndian>(feature.property_count).unwrap();
            }

            for &(x, y) in tile.coordinates.iter() {
                out.write_f32::<LittleEndian>(x).unwrap();
                out.write_f32::<LittleEndian>(y).unwrap();
            }

            for (offset, length) in entries {
                out.write_u32::<LittleEndian>(offset).unwrap();
                out.write_u32::<LittleEndian>(length).unwrap();
            }

            for unit in characters {
                out.write_u16::<LittleEndian>(unit).unwrap();
            }
        }

        out
    }

    pub fn write_temp(&self) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&self.build()).unwrap();
        file.flush().unwrap();

        file
    }
}

impl TileData {
    pub fn feature(
        &mut self,
        id: i64,
        geometry: GeometryKind,
        coordinates: &[(f32, f32)],
        properties: &[(&str, &str)],
        label: Option<&str>,
    ) -> &mut Self {
        let coordinate_offset = self.coordinates.len() as i32;
        self.coordinates.extend_from_slice(coordinates);

        let properties_offset = self.strings.len() as i32;
        for (key, value) in properties {
            self.strings.push((*key).to_owned());
            self.strings.push((*value).to_owned());
        }

        let label_offset = match label {
            Some(label) => {
                let index = self.strings.len() as i32;
                self.strings.push(label.to_owned());
                index
            }
            None => -1,
        };

        self.features.push(FeatureData {
            id,
            label_offset,
            geometry: geometry as u8,
            coordinate_offset,
            coordinate_count: coordinates.len() as i32,
            properties_offset,
            property_count: properties.len() as i32,
        });

        self
    }
}

/// Hydrated feature with leaked static coordinates, for renderer tests that
/// do not want a whole store file.
pub(crate) fn feature_fixture(
    environment: Environment,
    geometry: GeometryKind,
    coordinates: &[(f32, f32)],
) -> MapFeatureData<'static> {
    let mut bytes = Vec::with_capacity(coordinates.len() * 8);
    for &(x, y) in coordinates {
        bytes.extend_from_slice(&x.to_le_bytes());
        bytes.extend_from_slice(&y.to_le_bytes());
    }

    MapFeatureData {
        id: 0,
        geometry,
        label: None,
        coordinates: Coordinates::from_bytes(Box::leak(bytes.into_boxed_slice())),
        environment,
        name: None,
    }
}
