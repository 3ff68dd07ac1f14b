//! Typed views over the mapped region.
//!
//! Every multi-byte field in the file is little-endian and packed, so records
//! are decoded with sequential reads over sub-slices rather than by casting
//! pointers; nothing here assumes alignment and nothing copies bulk data.

use byteorder::{LittleEndian, ReadBytesExt};

use std::char;
use std::fmt;

use crate::{Coordinate, Error, Result};

pub(crate) const FILE_VERSION: u32 = 1;

const COORDINATE_SIZE: usize = 8;
const STRING_ENTRY_SIZE: usize = 8;

fn slice_at<'a>(region: &'a [u8], offset: u64, len: u64, what: &'static str) -> Result<&'a [u8]> {
    let start = usize::try_from(offset).map_err(|_| Error::Layout(what))?;
    let len = usize::try_from(len).map_err(|_| Error::Layout(what))?;
    let end = start.checked_add(len).ok_or(Error::Layout(what))?;

    region.get(start..end).ok_or(Error::Layout(what))
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct FileHeader {
    pub version: u32,
    pub tile_count: u32,
}

impl FileHeader {
    pub const SIZE: u64 = 8;

    pub fn read(region: &[u8]) -> Result<Self> {
        let mut reader = slice_at(region, 0, Self::SIZE, "file header")?;
        let version = reader.read_u32::<LittleEndian>()?;
        let tile_count = reader.read_u32::<LittleEndian>()?;

        if version != FILE_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        Ok(Self {
            version,
            tile_count,
        })
    }
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct TileHeaderEntry {
    pub tile_id: u32,
    pub offset: u64,
}

impl TileHeaderEntry {
    pub const SIZE: u64 = 12;
}

pub(crate) fn nth_tile_header(region: &[u8], index: u32) -> Result<TileHeaderEntry> {
    let offset = FileHeader::SIZE + u64::from(index) * TileHeaderEntry::SIZE;
    let mut reader = slice_at(region, offset, TileHeaderEntry::SIZE, "tile index")?;

    let tile_id = reader.read_u32::<LittleEndian>()?;
    let offset = reader.read_u64::<LittleEndian>()?;

    Ok(TileHeaderEntry { tile_id, offset })
}

/// Per-tile record preceding the tile's feature array. All offsets are
/// absolute within the mapped region.
#[derive(Debug, Copy, Clone)]
pub(crate) struct TileBlockHeader {
    pub features_count: u32,
    pub coordinates_count: u32,
    pub strings_count: u32,
    pub characters_count: u32,
    pub coordinates_offset: u64,
    pub strings_offset: u64,
    pub characters_offset: u64,
}

impl TileBlockHeader {
    pub const SIZE: u64 = 40;

    pub fn read(region: &[u8], offset: u64) -> Result<Self> {
        let mut reader = slice_at(region, offset, Self::SIZE, "tile block header")?;

        let features_count = reader.read_u32::<LittleEndian>()?;
        let coordinates_count = reader.read_u32::<LittleEndian>()?;
        let strings_count = reader.read_u32::<LittleEndian>()?;
        let characters_count = reader.read_u32::<LittleEndian>()?;
        let coordinates_offset = reader.read_u64::<LittleEndian>()?;
        let strings_offset = reader.read_u64::<LittleEndian>()?;
        let characters_offset = reader.read_u64::<LittleEndian>()?;

        Ok(Self {
            features_count,
            coordinates_count,
            strings_count,
            characters_count,
            coordinates_offset,
            strings_offset,
            characters_offset,
        })
    }
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct MapFeatureRecord {
    pub id: i64,
    pub label_offset: i32,
    pub geometry: u8,
    pub coordinate_offset: i32,
    pub coordinate_count: i32,
    pub properties_offset: i32,
    pub property_count: i32,
}

impl MapFeatureRecord {
    pub const SIZE: u64 = 29;
}

pub(crate) fn feature_at(region: &[u8], base_offset: u64, index: u32) -> Result<MapFeatureRecord> {
    let offset = base_offset
        .checked_add(TileBlockHeader::SIZE + u64::from(index) * MapFeatureRecord::SIZE)
        .ok_or(Error::Layout("feature record"))?;
    let mut reader = slice_at(region, offset, MapFeatureRecord::SIZE, "feature record")?;

    let id = reader.read_i64::<LittleEndian>()?;
    let label_offset = reader.read_i32::<LittleEndian>()?;
    let geometry = reader.read_u8()?;
    let coordinate_offset = reader.read_i32::<LittleEndian>()?;
    let coordinate_count = reader.read_i32::<LittleEndian>()?;
    let properties_offset = reader.read_i32::<LittleEndian>()?;
    let property_count = reader.read_i32::<LittleEndian>()?;

    Ok(MapFeatureRecord {
        id,
        label_offset,
        geometry,
        coordinate_offset,
        coordinate_count,
        properties_offset,
        property_count,
    })
}

/// View of `count` coordinates starting at element `start` of a tile's
/// coordinate array.
pub(crate) fn coordinates<'a>(
    region: &'a [u8],
    block: &TileBlockHeader,
    start: i32,
    count: i32,
) -> Result<Coordinates<'a>> {
    let start = u32::try_from(start).map_err(|_| Error::Layout("coordinate offset"))?;
    let count = u32::try_from(count).map_err(|_| Error::Layout("coordinate count"))?;

    let end = start
        .checked_add(count)
        .ok_or(Error::Layout("coordinate range"))?;
    if end > block.coordinates_count {
        return Err(Error::Layout("coordinate range"));
    }

    let offset = block.coordinates_offset + u64::from(start) * COORDINATE_SIZE as u64;
    let bytes = slice_at(
        region,
        offset,
        u64::from(count) * COORDINATE_SIZE as u64,
        "coordinate array",
    )?;

    Ok(Coordinates { bytes })
}

/// Character view of the `index`-th string of a tile.
pub(crate) fn string_at<'a>(
    region: &'a [u8],
    block: &TileBlockHeader,
    index: u32,
) -> Result<Utf16Str<'a>> {
    if index >= block.strings_count {
        return Err(Error::Layout("string index"));
    }

    let entry_offset = block.strings_offset + u64::from(index) * STRING_ENTRY_SIZE as u64;
    let mut reader = slice_at(region, entry_offset, STRING_ENTRY_SIZE as u64, "string entry")?;
    let offset = reader.read_u32::<LittleEndian>()?;
    let length = reader.read_u32::<LittleEndian>()?;

    let end = offset
        .checked_add(length)
        .ok_or(Error::Layout("string range"))?;
    if end > block.characters_count {
        return Err(Error::Layout("string range"));
    }

    // Characters are 16-bit code units, so byte offsets double.
    let bytes = slice_at(
        region,
        block.characters_offset + u64::from(offset) * 2,
        u64::from(length) * 2,
        "character array",
    )?;

    Ok(Utf16Str { bytes })
}

/// Zero-copy coordinate slice. Values decode lazily on access, which keeps
/// reads safe on platforms that dislike unaligned loads.
#[derive(Debug, Copy, Clone)]
pub struct Coordinates<'a> {
    bytes: &'a [u8],
}

impl<'a> Coordinates<'a> {
    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / COORDINATE_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Coordinate> {
        let start = index.checked_mul(COORDINATE_SIZE)?;
        let end = start.checked_add(COORDINATE_SIZE)?;
        let chunk = self.bytes.get(start..end)?;

        Some(decode_coordinate(chunk))
    }

    pub fn iter(&self) -> impl Iterator<Item = Coordinate> + 'a {
        self.bytes.chunks_exact(COORDINATE_SIZE).map(decode_coordinate)
    }
}

fn decode_coordinate(chunk: &[u8]) -> Coordinate {
    let mut reader = chunk;
    let x = reader.read_f32::<LittleEndian>().unwrap_or_default();
    let y = reader.read_f32::<LittleEndian>().unwrap_or_default();

    Coordinate { x, y }
}

/// Borrowed UTF-16 string view into the mapped character array.
///
/// Unpaired surrogates decode as U+FFFD; no validation happens up front.
#[derive(Copy, Clone)]
pub struct Utf16Str<'a> {
    bytes: &'a [u8],
}

impl<'a> Utf16Str<'a> {
    /// Length in code units, not characters.
    pub fn len(&self) -> usize {
        self.bytes.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn code_units(&self) -> impl Iterator<Item = u16> + 'a {
        self.bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + 'a {
        char::decode_utf16(self.code_units())
            .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
    }
}

impl fmt::Display for Utf16Str<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.chars() {
            fmt::Write::write_char(f, c)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Utf16Str<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string())
    }
}

impl PartialEq<&str> for Utf16Str<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.chars().eq(other.chars())
    }
}
