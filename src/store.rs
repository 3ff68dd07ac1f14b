//! Memory-mapped tile store.

use log::{debug, trace};
use memmap2::Mmap;

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::classify::{self, PropertySet};
use crate::layout::{self, FileHeader, TileBlockHeader, TileHeaderEntry};
use crate::tiling::{self, TileId};
use crate::{Error, GeographicBoundingBox, GeometryKind, MapFeatureData, Result};

/// Read-only view over one store file.
///
/// The file handle, mapping, and every view derived from it are released
/// together when the store drops. A `Store` is immutable once opened and may
/// be shared across threads; every [`Store::for_each_feature`] call owns its
/// iteration state.
pub struct Store {
    path: PathBuf,
    map: Mmap,
    header: FileHeader,
}

impl Store {
    /// Map the file read-only. Fails when the file is missing or
    /// unreadable, when the version marker is unknown, or when the file
    /// cannot hold the tile index its header claims.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Store> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;
        let map = unsafe { Mmap::map(&file) }.map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;

        let len = map.len() as u64;
        if len < FileHeader::SIZE {
            return Err(Error::FileTooSmall {
                len,
                need: FileHeader::SIZE,
            });
        }

        let header = FileHeader::read(&map)?;
        let need = FileHeader::SIZE + u64::from(header.tile_count) * TileHeaderEntry::SIZE;
        if len < need {
            return Err(Error::FileTooSmall { len, need });
        }

        debug!(
            "mapped {} ({len} bytes, version {}, {} tiles)",
            path.display(),
            header.version,
            header.tile_count
        );

        Ok(Self { path, map, header })
    }

    /// Release the mapping and file handle. Dropping the store does the
    /// same; this form exists for callers that want the release to be
    /// visible at the call site.
    pub fn close(self) {}

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tile_count(&self) -> u32 {
        self.header.tile_count
    }

    fn region(&self) -> &[u8] {
        &self.map
    }

    /// Linear scan of the tile index; tile counts are a few thousand at
    /// most.
    fn find_tile(&self, tile_id: TileId) -> Result<Option<(TileBlockHeader, u64)>> {
        for index in 0..self.header.tile_count {
            let entry = layout::nth_tile_header(self.region(), index)?;

            if entry.tile_id == tile_id.0 {
                let block = TileBlockHeader::read(self.region(), entry.offset)?;
                return Ok(Some((block, entry.offset)));
            }
        }

        Ok(None)
    }

    /// Stream every stored feature with at least one coordinate inside
    /// `bounds`, visiting covering tiles in grid row-major order and each
    /// tile's features in storage order. The callback returning `false`
    /// stops iteration across all remaining tiles.
    ///
    /// The build pipeline stores a feature only in the tile of its first
    /// coordinate, so one call yields each feature at most once even when
    /// several covering tiles touch its geometry.
    ///
    /// The views inside [`MapFeatureData`] stay valid only until the
    /// callback returns. Malformed records abort the walk with an error.
    pub fn for_each_feature<F>(&self, bounds: &GeographicBoundingBox, mut callback: F) -> Result<()>
    where
        F: FnMut(&MapFeatureData<'_>) -> bool,
    {
        if bounds.is_empty() {
            return Ok(());
        }

        let region = self.region();
        // Transient bag reused across features; the only per-feature heap
        // traffic besides the owned name.
        let mut properties = PropertySet::new();

        for tile_id in tiling::tiles_for_bounding_box(bounds) {
            let Some((block, base_offset)) = self.find_tile(tile_id)? else {
                continue;
            };

            trace!("tile {}: {} features", tile_id.0, block.features_count);

            for index in 0..block.features_count {
                let record = layout::feature_at(region, base_offset, index)?;
                let geometry = GeometryKind::try_from(record.geometry)?;
                let coordinates = layout::coordinates(
                    region,
                    &block,
                    record.coordinate_offset,
                    record.coordinate_count,
                )?;

                if !coordinates.iter().any(|c| bounds.contains(c)) {
                    continue;
                }

                properties.clear();

                let property_count = u32::try_from(record.property_count)
                    .map_err(|_| Error::Layout("property count"))?;

                if property_count > 0 {
                    let properties_offset = u32::try_from(record.properties_offset)
                        .map_err(|_| Error::Layout("property offset"))?;

                    // Key/value pairs occupy consecutive string entries
                    // starting at the record's property offset.
                    for pair in 0..property_count {
                        let index = u64::from(properties_offset) + u64::from(pair) * 2;
                        let index =
                            u32::try_from(index).map_err(|_| Error::Layout("property index"))?;

                        let key = layout::string_at(region, &block, index)?;
                        let value = layout::string_at(region, &block, index + 1)?;

                        properties.insert(key.to_string(), value.to_string());
                    }
                }

                let environment = classify::classify(&properties, geometry);

                let label = if record.label_offset >= 0 {
                    Some(layout::string_at(region, &block, record.label_offset as u32)?)
                } else {
                    None
                };

                let name = properties.value("name").map(str::to_owned);

                let feature = MapFeatureData {
                    id: record.id,
                    geometry,
                    label,
                    coordinates,
                    environment,
                    name,
                };

                if !callback(&feature) {
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Environment;
    use crate::fixture::TileFileBuilder;
    use crate::render::{RenderQueue, Renderer, ScreenBoundingBox};
    use crate::style::StyleTable;

    use std::io::Write;

    // Cell (row 90, column 180) spans lat 0..1, lon 0..1.
    const TILE_A: u32 = 90 * 360 + 180;
    const TILE_B: u32 = TILE_A + 1;

    fn two_tile_store() -> tempfile::NamedTempFile {
        let mut builder = TileFileBuilder::new();

        builder
            .tile(TILE_A)
            .feature(
                1,
                GeometryKind::Line,
                &[(0.2, 0.2), (0.4, 0.4)],
                &[("highway", "motorway"), ("name", "A1")],
                Some("A1"),
            )
            .feature(
                2,
                GeometryKind::Polygon,
                &[(0.5, 0.5), (0.7, 0.5), (0.7, 0.7)],
                &[("natural", "water")],
                None,
            )
            .feature(
                3,
                GeometryKind::Line,
                &[(0.8, 5.0), (0.9, 5.0)],
                &[("highway", "residential")],
                None,
            );

        builder.tile(TILE_B).feature(
            4,
            GeometryKind::Point,
            &[(1.5, 0.5)],
            &[("place", "city"), ("name", "Midtown")],
            Some("Midtown"),
        );

        builder.write_temp()
    }

    fn query_box() -> GeographicBoundingBox {
        GeographicBoundingBox::new(0.0, 0.0, 0.95, 1.95)
    }

    #[test]
    fn open_missing_file() {
        assert!(matches!(
            Store::open("/definitely/not/here.tiles"),
            Err(Error::Open { .. })
        ));
    }

    #[test]
    fn open_rejects_truncated_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 0, 0, 0]).unwrap();
        file.flush().unwrap();

        assert!(matches!(
            Store::open(file.path()),
            Err(Error::FileTooSmall { .. })
        ));

        // A header that claims more index entries than the file holds.
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&1u32.to_le_bytes()).unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();
        file.flush().unwrap();

        assert!(matches!(
            Store::open(file.path()),
            Err(Error::FileTooSmall { .. })
        ));
    }

    #[test]
    fn open_reads_tile_count() {
        let file = two_tile_store();
        let store = Store::open(file.path()).unwrap();

        assert_eq!(store.tile_count(), 2);
        store.close();
    }

    #[test]
    fn iterates_in_tile_then_storage_order() {
        let file = two_tile_store();
        let store = Store::open(file.path()).unwrap();

        let mut ids = Vec::new();
        store
            .for_each_feature(&query_box(), |feature| {
                ids.push(feature.id);
                true
            })
            .unwrap();

        // Feature 3 lies outside the box; tile A comes before tile B.
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn every_yielded_feature_touches_the_box() {
        let file = two_tile_store();
        let store = Store::open(file.path()).unwrap();
        let bounds = query_box();

        store
            .for_each_feature(&bounds, |feature| {
                assert!(feature.coordinates.iter().any(|c| bounds.contains(c)));
                true
            })
            .unwrap();
    }

    #[test]
    fn hydrates_classification_label_and_name() {
        let file = two_tile_store();
        let store = Store::open(file.path()).unwrap();

        let mut seen = Vec::new();
        store
            .for_each_feature(&query_box(), |feature| {
                seen.push((
                    feature.id,
                    feature.environment,
                    feature.label.map(|l| l.to_string()),
                    feature.name.clone(),
                ));
                true
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                (
                    1,
                    Environment::Highway,
                    Some("A1".to_owned()),
                    Some("A1".to_owned())
                ),
                (2, Environment::Lakes, None, None),
                (
                    4,
                    Environment::PopulatedPlace,
                    Some("Midtown".to_owned()),
                    Some("Midtown".to_owned())
                ),
            ]
        );
    }

    #[test]
    fn callback_false_cancels_across_tiles() {
        let file = two_tile_store();
        let store = Store::open(file.path()).unwrap();

        let mut count = 0;
        store
            .for_each_feature(&query_box(), |_| {
                count += 1;
                false
            })
            .unwrap();

        assert_eq!(count, 1);
    }

    #[test]
    fn empty_box_yields_nothing() {
        let file = two_tile_store();
        let store = Store::open(file.path()).unwrap();

        store
            .for_each_feature(&GeographicBoundingBox::EMPTY, |_| {
                panic!("no features expected");
            })
            .unwrap();
    }

    #[test]
    fn missing_tiles_are_skipped_silently() {
        let file = two_tile_store();
        let store = Store::open(file.path()).unwrap();

        // A box over a part of the grid with no stored tiles.
        let bounds = GeographicBoundingBox::new(40.1, 40.1, 40.2, 40.2);
        store
            .for_each_feature(&bounds, |_| panic!("no features expected"))
            .unwrap();
    }

    #[test]
    fn features_span_tiles_without_duplication() {
        // A line whose geometry crosses into tile B but is stored in tile A
        // (keyed by its first coordinate).
        let mut builder = TileFileBuilder::new();
        builder.tile(TILE_A).feature(
            10,
            GeometryKind::Line,
            &[(0.9, 0.5), (1.4, 0.5)],
            &[("highway", "trunk")],
            None,
        );
        builder.tile(TILE_B);
        let file = builder.write_temp();
        let store = Store::open(file.path()).unwrap();

        let mut count = 0;
        store
            .for_each_feature(&query_box(), |feature| {
                assert_eq!(feature.id, 10);
                count += 1;
                true
            })
            .unwrap();

        assert_eq!(count, 1);
    }

    #[test]
    fn malformed_records_abort_iteration() {
        let mut builder = TileFileBuilder::new();
        builder.tile(TILE_A).feature(
            1,
            GeometryKind::Line,
            &[(0.2, 0.2), (0.4, 0.4)],
            &[],
            None,
        );
        let mut bytes = builder.build();

        // Corrupt the record's coordinate count (last field before the
        // property fields sits 17 bytes into the record; the record starts
        // after the 40-byte block header).
        let entry_offset = 8 + 4;
        let base = u64::from_le_bytes(bytes[entry_offset..entry_offset + 8].try_into().unwrap());
        let count_offset = base as usize + 40 + 8 + 4 + 1 + 4;
        bytes[count_offset..count_offset + 4].copy_from_slice(&1_000_000i32.to_le_bytes());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let store = Store::open(file.path()).unwrap();
        let result = store.for_each_feature(&query_box(), |_| true);

        assert!(matches!(result, Err(Error::Layout(_))));
    }

    #[test]
    fn store_to_image_end_to_end() {
        let file = two_tile_store();
        let store = Store::open(file.path()).unwrap();
        let renderer = Renderer::new(StyleTable::default());

        let mut bbox = ScreenBoundingBox::new();
        let mut queue = RenderQueue::new();

        store
            .for_each_feature(&query_box(), |feature| {
                renderer.tessellate(feature, &mut bbox, &mut queue);
                true
            })
            .unwrap();

        assert_eq!(queue.len(), 3);

        let image = renderer.render(queue, &bbox, 64, 64);
        assert_eq!(image.width(), 64);
        assert_eq!(image.height(), 64);

        // Something other than the background must have been drawn.
        assert!(image.pixels().any(|p| p.0 != [255, 255, 255, 255]));
    }
}
