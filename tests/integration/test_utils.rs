//! Test utilities for integration tests.
//!
//! Builders for experiment folder trees holding real TIFF files, plus a
//! hand-rolled big-endian TIFF encoder standing in for files written by
//! other software.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tempfile::TempDir;

use matrixscan::format::tiff::{colormap_from_palette, write_tiff};
use matrixscan::{Ifd, PixelData, Raster, TagValue};

// =============================================================================
// Rasters and tags
// =============================================================================

/// 8-bit gray gradient.
pub fn gray8(width: u32, height: u32) -> Raster {
    let data = (0..width * height).map(|i| (i * 7 % 256) as u8).collect();
    Raster::new(width, height, 1, PixelData::U8(data)).unwrap()
}

/// 16-bit gray ramp using the full sample range.
pub fn gray16(width: u32, height: u32) -> Raster {
    let data = (0..width * height)
        .map(|i| (i as u64 * 65535 / (width * height - 1).max(1) as u64) as u16)
        .collect();
    Raster::new(width, height, 1, PixelData::U16(data)).unwrap()
}

/// Tags an instrument writes next to the structural ones.
pub fn instrument_tags() -> Ifd {
    let mut tags = Ifd::new();
    tags.insert(262, TagValue::Short(vec![1]));
    tags.insert(
        270,
        TagValue::ascii(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><OME><Image ID=\"Image:0\"/></OME>",
        ),
    );
    tags.insert(282, TagValue::Rational(vec![(1_000_000, 385)]));
    tags.insert(283, TagValue::Rational(vec![(1_000_000, 385)]));
    tags.insert(296, TagValue::Short(vec![3]));
    tags.insert(305, TagValue::ascii("LAS AF"));
    tags
}

/// Palette of 256 entries: red ramp, inverted green, constant blue.
pub fn palette() -> Vec<u8> {
    (0..=255u8).flat_map(|i| [i, 255 - i, 40]).collect()
}

/// Tags of a palette image using [`palette`].
pub fn palette_tags() -> Ifd {
    let mut tags = instrument_tags();
    tags.insert(262, TagValue::Short(vec![3]));
    tags.insert(320, TagValue::Short(colormap_from_palette(&palette())));
    tags
}

// =============================================================================
// Foreign TIFF files
// =============================================================================

/// Encode an 8-bit gray image as a big-endian TIFF, the way instruments on
/// Motorola-order hosts write it: strip data first, LONG dimensions, two
/// strips, IFD at the end.
pub fn big_endian_gray_tiff(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
    assert_eq!(pixels.len(), (width * height) as usize);
    let rows_per_strip = height.div_ceil(2);
    let strip_len = (rows_per_strip * width) as usize;

    let mut data = Vec::new();
    data.extend_from_slice(b"MM");
    data.extend_from_slice(&42u16.to_be_bytes());
    data.extend_from_slice(&0u32.to_be_bytes());

    let mut offsets = Vec::new();
    let mut counts = Vec::new();
    for strip in pixels.chunks(strip_len) {
        offsets.push(data.len() as u32);
        counts.push(strip.len() as u32);
        data.extend_from_slice(strip);
    }
    if data.len() % 2 == 1 {
        data.push(0);
    }

    let description = b"big endian sample\0";
    let description_offset = data.len() as u32;
    data.extend_from_slice(description);
    if data.len() % 2 == 1 {
        data.push(0);
    }

    let ifd_offset = data.len() as u32;
    data[4..8].copy_from_slice(&ifd_offset.to_be_bytes());

    // tag, type, count, value (inline, left-justified)
    let short = |v: u16| ((v as u32) << 16).to_be_bytes();
    let long = |v: u32| v.to_be_bytes();
    let entries: Vec<(u16, u16, u32, [u8; 4])> = vec![
        (256, 4, 1, long(width)),
        (257, 4, 1, long(height)),
        (258, 3, 1, short(8)),
        (259, 3, 1, short(1)),
        (262, 3, 1, short(1)),
        (270, 2, description.len() as u32, long(description_offset)),
        (273, 4, 2, [0; 4]),
        (277, 3, 1, short(1)),
        (278, 4, 1, long(rows_per_strip)),
        (279, 4, 2, [0; 4]),
    ];

    let table_len = 2 + entries.len() * 12 + 4;
    let arrays_offset = ifd_offset + table_len as u32;

    data.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for (tag, ty, count, value) in entries {
        data.extend_from_slice(&tag.to_be_bytes());
        data.extend_from_slice(&ty.to_be_bytes());
        data.extend_from_slice(&count.to_be_bytes());
        match tag {
            273 => data.extend_from_slice(&arrays_offset.to_be_bytes()),
            279 => data.extend_from_slice(&(arrays_offset + 8).to_be_bytes()),
            _ => data.extend_from_slice(&value),
        }
    }
    data.extend_from_slice(&0u32.to_be_bytes());

    for value in offsets.iter().chain(&counts) {
        data.extend_from_slice(&value.to_be_bytes());
    }
    data
}

// =============================================================================
// Experiment trees
// =============================================================================

/// Image file name for the given well, field and channel.
pub fn image_name(u: u32, v: u32, x: u32, y: u32, c: u32) -> String {
    format!(
        "image--L0000--S00--U{u:02}--V{v:02}--J20--E00--O00--X{x:02}--Y{y:02}--T0000--Z00--C{c:02}.ome.tif"
    )
}

/// Builder for a temporary experiment folder.
pub struct ExperimentBuilder {
    dir: TempDir,
    root: PathBuf,
}

impl ExperimentBuilder {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("experiment--2024_05_01");
        fs::create_dir_all(&root).unwrap();
        Self { dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Temporary directory holding the experiment folder.
    pub fn parent(&self) -> &Path {
        self.dir.path()
    }

    pub fn well_dir(&self, u: u32, v: u32) -> PathBuf {
        self.root.join(format!("slide--S00/chamber--U{u:02}--V{v:02}"))
    }

    pub fn field_dir(&self, u: u32, v: u32, x: u32, y: u32) -> PathBuf {
        self.well_dir(u, v).join(format!("field--X{x:02}--Y{y:02}"))
    }

    /// Add a `columns` x `rows` grid of fields to well (`u`, `v`), each with
    /// one 8-bit gray TIFF per channel.
    pub fn with_well(self, u: u32, v: u32, columns: u32, rows: u32, channels: u32) -> Self {
        for x in 0..columns {
            for y in 0..rows {
                let field = self.field_dir(u, v, x, y);
                fs::create_dir_all(&field).unwrap();
                for c in 0..channels {
                    let path = field.join(image_name(u, v, x, y, c));
                    write_tiff(&path, &gray8(8, 6), &instrument_tags()).unwrap();
                }
            }
        }
        self
    }

    /// Write a tile configuration with one line per given tile.
    pub fn with_tile_configuration(self, u: u32, v: u32, tiles: &[(u32, u32, f64, f64)]) -> Self {
        let mut text = String::from(
            "# Define the number of dimensions we are working on\ndim = 2\n\n# Define the image coordinates\n",
        );
        for &(x, y, px, py) in tiles {
            text.push_str(&format!(
                "{}; ; ({:.1}, {:.1})\n",
                image_name(u, v, x, y, 0),
                px,
                py
            ));
        }
        fs::write(self.well_dir(u, v).join("TileConfiguration.registered.txt"), text).unwrap();
        self
    }
}

// =============================================================================
// Filesystem snapshots
// =============================================================================

/// Every file below `root` with its size and modification time.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, (u64, SystemTime)> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let entry = entry.unwrap();
            let meta = entry.metadata().unwrap();
            if meta.is_dir() {
                pending.push(entry.path());
            } else {
                files.insert(entry.path(), (meta.len(), meta.modified().unwrap()));
            }
        }
    }
    files
}

pub fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}
