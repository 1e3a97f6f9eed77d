//! Compression round-trip tests.
//!
//! Tests verify:
//! - Pixels and tags survive TIFF -> PNG + JSON -> TIFF
//! - Palette images get their color map back
//! - Files from other writers (big-endian, several strips) convert too
//! - A second compression leaves existing outputs untouched
//! - Non-TIFF input is rejected without touching the filesystem

use std::fs;

use matrixscan::format::tiff::write_tiff;
use matrixscan::{
    compress, compress_image, decompress, CodecError, CompressOptions, DecompressOptions, Sidecar,
    TagValue, TiffFile, WorkerPool,
};

use super::test_utils::{
    big_endian_gray_tiff, gray16, gray8, instrument_tags, mtime, palette, palette_tags, snapshot,
};

fn pool() -> WorkerPool {
    WorkerPool::new(2).unwrap()
}

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_gray8_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("image--X00--Y00--C00.ome.tif");
    write_tiff(&tif, &gray8(13, 7), &instrument_tags()).unwrap();
    let original = TiffFile::open(&tif).unwrap();

    let options = CompressOptions {
        delete_original: true,
        ..Default::default()
    };
    let pngs = compress(&tif, &options, &pool());
    let png = dir.path().join("image--X00--Y00--C00.png");
    assert_eq!(pngs, vec![Some(png.clone())]);
    assert!(!tif.exists());
    assert!(dir.path().join("image--X00--Y00--C00.json").is_file());

    let tifs = decompress(&png, &DecompressOptions::default(), &pool());
    assert_eq!(tifs, vec![Some(tif.clone())]);

    let restored = TiffFile::open(&tif).unwrap();
    assert_eq!(restored.raster, original.raster);
    assert_eq!(restored.tags, original.tags);
}

#[test]
fn test_gray16_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("deep.ome.tif");
    write_tiff(&tif, &gray16(9, 5), &instrument_tags()).unwrap();
    let original = TiffFile::open(&tif).unwrap();
    assert_eq!(original.raster.bits_per_sample(), 16);

    compress(&tif, &CompressOptions::default(), &pool());
    fs::remove_file(&tif).unwrap();
    decompress(dir.path().join("deep.png"), &DecompressOptions::default(), &pool());

    let restored = TiffFile::open(&tif).unwrap();
    assert_eq!(restored.raster, original.raster);
    assert_eq!(restored.tags, original.tags);
}

#[test]
fn test_palette_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("lut.ome.tif");
    write_tiff(&tif, &gray8(16, 16), &palette_tags()).unwrap();
    let original = TiffFile::open(&tif).unwrap();
    assert_eq!(original.palette(), Some(palette()));

    compress(&tif, &CompressOptions::default(), &pool());

    // Sidecar carries the palette next to the tags
    let sidecar = Sidecar::read(&dir.path().join("lut.json")).unwrap();
    assert_eq!(sidecar.palette, Some(palette()));

    fs::remove_file(&tif).unwrap();
    decompress(dir.path().join("lut.png"), &DecompressOptions::default(), &pool());

    let restored = TiffFile::open(&tif).unwrap();
    assert_eq!(restored.raster, original.raster);
    assert_eq!(restored.palette(), Some(palette()));
    assert_eq!(restored.tags, original.tags);
}

#[test]
fn test_palette_restored_without_colormap_tag() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("lut.ome.tif");
    write_tiff(&tif, &gray8(4, 4), &palette_tags()).unwrap();
    compress(&tif, &CompressOptions::default(), &pool());
    fs::remove_file(&tif).unwrap();

    // Drop the color map from the sidecar, keep the palette
    let json = dir.path().join("lut.json");
    let mut sidecar = Sidecar::read(&json).unwrap();
    sidecar.tags.remove("320");
    sidecar.fieldtypes.remove("320");
    sidecar.write(&json).unwrap();

    decompress(dir.path().join("lut.png"), &DecompressOptions::default(), &pool());
    let restored = TiffFile::open(&tif).unwrap();
    assert_eq!(restored.palette(), Some(palette()));
}

#[test]
fn test_big_endian_source() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("foreign.tif");
    let pixels: Vec<u8> = (0..48).map(|i| (i * 5) as u8).collect();
    fs::write(&tif, big_endian_gray_tiff(8, 6, &pixels)).unwrap();
    let original = TiffFile::open(&tif).unwrap();

    compress(&tif, &CompressOptions::default(), &pool());
    fs::remove_file(&tif).unwrap();
    let restored_path = dir.path().join("foreign.ome.tif");
    let tifs = decompress(dir.path().join("foreign.png"), &DecompressOptions::default(), &pool());
    assert_eq!(tifs, vec![Some(restored_path.clone())]);

    let restored = TiffFile::open(&restored_path).unwrap();
    assert_eq!(restored.raster, original.raster);
    assert_eq!(
        restored.tags.get(256),
        Some(&TagValue::Long(vec![8])),
        "width keeps its LONG type"
    );

    // Strip placement depends on the writer; everything else matches
    let mut expected = original.tags.clone();
    let mut actual = restored.tags.clone();
    expected.remove(273);
    actual.remove(273);
    assert_eq!(actual, expected);
}

#[test]
fn test_non_utf8_description_survives_byte_for_byte() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("latin1.ome.tif");
    let description = b"Leica \xB5m scan\0\0".to_vec();
    let mut tags = instrument_tags();
    tags.insert(270, TagValue::Ascii(description.clone()));
    tags.insert(305, TagValue::Ascii(b"LAS X".to_vec()));
    write_tiff(&tif, &gray8(6, 4), &tags).unwrap();
    let original = TiffFile::open(&tif).unwrap();

    compress(&tif, &CompressOptions::default(), &pool());
    fs::remove_file(&tif).unwrap();
    decompress(dir.path().join("latin1.png"), &DecompressOptions::default(), &pool());

    let restored = TiffFile::open(&tif).unwrap();
    assert_eq!(restored.tags, original.tags);
    assert_eq!(restored.tags.get(270), Some(&TagValue::Ascii(description.clone())));

    let bytes = fs::read(&tif).unwrap();
    assert!(bytes.windows(description.len()).any(|w| w == description.as_slice()));
}

#[test]
fn test_single_strip_rows_per_strip_survives() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("strip.ome.tif");
    let mut tags = instrument_tags();
    tags.insert(278, TagValue::Long(vec![u32::MAX]));
    write_tiff(&tif, &gray8(5, 3), &tags).unwrap();
    let original = TiffFile::open(&tif).unwrap();
    assert_eq!(original.tags.get(278), Some(&TagValue::Long(vec![u32::MAX])));

    compress(&tif, &CompressOptions::default(), &pool());
    fs::remove_file(&tif).unwrap();
    decompress(dir.path().join("strip.png"), &DecompressOptions::default(), &pool());

    let restored = TiffFile::open(&tif).unwrap();
    assert_eq!(restored.raster, original.raster);
    assert_eq!(restored.tags, original.tags);
}

#[test]
fn test_decompress_into_folder() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("restored");
    fs::create_dir(&out).unwrap();
    let tif = dir.path().join("a.ome.tif");
    write_tiff(&tif, &gray8(3, 3), &instrument_tags()).unwrap();

    compress(&tif, &CompressOptions::default(), &pool());
    let options = DecompressOptions {
        folder: Some(out.clone()),
        delete_png: true,
        delete_json: true,
    };
    let tifs = decompress(dir.path().join("a.png"), &options, &pool());
    assert_eq!(tifs, vec![Some(out.join("a.ome.tif"))]);
    assert!(!dir.path().join("a.png").exists());
    assert!(!dir.path().join("a.json").exists());
}

// =============================================================================
// Idempotence and Rejection
// =============================================================================

#[test]
fn test_second_compress_leaves_outputs_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("image.ome.tif");
    write_tiff(&tif, &gray8(5, 5), &instrument_tags()).unwrap();

    let first = compress(&tif, &CompressOptions::default(), &pool());
    let png = dir.path().join("image.png");
    let stamp = mtime(&png);
    let json_stamp = mtime(&dir.path().join("image.json"));

    let second = compress(&tif, &CompressOptions::default(), &pool());
    assert_eq!(first, second);
    assert_eq!(mtime(&png), stamp);
    assert_eq!(mtime(&dir.path().join("image.json")), json_stamp);
}

#[test]
fn test_png_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("image.ome.tif");
    write_tiff(&tif, &gray8(5, 5), &instrument_tags()).unwrap();
    compress(&tif, &CompressOptions::default(), &pool());
    let before = snapshot(dir.path());

    let png = dir.path().join("image.png");
    assert!(matches!(
        compress_image(&png, &CompressOptions::default()),
        Err(CodecError::InvalidInput { .. })
    ));
    assert_eq!(compress(&png, &CompressOptions::default(), &pool()), vec![None]);
    assert_eq!(snapshot(dir.path()), before);
}

#[test]
fn test_missing_sidecar_fails_decompress() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("image.ome.tif");
    write_tiff(&tif, &gray8(5, 5), &instrument_tags()).unwrap();
    compress(&tif, &CompressOptions::default(), &pool());
    fs::remove_file(&tif).unwrap();
    fs::remove_file(dir.path().join("image.json")).unwrap();

    let tifs = decompress(dir.path().join("image.png"), &DecompressOptions::default(), &pool());
    assert_eq!(tifs, vec![None]);
    assert!(!tif.exists());
}

#[test]
fn test_compress_into_folder() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("pngs");
    fs::create_dir(&out).unwrap();
    let tif = dir.path().join("a.ome.tif");
    write_tiff(&tif, &gray8(3, 3), &instrument_tags()).unwrap();

    let options = CompressOptions {
        folder: Some(out.clone()),
        ..Default::default()
    };
    assert_eq!(compress(&tif, &options, &pool()), vec![Some(out.join("a.png"))]);
    assert!(out.join("a.json").is_file());
    assert!(!dir.path().join("a.png").exists());
}
