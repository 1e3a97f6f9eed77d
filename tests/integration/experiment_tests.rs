//! Experiment navigation, whole-experiment compression and stitching.
//!
//! Tests verify:
//! - Well lookups return exactly the images of that well
//! - Rows and columns follow the field Y and X indices
//! - Registered tile positions are read in file order
//! - Compressing and decompressing a whole experiment
//! - Stitch jobs handed to a runner, and skipped once outputs exist

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use matrixscan::{
    CompressOptions, DecompressOptions, Experiment, ExperimentError, MacroRunner, StitchJob,
    TiffFile, WorkerPool,
};

use super::test_utils::{gray8, image_name, ExperimentBuilder};

/// Well (0,0): 2 columns x 3 rows, 2 channels. Well (1,0): one field.
fn two_wells() -> ExperimentBuilder {
    ExperimentBuilder::new()
        .with_well(0, 0, 2, 3, 2)
        .with_well(1, 0, 1, 1, 1)
}

// =============================================================================
// Navigation
// =============================================================================

#[test]
fn test_well_images_are_the_well_subset() {
    let tree = two_wells();
    let exp = Experiment::new(tree.root()).unwrap();

    let images = exp.well_images(0, 0);
    let rows = exp.rows(0, 0);
    let columns = exp.columns(0, 0);
    assert_eq!(rows, vec![0, 1, 2]);
    assert_eq!(columns, vec![0, 1]);
    assert_eq!(images.len(), rows.len() * columns.len() * 2);

    for image in &images {
        let name = image.file_name().unwrap().to_string_lossy();
        assert!(name.contains("--U00--V00--"), "{}", name);
    }
    assert_eq!(exp.well_images(1, 0).len(), 1);
    assert_eq!(exp.images().len(), images.len() + 1);
}

#[test]
fn test_hierarchy_counts() {
    let tree = two_wells();
    let exp = Experiment::new(tree.root()).unwrap();

    assert_eq!(exp.slides().len(), 1);
    assert_eq!(exp.wells().len(), 2);
    assert_eq!(exp.fields().len(), 7);
    assert_eq!(exp.dirname(), Some(tree.parent()));
    assert_eq!(exp.basename().as_deref(), Some("experiment--2024_05_01"));
}

#[test]
fn test_image_lookup() {
    let tree = two_wells();
    let exp = Experiment::new(tree.root()).unwrap();

    let image = exp.image(0, 0, 1, 2).unwrap();
    assert_eq!(
        image,
        tree.field_dir(0, 0, 1, 2).join(image_name(0, 0, 1, 2, 0))
    );
    assert_eq!(exp.image(0, 0, 5, 5), None);
}

#[test]
fn test_stitch_coordinates_in_file_order() {
    let tree = two_wells().with_tile_configuration(
        0,
        0,
        &[(0, 0, 0.0, 0.0), (1, 0, 461.5, -1.5), (0, 1, 2.0, 470.0)],
    );
    let exp = Experiment::new(tree.root()).unwrap();

    let coords = exp.stitch_coordinates(0, 0).unwrap().unwrap();
    assert_eq!(coords.len(), 3);
    assert_eq!(coords.xs, vec![0.0, 461.5, 2.0]);
    assert_eq!(coords.ys, vec![0.0, -1.5, 470.0]);
    assert_eq!(coords.attributes[1].x(), Some(1));
    assert_eq!(coords.attributes[2].y(), Some(1));
    assert_eq!(coords.attributes[0].u(), Some(0));
}

#[test]
fn test_stitch_coordinates_malformed_line() {
    let tree = two_wells();
    fs::write(
        tree.well_dir(1, 0).join("TileConfiguration.registered.txt"),
        "dim = 2\nimage--X00--Y00.ome.tif; ; (1.0 2.0)\n",
    )
    .unwrap();
    let exp = Experiment::new(tree.root()).unwrap();

    assert!(matches!(
        exp.stitch_coordinates(1, 0),
        Err(ExperimentError::TileConfiguration { line: 2, .. })
    ));
}

// =============================================================================
// Whole-Experiment Compression
// =============================================================================

#[test]
fn test_compress_and_decompress_experiment() {
    let tree = two_wells();
    let exp = Experiment::new(tree.root()).unwrap();
    let pool = WorkerPool::new(3).unwrap();
    let count = exp.images().len();

    let compress = CompressOptions {
        delete_original: true,
        ..Default::default()
    };
    let pngs = exp.compress(&compress, &pool);
    assert_eq!(pngs.len(), count);
    assert!(pngs.iter().all(Option::is_some));

    // Listing reflects the change without reopening
    let images = exp.images();
    assert_eq!(images.len(), count);
    assert!(images.iter().all(|p| p.extension().unwrap() == "png"));

    let decompress = DecompressOptions {
        delete_png: true,
        delete_json: true,
        ..Default::default()
    };
    let tifs = exp.decompress(&decompress, &pool);
    assert_eq!(tifs.len(), count);

    let images = exp.images();
    assert_eq!(images.len(), count);
    for image in images {
        assert!(image.to_string_lossy().ends_with(".ome.tif"));
        assert_eq!(TiffFile::open(&image).unwrap().raster, gray8(8, 6));
    }
}

// =============================================================================
// Stitching
// =============================================================================

/// Records jobs and writes an empty file per output.
#[derive(Default)]
struct RecordingRunner {
    jobs: Mutex<Vec<StitchJob>>,
}

impl MacroRunner for RecordingRunner {
    fn run(&self, jobs: &[StitchJob]) -> Result<Vec<PathBuf>, ExperimentError> {
        self.jobs.lock().unwrap().extend_from_slice(jobs);
        for job in jobs {
            fs::write(&job.output, b"")?;
        }
        Ok(jobs.iter().map(|job| job.output.clone()).collect())
    }
}

#[test]
fn test_stitch_runs_one_job_per_channel() {
    let tree = two_wells();
    let exp = Experiment::new(tree.root()).unwrap();
    let pool = WorkerPool::new(2).unwrap();
    let runner = RecordingRunner::default();

    let mut outputs = exp.stitch(None, &runner, &pool);
    outputs.sort();
    assert_eq!(outputs, exp.stitched());
    assert_eq!(outputs.len(), 3);

    let mut jobs = runner.jobs.lock().unwrap().clone();
    jobs.sort_by(|a, b| a.output.cmp(&b.output));
    assert_eq!(
        jobs[0].output,
        tree.root().join("stitched--U00--V00--C00--Z00.png")
    );
    assert_eq!(jobs[0].grid, (2, 3));
    assert_eq!(jobs[0].start, (0, 0));
    assert_eq!(jobs[2].grid, (1, 1));

    // Template resolves to real files
    let first = jobs[0]
        .file_names
        .replace("{xx}", "01")
        .replace("{yy}", "02");
    assert!(jobs[0].well.join(first).is_file());
}

#[test]
fn test_stitch_skips_existing_outputs() {
    let tree = two_wells();
    let exp = Experiment::new(tree.root()).unwrap();
    let pool = WorkerPool::new(2).unwrap();

    let first = RecordingRunner::default();
    exp.stitch(None, &first, &pool);

    let second = RecordingRunner::default();
    let outputs = exp.stitch(None, &second, &pool);
    assert_eq!(outputs.len(), 3);
    assert!(second.jobs.lock().unwrap().is_empty());
}

#[test]
fn test_stitch_into_folder() {
    let tree = two_wells();
    let out = tree.parent().join("stitched-out");
    fs::create_dir(&out).unwrap();
    let exp = Experiment::new(tree.root()).unwrap();
    let pool = WorkerPool::new(1).unwrap();

    let outputs = exp.stitch(Some(out.as_path()), &RecordingRunner::default(), &pool);
    assert_eq!(outputs.len(), 3);
    assert!(outputs.iter().all(|p| p.starts_with(&out)));
    assert!(exp.stitched().is_empty());
}
