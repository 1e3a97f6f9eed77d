//! Worker pool behavior seen through batch operations.

use std::collections::HashSet;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use matrixscan::format::tiff::write_tiff;
use matrixscan::{chop, compress, CompressOptions, WorkerPool};

use super::test_utils::{gray8, instrument_tags};

#[test]
fn test_results_follow_input_order_under_skewed_delays() {
    let pool = WorkerPool::new(4).unwrap();
    let jobs: Vec<u64> = (0..24).collect();

    let results = pool.map(jobs, |i| {
        // First jobs finish last
        thread::sleep(Duration::from_millis((24 - i) * 2));
        format!("job-{}", i)
    });

    let expected: Vec<String> = (0..24).map(|i| format!("job-{}", i)).collect();
    assert_eq!(results, expected);
}

#[test]
fn test_jobs_spread_over_named_workers() {
    let pool = WorkerPool::new(3).unwrap();
    let names = Mutex::new(HashSet::new());

    pool.map((0..12).collect::<Vec<_>>(), |_| {
        thread::sleep(Duration::from_millis(5));
        let name = thread::current().name().map(str::to_string);
        names.lock().unwrap().insert(name);
    });

    let names = names.into_inner().unwrap();
    assert!(!names.is_empty() && names.len() <= 3);
    assert!(names
        .iter()
        .all(|n| n.as_deref().is_some_and(|n| n.starts_with("matrixscan-worker-"))));
}

#[test]
fn test_batch_compress_keeps_order_with_failures() {
    let dir = tempfile::tempdir().unwrap();
    let mut inputs = Vec::new();
    for i in 0..6 {
        let tif = dir.path().join(format!("image--X{:02}.ome.tif", i));
        if i % 3 != 1 {
            write_tiff(&tif, &gray8(4 + i, 3), &instrument_tags()).unwrap();
        }
        inputs.push(tif);
    }

    let pool = WorkerPool::new(3).unwrap();
    let results = compress(inputs, &CompressOptions::default(), &pool);

    let expected: Vec<_> = (0..6)
        .map(|i| (i % 3 != 1).then(|| dir.path().join(format!("image--X{:02}.png", i))))
        .collect();
    assert_eq!(results, expected);
}

#[test]
fn test_chop_covers_every_item_once() {
    let items: Vec<u32> = (0..23).collect();
    for n in 1..=8 {
        let chunks = chop(&items, n);
        assert_eq!(chunks.len(), n);
        assert_eq!(chunks.concat(), items);
    }
}
