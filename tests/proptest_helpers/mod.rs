#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Distinct image file names such as `img_0003.jpg`.
pub fn arb_image_names(max_len: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(0u32..10_000, 0..=max_len).prop_map(|ids| {
        ids.into_iter()
            .map(|id| format!("img_{id:04}.jpg"))
            .collect()
    })
}

/// An image size and a non-empty box that lies inside it, as
/// `(width, height, xmin, ymin, xmax, ymax)`.
pub fn arb_box_in_image() -> impl Strategy<Value = (u32, u32, u32, u32, u32, u32)> {
    (2u32..4096, 2u32..4096).prop_flat_map(|(width, height)| {
        (0..width, 0..height).prop_flat_map(move |(xmin, ymin)| {
            (xmin + 1..=width, ymin + 1..=height)
                .prop_map(move |(xmax, ymax)| (width, height, xmin, ymin, xmax, ymax))
        })
    })
}
