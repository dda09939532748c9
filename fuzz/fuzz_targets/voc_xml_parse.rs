//! Fuzz target for VOC XML parsing.
//!
//! Feeds arbitrary byte sequences to the annotation parser, checking for
//! panics, crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rddprep::transcode::{parse_voc_slice, ClassTable};

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid excessive memory usage.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = parse_voc_slice(data, &ClassTable::road_damage());
});
