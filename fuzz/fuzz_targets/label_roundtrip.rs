//! Fuzz target for annotation conversion.
//!
//! Any input the parser accepts must convert without panicking, and every
//! rendered row must have exactly five fields.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rddprep::transcode::{convert_str, render_labels, ClassTable};

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let Ok(xml) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(rows) = convert_str(xml, &ClassTable::road_damage()) {
        for line in render_labels(&rows).lines() {
            assert_eq!(line.split(' ').count(), 5);
        }
    }
});
