#![no_main]

use cattle_growth_analyzer::{io::read_json_from_bytes, Analyzer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(dataset) = read_json_from_bytes(data, "fuzz") {
        let _ = Analyzer::new(&dataset).quality(3.0);
        let _ = Analyzer::new(&dataset).summaries();
    }
});
