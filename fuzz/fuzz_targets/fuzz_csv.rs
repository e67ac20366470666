#![no_main]

use cattle_growth_analyzer::{io::read_csv_from_bytes, Analyzer, GrowthConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(dataset) = read_csv_from_bytes(data, "fuzz") {
        let analyzer = Analyzer::new(&dataset);
        let _ = analyzer.quality(3.0);
        let _ = analyzer.run(&GrowthConfig::default());
    }
});
