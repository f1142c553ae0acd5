#![no_main]

use haa_select::{BTagCalibration, CsvCalibration, JetFlavor, Variation, WorkingPoint};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1 << 14 {
        return;
    }
    if let Ok(calib) = CsvCalibration::from_reader(data, WorkingPoint::Loose) {
        for flavor in [JetFlavor::B, JetFlavor::C, JetFlavor::Udsg] {
            for v in [Variation::Central, Variation::Up, Variation::Down] {
                let _ = calib.evaluate(WorkingPoint::Loose, v, flavor, 0.7, 55.0);
            }
        }
    }
});
