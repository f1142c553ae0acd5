#![no_main]

use haa_select::formula::Formula;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(src) = std::str::from_utf8(data) else {
        return;
    };
    // Deeply nested inputs only exercise the recursion limit; keep runs fast.
    if src.len() > 4096 {
        return;
    }
    if let Ok(f) = Formula::compile(src) {
        for x in [0.0, 20.0, 1000.0, -1.0, f64::NAN] {
            let _ = f.eval(x);
        }
    }
});
