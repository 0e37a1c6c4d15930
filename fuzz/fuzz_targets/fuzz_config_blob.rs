//! Fuzz target: stored config blob
//!
//! Feeds arbitrary bytes through the same decode + validate path
//! `NvsAdapter::load` uses and checks:
//! - No panics under arbitrary byte inputs
//! - Anything that validates survives a save/load round trip
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use orrery::adapters::nvs::{validate_config, NvsAdapter};
use orrery::app::ports::ConfigPort;
use orrery::config::SystemConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(cfg) = postcard::from_bytes::<SystemConfig>(data) else {
        return;
    };
    if validate_config(&cfg).is_err() {
        return;
    }

    let nvs = NvsAdapter::new().expect("host NVS");
    nvs.save(&cfg).expect("validated config must save");
    let loaded = nvs.load().expect("saved config must load");
    // NaN never validates, so PartialEq is reflexive here.
    assert_eq!(loaded, cfg);
});
