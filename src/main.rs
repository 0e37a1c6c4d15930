//! Orrery Firmware — Main Entry Point
//!
//! Calibrate-then-track on a single thread:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareRig        LogEventSink   NvsAdapter   SystemClock    │
//! │  (Stepper+Hall)     JournalSink    (Config+NVS) (ClockPort)    │
//! │  WifiStation + SNTP                                            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            OrreryService (pure logic)                  │    │
//! │  │  homing FSM · Earth model · motion controller          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error returned from `main` ends the run; the release guard
//! de-energizes both motors on the way out and ESP-IDF restarts the chip.
#![deny(unused_must_use)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use orrery::adapters::hardware::board_rig;
use orrery::adapters::log_sink::LogEventSink;
use orrery::adapters::nvs::NvsAdapter;
use orrery::adapters::time::{start_sntp, SystemClock};
use orrery::adapters::wifi::{WifiCredentials, WifiStation};
use orrery::app::ports::ConfigPort;
use orrery::app::service::OrreryService;
use orrery::astro::SolarAlmanac;
use orrery::config::SystemConfig;
use orrery::diagnostics::{install_panic_handler, Journal, JournalSink};
use orrery::drivers::hw_init;
use orrery::motion::MotionController;
use orrery::safety::ReleaseGuard;

const SNTP_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Orrery v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals: motors released before anything else ──
    hw_init::init_peripherals().context("GPIO init")?;

    // ── 3. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new().context("NVS init")?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };
    install_panic_handler(config.journal_segment_bytes, config.journal_backups);

    // ── 4. Network time ───────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let mut wifi = match WifiCredentials::from_build_env()
        .and_then(|creds| WifiStation::connect(peripherals.modem, sysloop, nvs_partition, &creds))
    {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("WiFi unavailable ({}), relying on the RTC", e);
            None
        }
    };
    let _sntp = match start_sntp(SNTP_TIMEOUT) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("SNTP start failed: {}", e);
            None
        }
    };
    let clock = SystemClock::new();

    // ── 5. Adapters ───────────────────────────────────────────
    let mut rig = ReleaseGuard::new(board_rig());
    let journal = Journal::open(nvs, config.journal_segment_bytes, config.journal_backups)
        .with_flush_lines(config.journal_flush_lines);
    let mut sinks = (LogEventSink::new(), JournalSink::new(journal));

    // ── 6. Service ────────────────────────────────────────────
    let almanac = SolarAlmanac::new(config.observer_latitude_deg, config.observer_longitude_deg);
    let mut service = OrreryService::new(almanac, config.clone());
    service.start(&mut sinks);

    // ── 7. Calibration gate ───────────────────────────────────
    let homed = service.calibrate(&mut *rig, &mut sinks).inspect_err(|e| {
        error!("Calibration failed: {} — not tracking", e);
    })?;
    let mut motion = MotionController::new(service.config(), homed);

    info!("Calibrated. Entering sample loop.");

    // ── 8. Sample loop ────────────────────────────────────────
    let interval = Duration::from_secs(u64::from(config.sample_interval_secs));
    loop {
        let started = Instant::now();
        if let Some(w) = wifi.as_mut() {
            w.poll(started);
        }

        if let Err(e) = service.sample(&mut motion, &clock, &mut *rig, &mut sinks) {
            service.triage(e, &mut sinks).inspect_err(|e| {
                error!("Fatal: {} — stopping", e);
            })?;
        }

        std::thread::sleep(interval);
    }
}
