//! Wall-clock adapter.
//!
//! Implements [`ClockPort`] on top of the system real-time clock, which
//! ESP-IDF keeps in step with SNTP once WiFi is up.
//!
//! - **`target_os = "espidf"`** — `chrono::Utc::now()` reads
//!   `gettimeofday()`; [`start_sntp`] starts the ESP-IDF SNTP client and
//!   waits for the first sync.
//! - **`not(target_os = "espidf")`** — the host clock, always synced.

use chrono::{DateTime, Utc};

use crate::app::ports::ClockPort;
use crate::astro::time::JulianDate;
use crate::error::ClockError;

/// Anything earlier means the RTC has not been set since power-up.
pub const EPOCH_2020: i64 = 1_577_836_800;

/// Wall-clock reading → [`JulianDate`], rejecting unsynced time.
pub fn julian_from_utc(now: DateTime<Utc>) -> Result<JulianDate, ClockError> {
    if now.timestamp() < EPOCH_2020 {
        return Err(ClockError::NotSynced);
    }
    Ok(JulianDate::from_utc(now))
}

/// System wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> Result<JulianDate, ClockError> {
        julian_from_utc(Utc::now())
    }
}

/// Start SNTP and block until the first sync or `timeout` elapses.
///
/// The returned handle must stay alive for the client to keep running.
#[cfg(target_os = "espidf")]
pub fn start_sntp(
    timeout: core::time::Duration,
) -> Result<esp_idf_svc::sntp::EspSntp<'static>, esp_idf_svc::sys::EspError> {
    use esp_idf_svc::sntp::{EspSntp, SyncStatus};
    use log::{info, warn};

    let sntp = EspSntp::new_default()?;
    let started = std::time::Instant::now();
    while sntp.get_sync_status() != SyncStatus::Completed {
        if started.elapsed() >= timeout {
            warn!("SNTP: no sync after {:?}, continuing", timeout);
            return Ok(sntp);
        }
        std::thread::sleep(core::time::Duration::from_millis(200));
    }
    info!("SNTP: synced in {:?}", started.elapsed());
    Ok(sntp)
}
