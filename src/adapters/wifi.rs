//! WiFi station-mode adapter.
//!
//! The orrery only needs the network for SNTP, so this is a thin station:
//! credentials baked in at build time (`ORRERY_WIFI_SSID` /
//! `ORRERY_WIFI_PASS`), a blocking connect at boot, and a reconnect check
//! from the sample loop with exponential backoff.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stub that always connects.
//!
//! ## Reconnection policy
//!
//! On disconnect the adapter waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) between retries.

use core::fmt;
use std::time::{Duration, Instant};

use log::{info, warn};

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    /// ESP-IDF driver error code.
    Driver(i32),
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::Driver(code) => write!(f, "WiFi driver error {code}"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

#[cfg(target_os = "espidf")]
impl From<esp_idf_svc::sys::EspError> for ConnectivityError {
    fn from(e: esp_idf_svc::sys::EspError) -> Self {
        Self::Driver(e.code())
    }
}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        if ssid.is_empty() || !is_printable_ascii(ssid) {
            return Err(ConnectivityError::InvalidSsid);
        }
        if !password.is_empty() && password.len() < 8 {
            return Err(ConnectivityError::InvalidPassword);
        }
        let mut creds = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        creds.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        creds
            .password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(creds)
    }

    /// Credentials compiled in from `ORRERY_WIFI_SSID` / `ORRERY_WIFI_PASS`.
    pub fn from_build_env() -> Result<Self, ConnectivityError> {
        let ssid = option_env!("ORRERY_WIFI_SSID").ok_or(ConnectivityError::NoCredentials)?;
        Self::new(ssid, option_env!("ORRERY_WIFI_PASS").unwrap_or(""))
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Backoff
// ───────────────────────────────────────────────────────────────

const MIN_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 60;

/// Exponential retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    secs: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            secs: MIN_BACKOFF_SECS,
        }
    }
}

impl Backoff {
    pub fn current(&self) -> Duration {
        Duration::from_secs(self.secs)
    }

    /// Double the wait, up to the cap.
    pub fn fail(&mut self) {
        self.secs = (self.secs * 2).min(MAX_BACKOFF_SECS);
    }

    pub fn reset(&mut self) {
        self.secs = MIN_BACKOFF_SECS;
    }
}

// ───────────────────────────────────────────────────────────────
// Station
// ───────────────────────────────────────────────────────────────

pub struct WifiStation {
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    #[cfg(not(target_os = "espidf"))]
    connected: bool,
    backoff: Backoff,
    next_retry: Option<Instant>,
}

impl WifiStation {
    /// Bring the station up and block until it has an IP.
    #[cfg(target_os = "espidf")]
    pub fn connect(
        modem: esp_idf_hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        nvs: esp_idf_svc::nvs::EspDefaultNvsPartition,
        creds: &WifiCredentials,
    ) -> Result<Self, ConnectivityError> {
        use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

        let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), Some(nvs))?, sysloop)?;
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: creds.ssid.clone(),
            password: creds.password.clone(),
            auth_method: if creds.is_open() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        }))?;
        wifi.start()?;
        info!("WiFi: connecting to '{}'", creds.ssid());
        wifi.connect()?;
        wifi.wait_netif_up()?;
        info!("WiFi: connected");

        Ok(Self {
            wifi,
            backoff: Backoff::default(),
            next_retry: None,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn connect(creds: &WifiCredentials) -> Result<Self, ConnectivityError> {
        info!("WiFi(sim): connected to '{}'", creds.ssid());
        Ok(Self {
            connected: true,
            backoff: Backoff::default(),
            next_retry: None,
        })
    }

    #[cfg(target_os = "espidf")]
    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[cfg(target_os = "espidf")]
    fn reconnect(&mut self) -> Result<(), ConnectivityError> {
        self.wifi.connect()?;
        self.wifi.wait_netif_up()?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn reconnect(&mut self) -> Result<(), ConnectivityError> {
        self.connected = true;
        Ok(())
    }

    /// Simulate a dropped link (host only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop(&mut self) {
        self.connected = false;
    }

    /// Called once per sample.  Retries a lost link when its backoff has
    /// elapsed; never blocks longer than one connect attempt.
    pub fn poll(&mut self, now: Instant) {
        if self.is_connected() {
            self.backoff.reset();
            self.next_retry = None;
            return;
        }
        match self.next_retry {
            Some(at) if now < at => return,
            None => {
                warn!("WiFi: connection lost, entering reconnect");
            }
            Some(_) => {}
        }
        match self.reconnect() {
            Ok(()) => {
                info!("WiFi: reconnected");
                self.backoff.reset();
                self.next_retry = None;
            }
            Err(e) => {
                self.backoff.fail();
                warn!("WiFi: reconnect failed ({e}), next try in {:?}", self.backoff.current());
                self.next_retry = Some(now + self.backoff.current());
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
