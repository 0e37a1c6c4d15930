//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] for the orrery.
//! The config is a postcard blob under `orrery::syscfg`; the diagnostic
//! journal keeps its segments in their own namespace through the same
//! [`StoragePort`].
//!
//! - Config validation: every field is range-checked before persistence.
//! - Atomic writes: ESP-IDF NVS commits are atomic per nvs_commit().
//! - NVS keys and namespaces are limited to 15 bytes; longer names are
//!   truncated.

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::astro::solar::MAX_LATITUDE_DEG;
use crate::diagnostics::MAX_BACKUPS;
use crate::config::{HomingConfig, SystemConfig};
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub const CONFIG_NAMESPACE: &str = "orrery";
pub const CONFIG_KEY: &str = "syscfg";

/// Largest blob NVS stores in a single entry.
pub const MAX_BLOB_SIZE: usize = 4000;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

/// NUL-terminated copy of an NVS key or namespace.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn nvs_name(name: &str) -> [u8; 16] {
    let mut buf = [0u8; 16];
    let bytes = name.as_bytes();
    let len = bytes.len().min(15);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably. On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = nvs_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        // SAFETY: handle was opened above and is closed exactly once.
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Read a whole blob, sizing the buffer from NVS first.
    #[cfg(target_os = "espidf")]
    fn read_blob(namespace: &str, key: &str) -> Result<Vec<u8>, i32> {
        let key = nvs_name(key);
        Self::with_nvs_handle(namespace, false, |handle| {
            let mut size: usize = 0;
            // SAFETY: a null data pointer asks NVS for the stored length only.
            let ret = unsafe {
                nvs_get_blob(handle, key.as_ptr() as *const _, core::ptr::null_mut(), &mut size)
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH as i32);
            }
            let mut buf = vec![0u8; size];
            // SAFETY: buf holds exactly `size` bytes.
            let ret = unsafe {
                nvs_get_blob(handle, key.as_ptr() as *const _, buf.as_mut_ptr() as *mut _, &mut size)
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf)
        })
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(namespace: &str, key: &str, data: &[u8]) -> Result<(), i32> {
        let key = nvs_name(key);
        Self::with_nvs_handle(namespace, true, |handle| {
            // SAFETY: data pointer and length come from one live slice.
            let ret = unsafe {
                nvs_set_blob(handle, key.as_ptr() as *const _, data.as_ptr() as *const _, data.len())
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            // SAFETY: handle is open read-write.
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
    }
}

fn validate_homing(h: &HomingConfig, scan: &'static str, sensor: &'static str) -> Result<(), ConfigError> {
    if !(1..=10_000).contains(&h.max_scan_steps) {
        return Err(ConfigError::ValidationFailed(scan));
    }
    if !(1..=1_000).contains(&h.max_sensor_steps) {
        return Err(ConfigError::ValidationFailed(sensor));
    }
    Ok(())
}

pub fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if !(4..=51_200).contains(&cfg.steps_per_revolution) {
        return Err(ConfigError::ValidationFailed(
            "steps_per_revolution must be 4–51200",
        ));
    }
    if cfg.step_settle_ms > 1_000 {
        return Err(ConfigError::ValidationFailed(
            "step_settle_ms must be 0–1000",
        ));
    }
    if !(1..=86_400).contains(&cfg.sample_interval_secs) {
        return Err(ConfigError::ValidationFailed(
            "sample_interval_secs must be 1–86400",
        ));
    }
    if !(0.0..0.5).contains(&cfg.quantize_hysteresis_steps) {
        return Err(ConfigError::ValidationFailed(
            "quantize_hysteresis_steps must be 0.0–0.5 (exclusive)",
        ));
    }
    validate_homing(
        &cfg.orbit_homing,
        "orbit_homing.max_scan_steps must be 1–10000",
        "orbit_homing.max_sensor_steps must be 1–1000",
    )?;
    validate_homing(
        &cfg.rotation_homing,
        "rotation_homing.max_scan_steps must be 1–10000",
        "rotation_homing.max_sensor_steps must be 1–1000",
    )?;
    if !(1..=10).contains(&cfg.calibration_attempts) {
        return Err(ConfigError::ValidationFailed(
            "calibration_attempts must be 1–10",
        ));
    }
    // Poleward of this the Sun can stay up or down for a whole day, and
    // the noon/nadir sequence runs out of events.
    if !(-MAX_LATITUDE_DEG..=MAX_LATITUDE_DEG)
        .contains(&cfg.observer_latitude_deg)
    {
        return Err(ConfigError::ValidationFailed(
            "observer_latitude_deg must be -65–65",
        ));
    }
    if !(-180.0..=180.0).contains(&cfg.observer_longitude_deg) {
        return Err(ConfigError::ValidationFailed(
            "observer_longitude_deg must be -180–180",
        ));
    }
    if !(256..=MAX_BLOB_SIZE as u32).contains(&cfg.journal_segment_bytes) {
        return Err(ConfigError::ValidationFailed(
            "journal_segment_bytes must be 256–4000",
        ));
    }
    if !(1..=MAX_BACKUPS).contains(&cfg.journal_backups) {
        return Err(ConfigError::ValidationFailed(
            "journal_backups must be 1–16",
        ));
    }
    if !(1..=64).contains(&cfg.journal_flush_lines) {
        return Err(ConfigError::ValidationFailed(
            "journal_flush_lines must be 1–64",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        let stored = self
            .store
            .borrow()
            .get(&Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY))
            .cloned();

        #[cfg(target_os = "espidf")]
        let stored = match Self::read_blob(CONFIG_NAMESPACE, CONFIG_KEY) {
            Ok(bytes) => Some(bytes),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => None,
            Err(e) => {
                warn!("NvsAdapter: NVS read error {}, using defaults", e);
                None
            }
        };

        match stored {
            Some(bytes) => {
                let cfg: SystemConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                validate_config(&cfg)?;
                info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            None => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY), bytes);
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            match Self::write_blob(CONFIG_NAMESPACE, CONFIG_KEY, &bytes) {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            match self.store.borrow().get(&composite) {
                Some(data) => {
                    let len = data.len().min(buf.len());
                    buf[..len].copy_from_slice(&data[..len]);
                    Ok(len)
                }
                None => Err(StorageError::NotFound),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            match Self::read_blob(namespace, key) {
                Ok(data) => {
                    let len = data.len().min(buf.len());
                    buf[..len].copy_from_slice(&data[..len]);
                    Ok(len)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(StorageError::Full);
        }

        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().insert(composite, data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            Self::write_blob(namespace, key, data).map_err(|e| {
                if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE as i32 {
                    StorageError::Full
                } else {
                    StorageError::IoError
                }
            })
        }
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow_mut().remove(&composite);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = nvs_name(key);
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                // SAFETY: key is NUL-terminated; handle is open read-write.
                let ret = unsafe { nvs_erase_key(handle, key.as_ptr() as *const _) };
                if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                // A namespace that was never written has nothing to delete.
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(()),
                other => other.map_err(|_| StorageError::IoError),
            }
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(namespace, key);
            self.store.borrow().contains_key(&composite)
        }

        #[cfg(target_os = "espidf")]
        {
            let key = nvs_name(key);
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                // SAFETY: key is NUL-terminated; a null type pointer is allowed.
                let ret = unsafe {
                    nvs_find_key(handle, key.as_ptr() as *const _, core::ptr::null_mut())
                };
                Ok(ret == ESP_OK)
            });
            result.unwrap_or(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        let cfg = SystemConfig::default();
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn rejects_zero_step_motor() {
        let cfg = SystemConfig {
            steps_per_revolution: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_hysteresis_of_half_a_step() {
        let cfg = SystemConfig {
            quantize_hysteresis_steps: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_empty_homing_budget() {
        let mut cfg = SystemConfig::default();
        cfg.rotation_homing.max_scan_steps = 0;
        assert_eq!(
            validate_config(&cfg),
            Err(ConfigError::ValidationFailed(
                "rotation_homing.max_scan_steps must be 1–10000"
            ))
        );
    }

    #[test]
    fn rejects_observer_off_the_globe() {
        let cfg = SystemConfig {
            observer_latitude_deg: 91.0,
            ..Default::default()
        };
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn rejects_observer_with_polar_days() {
        for latitude in [65.1, -70.0, 80.0] {
            let cfg = SystemConfig {
                observer_latitude_deg: latitude,
                ..Default::default()
            };
            assert_eq!(
                validate_config(&cfg),
                Err(ConfigError::ValidationFailed("observer_latitude_deg must be -65–65"))
            );
        }
        let edge = SystemConfig {
            observer_latitude_deg: -65.0,
            ..Default::default()
        };
        assert!(validate_config(&edge).is_ok());
    }

    #[test]
    fn rejects_zero_line_journal_flush() {
        let cfg = SystemConfig {
            journal_flush_lines: 0,
            ..Default::default()
        };
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn config_round_trip_and_rejected_save() {
        let nvs = NvsAdapter::new().unwrap();
        assert_eq!(nvs.load().unwrap(), SystemConfig::default());

        let cfg = SystemConfig {
            sample_interval_secs: 30,
            calibration_attempts: 3,
            ..Default::default()
        };
        nvs.save(&cfg).unwrap();
        assert_eq!(nvs.load().unwrap(), cfg);

        let bad = SystemConfig {
            calibration_attempts: 0,
            ..Default::default()
        };
        assert!(nvs.save(&bad).is_err());
        assert_eq!(nvs.load().unwrap(), cfg);
    }

    #[test]
    fn corrupted_blob_is_reported() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write(CONFIG_NAMESPACE, CONFIG_KEY, &[0xFF; 3]).unwrap();
        assert_eq!(nvs.load(), Err(ConfigError::Corrupted));
    }

    #[test]
    fn storage_round_trip() {
        let mut nvs = NvsAdapter::new().unwrap();
        let data = b"hello NVS";
        nvs.write("test_ns", "greeting", data).unwrap();
        assert!(nvs.exists("test_ns", "greeting"));

        let mut buf = [0u8; 64];
        let len = nvs.read("test_ns", "greeting", &mut buf).unwrap();
        assert_eq!(&buf[..len], data);

        nvs.delete("test_ns", "greeting").unwrap();
        assert!(!nvs.exists("test_ns", "greeting"));
    }

    #[test]
    fn oversized_blob_rejected() {
        let mut nvs = NvsAdapter::new().unwrap();
        let big = vec![0u8; MAX_BLOB_SIZE + 1];
        assert_eq!(nvs.write("ns", "big", &big), Err(StorageError::Full));
    }

    #[test]
    fn namespace_isolation() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write("ns_a", "key", b"alpha").unwrap();
        nvs.write("ns_b", "key", b"bravo").unwrap();

        let mut buf = [0u8; 64];
        let len = nvs.read("ns_a", "key", &mut buf).unwrap();
        assert_eq!(&buf[..len], b"alpha");

        let len = nvs.read("ns_b", "key", &mut buf).unwrap();
        assert_eq!(&buf[..len], b"bravo");
    }
}
