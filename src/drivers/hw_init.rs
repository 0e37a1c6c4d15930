//! One-shot hardware peripheral initialization and raw GPIO access.
//!
//! Configures the STEP/DIR/ENABLE outputs and the hall inputs using raw
//! ESP-IDF sys calls.  Called once from `main()` before calibration.
//!
//! [`GpioPin`] wraps a pin number in the `embedded-hal` digital traits so
//! the generic stepper and hall drivers sit directly on top of it.  On the
//! host the pin levels live in an atomic table that tests can poke.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before calibration; single-threaded.
    unsafe {
        init_gpio_outputs()?;
        init_gpio_inputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    release_all_motors();
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    for &pin in &pins::OUTPUT_PINS {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
        unsafe { gpio_set_level(pin, 0) };
    }
    // Boot with both drivers disabled (ENABLE is active-low).
    release_all_motors();

    info!("hw_init: GPIO outputs configured, motors released");
    Ok(())
}

/// Drive every ENABLE line HIGH.  Safe to call from the panic hook.
pub fn release_all_motors() {
    for &pin in &pins::ENABLE_PINS {
        // Level writes cannot meaningfully fail on a configured output.
        let _ = gpio_write(pin, true);
    }
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), i32> {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during init_gpio_outputs(). Main-loop only.
    let ret = unsafe { gpio_set_level(pin, u32::from(high)) };
    if ret == ESP_OK as i32 { Ok(()) } else { Err(ret) }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), i32> {
    sim::set_level(pin, high);
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // A3144 outputs are open-drain; the internal pull-up holds them HIGH
    // while no magnet is present.
    for &pin in &pins::INPUT_PINS {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    }

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from main context.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    sim::level(pin)
}

// ── Host simulation ───────────────────────────────────────────

/// Host-side pin levels.  Unwritten pins read HIGH, like a pulled-up
/// input with nothing pulling it down.
#[cfg(not(target_os = "espidf"))]
pub mod sim {
    use core::sync::atomic::{AtomicBool, Ordering};

    const PIN_COUNT: usize = 49;

    static LEVELS: [AtomicBool; PIN_COUNT] = [const { AtomicBool::new(true) }; PIN_COUNT];

    pub fn set_level(pin: i32, high: bool) {
        if let Some(slot) = usize::try_from(pin).ok().and_then(|i| LEVELS.get(i)) {
            slot.store(high, Ordering::Relaxed);
        }
    }

    pub fn level(pin: i32) -> bool {
        usize::try_from(pin)
            .ok()
            .and_then(|i| LEVELS.get(i))
            .is_none_or(|slot| slot.load(Ordering::Relaxed))
    }

    /// Serializes unit tests that touch the board pins.
    #[cfg(test)]
    pub(crate) static BOARD_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
}

// ── embedded-hal pin wrapper ──────────────────────────────────

/// A raw GPIO number exposed through the `embedded-hal` digital traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioPin(pub i32);

/// `esp_err_t` from a failed level write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioError(pub i32);

impl embedded_hal::digital::Error for GpioError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl ErrorType for GpioPin {
    type Error = GpioError;
}

impl OutputPin for GpioPin {
    fn set_low(&mut self) -> Result<(), GpioError> {
        gpio_write(self.0, false).map_err(GpioError)
    }

    fn set_high(&mut self) -> Result<(), GpioError> {
        gpio_write(self.0, true).map_err(GpioError)
    }
}

impl InputPin for GpioPin {
    fn is_high(&mut self) -> Result<bool, GpioError> {
        Ok(gpio_read(self.0))
    }

    fn is_low(&mut self) -> Result<bool, GpioError> {
        Ok(!gpio_read(self.0))
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Blocking delay backed by `std::thread::sleep`.
///
/// On ESP-IDF, sub-tick sleeps busy-wait in `usleep`, so microsecond
/// pulse timing holds; millisecond settles yield to the scheduler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDelay;

impl DelayNs for SystemDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
