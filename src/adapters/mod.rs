//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements              | Connects to                   |
//! |-------------|-------------------------|-------------------------------|
//! | `hardware`  | StepperPort             | STEP/DIR drivers via GPIO     |
//! |             | PresenceSensor          | A3144 hall switches           |
//! |             | MotorRig                | both axes + settle delay      |
//! | `log_sink`  | EventSink               | Serial log output             |
//! | `nvs`       | ConfigPort              | NVS / in-memory store         |
//! |             | StoragePort             |                               |
//! | `time`      | ClockPort               | RTC, kept synced by SNTP      |
//! | `wifi`      | —                       | ESP-IDF WiFi STA (for SNTP)   |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod wifi;
