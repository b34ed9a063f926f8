//! NVS (Non-Volatile Storage) config adapter.
//!
//! Implements [`ConfigPort`]: the [`SystemConfig`] is stored as one
//! `postcard` blob under `animatron::syscfg`.
//!
//! # Security
//!
//! - Config validation: all fields are range-checked before persistence
//!   and again after loading, so a blob written by an older firmware
//!   cannot bypass the limits.
//! - Atomic writes: ESP-IDF NVS commits are atomic per nvs_commit().
//! - The simulation backend is an in-memory map (dev/test only).

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::{SERVO_MAX_ANGLE, SERVO_MIN_ANGLE, SystemConfig};
use log::info;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(not(target_os = "espidf"))]
const CONFIG_NAMESPACE: &str = "animatron";
#[cfg(not(target_os = "espidf"))]
const CONFIG_KEY: &str = "syscfg";

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE_C: &[u8] = b"animatron\0";
#[cfg(target_os = "espidf")]
const CONFIG_KEY_C: &[u8] = b"syscfg\0";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 256;

pub struct NvsConfigStore {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsConfigStore {
    /// Create the store and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably. On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before the task set starts.
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
            info!("NvsConfigStore: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsConfigStore: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key() -> String {
        format!("{}::{}", CONFIG_NAMESPACE, CONFIG_KEY)
    }

    /// Store raw bytes under the config key, bypassing validation.
    /// Lets tests plant corrupt or out-of-range blobs.
    #[cfg(not(target_os = "espidf"))]
    pub fn put_raw(&self, bytes: &[u8]) {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(), bytes.to_vec());
    }

    /// Open the config namespace, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(CONFIG_NAMESPACE_C.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// `Ok(None)` when nothing is stored yet.
    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let result = Self::with_nvs_handle(false, |handle| {
            let key = CONFIG_KEY_C.as_ptr() as *const _;
            let mut size: usize = 0;

            // First call: get size
            let ret = unsafe { nvs_get_blob(handle, key, core::ptr::null_mut(), &mut size) };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH);
            }

            let mut buf = vec![0u8; size];
            let ret = unsafe { nvs_get_blob(handle, key, buf.as_mut_ptr() as *mut _, &mut size) };
            if ret != ESP_OK {
                return Err(ret);
            }
            buf.truncate(size);
            Ok(buf)
        });

        match result {
            Ok(bytes) => Ok(Some(bytes)),
            // A missing namespace reads the same as a missing key.
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
            Err(e) if e == ESP_ERR_NVS_INVALID_LENGTH => Err(ConfigError::Corrupted),
            Err(e) => {
                warn!("NvsConfigStore: NVS read error {}", e);
                Err(ConfigError::IoError)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        Ok(self.store.borrow().get(&Self::composite_key()).cloned())
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&self, bytes: &[u8]) -> Result<(), ConfigError> {
        let result = Self::with_nvs_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    CONFIG_KEY_C.as_ptr() as *const _,
                    bytes.as_ptr() as *const _,
                    bytes.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        result.map_err(|e| {
            warn!("NvsConfigStore: NVS write error {}", e);
            ConfigError::IoError
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&self, bytes: &[u8]) -> Result<(), ConfigError> {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(), bytes.to_vec());
        Ok(())
    }
}

fn angle_in_range(angle: f32) -> bool {
    (SERVO_MIN_ANGLE..=SERVO_MAX_ANGLE).contains(&angle)
}

/// Range-check every field. Rejects, never clamps.
pub fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if !(0.1..=30.0).contains(&cfg.servo_step_deg) {
        return Err(ConfigError::ValidationFailed(
            "servo_step_deg must be 0.1–30.0",
        ));
    }
    if !angle_in_range(cfg.valve_closed_angle) || !angle_in_range(cfg.valve_open_angle) {
        return Err(ConfigError::ValidationFailed(
            "valve angles must be within the servo range",
        ));
    }
    if (cfg.valve_open_angle - cfg.valve_closed_angle).abs() < 1.0 {
        return Err(ConfigError::ValidationFailed(
            "valve_open_angle must differ from valve_closed_angle",
        ));
    }
    if !(100..=60_000).contains(&cfg.valve_max_open_ms) {
        return Err(ConfigError::ValidationFailed(
            "valve_max_open_ms must be 100–60000",
        ));
    }
    if cfg.valve_cooldown_ms > 60_000 {
        return Err(ConfigError::ValidationFailed(
            "valve_cooldown_ms must be 0–60000",
        ));
    }
    if !(1..=100).contains(&cfg.control_period_ms) {
        return Err(ConfigError::ValidationFailed(
            "control_period_ms must be 1–100",
        ));
    }
    if !(5..=500).contains(&cfg.comm_period_ms) {
        return Err(ConfigError::ValidationFailed("comm_period_ms must be 5–500"));
    }
    if !(5..=500).contains(&cfg.animation_period_ms) {
        return Err(ConfigError::ValidationFailed(
            "animation_period_ms must be 5–500",
        ));
    }
    if !(10..=1000).contains(&cfg.status_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "status_interval_ms must be 10–1000",
        ));
    }
    if !(100..=10_000).contains(&cfg.connection_timeout_ms) {
        return Err(ConfigError::ValidationFailed(
            "connection_timeout_ms must be 100–10000",
        ));
    }
    if cfg.connection_timeout_ms <= cfg.comm_period_ms {
        return Err(ConfigError::ValidationFailed(
            "connection_timeout_ms must exceed comm_period_ms",
        ));
    }
    if cfg.lock_timeout_ms == 0 || cfg.lock_timeout_ms >= cfg.control_period_ms {
        return Err(ConfigError::ValidationFailed(
            "lock_timeout_ms must be at least 1 and below control_period_ms",
        ));
    }
    if cfg.limit_debounce_ms > 1000 {
        return Err(ConfigError::ValidationFailed(
            "limit_debounce_ms must be 0–1000",
        ));
    }
    if cfg.diagnostic_hold_ms > 60_000 {
        return Err(ConfigError::ValidationFailed(
            "diagnostic_hold_ms must be 0–60000",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsConfigStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let Some(bytes) = self.read_blob()? else {
            info!("NvsConfigStore: no stored config, using defaults");
            return Ok(SystemConfig::default());
        };
        let cfg: SystemConfig = postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
        validate_config(&cfg)?;
        info!("NvsConfigStore: loaded config ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write_blob(&bytes)?;
        info!("NvsConfigStore: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}
