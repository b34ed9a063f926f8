//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements     | Connects to                      |
//! |------------|----------------|----------------------------------|
//! | `board`    | ActuatorPort   | servo PWM, light / diag GPIO     |
//! |            | IndicatorPort  | RGB strip PWM, frame hand-off    |
//! | `log_sink` | EventSink      | Serial log output                |
//! | `nvs`      | ConfigPort     | NVS / in-memory store            |
//! | `time`     | Clock          | ESP32 system timer               |
//! | `uart`     | Transport      | UART link to the vision host     |

pub mod board;
pub mod log_sink;
pub mod nvs;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod uart;
