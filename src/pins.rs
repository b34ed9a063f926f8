//! GPIO / peripheral pin assignments for the animatron head board
//! (ESP32-WROOM-32).
//!
//! Single source of truth. Every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.
//!
//! GPIO 6–11 are wired to the module's internal flash; never assign them.

// ---------------------------------------------------------------------------
// Servos (LEDC timer 0, 50 Hz)
// ---------------------------------------------------------------------------

pub const SERVO_PAN_GPIO: i32 = 2;
pub const SERVO_TILT_GPIO: i32 = 15;
pub const SERVO_AUX_GPIO: i32 = 13;
/// Servo-actuated dispensing valve.
pub const SERVO_VALVE_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Pan travel limit switches (active LOW, internal pull-up)
// ---------------------------------------------------------------------------

/// Closed when pan has reached its high-angle end.
pub const LIMIT_POSITIVE_GPIO: i32 = 33;
/// Closed when pan has reached its low-angle end.
pub const LIMIT_NEGATIVE_GPIO: i32 = 21;

// ---------------------------------------------------------------------------
// Digital outputs
// ---------------------------------------------------------------------------

/// Main illumination (HIGH = on).
pub const LIGHT_GPIO: i32 = 19;
/// Diagnostic / test LED (HIGH = on).
pub const DIAGNOSTIC_LED_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// RGB strip (LEDC timer 1)
// ---------------------------------------------------------------------------

pub const RGB_R_GPIO: i32 = 27;
pub const RGB_G_GPIO: i32 = 14;
pub const RGB_B_GPIO: i32 = 12;

// ---------------------------------------------------------------------------
// Dot matrix (2 × MAX7219, driven outside the core)
// ---------------------------------------------------------------------------

pub const MATRIX_DIN_GPIO: i32 = 25;
pub const MATRIX_CLK_GPIO: i32 = 32;
pub const MATRIX_CS_GPIO: i32 = 26;

// ---------------------------------------------------------------------------
// UART link to the vision host (UART2)
// ---------------------------------------------------------------------------

pub const UART_RX_GPIO: i32 = 16;
pub const UART_TX_GPIO: i32 = 17;
pub const UART_BAUD: u32 = 115_200;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution for servos (bits). 14 bits at 50 Hz gives
/// about 1.2 us per step.
pub const SERVO_PWM_RESOLUTION_BITS: u32 = 14;
/// LEDC timer resolution for the RGB strip (bits).
pub const RGB_PWM_RESOLUTION_BITS: u32 = 8;
/// LEDC frequency for the RGB strip (5 kHz, flicker-free).
pub const RGB_PWM_FREQ_HZ: u32 = 5_000;
