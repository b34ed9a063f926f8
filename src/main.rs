//! Animatron firmware entry point
//!
//! Boots the board, loads the config, wires the adapters to the three
//! periodic tasks and hands control to them.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  UartTransport   BoardActuators   BoardIndicators  LimitSwitch │
//! │  (Transport)     (ActuatorPort)   (IndicatorPort)  (LimitInput)│
//! │  LogEventSink    NvsConfigStore   MonotonicClock               │
//! │  (EventSink)     (ConfigPort)     (Clock)                      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌──────────┐   ┌───────────┐   ┌─────────────┐                │
//! │  │ comm     │   │ control   │   │ animation   │                │
//! │  └────┬─────┘   └─────┬─────┘   └──────┬──────┘                │
//! │       └───────── StateStore (bounded lock) ─┘                  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver, Pull};
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::{FromValueType, Hertz};

use animatron::adapters::board::{BoardActuators, BoardIndicators};
use animatron::adapters::log_sink::LogEventSink;
use animatron::adapters::nvs::NvsConfigStore;
use animatron::adapters::time::MonotonicClock;
use animatron::adapters::uart::UartTransport;
use animatron::app::animation::AnimationTask;
use animatron::app::comm::CommTask;
use animatron::app::control::ControlTask;
use animatron::app::events::AppEvent;
use animatron::app::ports::{Clock, ConfigPort, EventSink};
use animatron::config::SystemConfig;
use animatron::drivers::rgb::RgbLed;
use animatron::drivers::servo::SERVO_FREQ_HZ;
use animatron::drivers::task_pin::{Core, TaskPlacement};
use animatron::pins;
use animatron::scheduler::TaskSet;
use animatron::sensors::limit_switch::LimitSwitches;
use animatron::state::{SharedState, StateStore};

// ── Task placement ────────────────────────────────────────────

const CONTROL_TASK: TaskPlacement = TaskPlacement {
    core: Core::App,
    priority: 10,
    stack_kb: 8,
    name: "control\0",
};

const COMM_TASK: TaskPlacement = TaskPlacement {
    core: Core::Pro,
    priority: 8,
    stack_kb: 8,
    name: "comm\0",
};

const ANIMATION_TASK: TaskPlacement = TaskPlacement {
    core: Core::Pro,
    priority: 5,
    stack_kb: 6,
    name: "animation\0",
};

fn load_config() -> animatron::error::Result<SystemConfig> {
    let nvs = NvsConfigStore::new()?;
    Ok(nvs.load()?)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Animatron v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let clock = MonotonicClock::new();

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = load_config().unwrap_or_else(|e| {
        warn!("{}, running with defaults", e);
        SystemConfig::default()
    });
    info!("Config: {}", serde_json::to_string(&config)?);

    // ── 3. Peripherals ────────────────────────────────────────
    let p = Peripherals::take().context("peripherals already taken")?;

    // SAFETY: every GPIO number comes from `pins` and is claimed exactly
    // once below; none of them is touched through `p.pins`.
    let gpio = |n: i32| unsafe { AnyOutputPin::new(n) };
    let io = |n: i32| unsafe { AnyIOPin::new(n) };

    let servo_timer = LedcTimerDriver::new(
        p.ledc.timer0,
        &TimerConfig::new()
            .frequency(SERVO_FREQ_HZ.Hz().into())
            .resolution(Resolution::Bits14),
    )
    .context("servo LEDC timer")?;
    let rgb_timer = LedcTimerDriver::new(
        p.ledc.timer1,
        &TimerConfig::new()
            .frequency(pins::RGB_PWM_FREQ_HZ.Hz().into())
            .resolution(Resolution::Bits8),
    )
    .context("RGB LEDC timer")?;

    // ServoId order: pan, tilt, aux, valve.
    let servos = [
        LedcDriver::new(p.ledc.channel0, &servo_timer, gpio(pins::SERVO_PAN_GPIO))?,
        LedcDriver::new(p.ledc.channel1, &servo_timer, gpio(pins::SERVO_TILT_GPIO))?,
        LedcDriver::new(p.ledc.channel2, &servo_timer, gpio(pins::SERVO_AUX_GPIO))?,
        LedcDriver::new(p.ledc.channel3, &servo_timer, gpio(pins::SERVO_VALVE_GPIO))?,
    ];
    let strip = RgbLed::new(
        LedcDriver::new(p.ledc.channel4, &rgb_timer, gpio(pins::RGB_R_GPIO))?,
        LedcDriver::new(p.ledc.channel5, &rgb_timer, gpio(pins::RGB_G_GPIO))?,
        LedcDriver::new(p.ledc.channel6, &rgb_timer, gpio(pins::RGB_B_GPIO))?,
    );

    let light = PinDriver::output(gpio(pins::LIGHT_GPIO))?;
    let diagnostic_led = PinDriver::output(gpio(pins::DIAGNOSTIC_LED_GPIO))?;

    let mut limit_pos = PinDriver::input(io(pins::LIMIT_POSITIVE_GPIO))?;
    limit_pos.set_pull(Pull::Up)?;
    let mut limit_neg = PinDriver::input(io(pins::LIMIT_NEGATIVE_GPIO))?;
    limit_neg.set_pull(Pull::Up)?;

    let uart = UartDriver::new(
        p.uart2,
        gpio(pins::UART_TX_GPIO),
        io(pins::UART_RX_GPIO),
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(pins::UART_BAUD)),
    )
    .context("UART2")?;

    // ── 4. Shared state ───────────────────────────────────────
    let store = Arc::new(StateStore::new(
        SharedState::new(&config),
        Duration::from_millis(u64::from(config.lock_timeout_ms)),
    ));

    // ── 5. Task set ───────────────────────────────────────────
    let control = ControlTask::new(
        Arc::clone(&store),
        BoardActuators::new(servos, light, diagnostic_led),
        LimitSwitches::new(
            limit_pos,
            limit_neg,
            u64::from(config.limit_debounce_ms),
            clock.now_ms(),
        ),
        LogEventSink::new(),
        &config,
    );
    let comm = CommTask::new(
        Arc::clone(&store),
        UartTransport::new(uart),
        LogEventSink::new(),
        &config,
    );
    let animation = AnimationTask::new(
        Arc::clone(&store),
        BoardIndicators::new(strip),
        LogEventSink::new(),
        &config,
    );

    let mut tasks = TaskSet::new();
    tasks.spawn(CONTROL_TASK, control, clock)?;
    tasks.spawn(COMM_TASK, comm, clock)?;
    tasks.spawn(ANIMATION_TASK, animation, clock)?;

    LogEventSink::new().emit(&AppEvent::Started {
        version: env!("CARGO_PKG_VERSION"),
    });

    // The tasks never stop; this also keeps the LEDC timers above alive.
    tasks.join();
    Ok(())
}
