//! TankNode Firmware · Main Entry Point
//!
//! Hexagonal architecture around a single 1 Hz control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  NodeBoard          LogEventSink   JsonFileConfig  SystemClock │
//! │  (LCD/OLED, DS18B20, (EventSink)   (ConfigPort)    (Clock)     │
//! │   ADC1, button)                                                │
//! │  EspWifiRadio       TcpTransport                               │
//! │  (WifiRadio)        (HttpTransport)                            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              ControlLoop (pure logic)                  │    │
//! │  │  ConnectivityMonitor · Reporter · ReportCycle          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Flow ISR → PulseAccumulator (static, lock-free)               │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::{Ets, FreeRtos};
use esp_idf_svc::hal::gpio::{PinDriver, Pull};
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;

use tanknode::adapters::clock::SystemClock;
use tanknode::adapters::config_file::{self, JsonFileConfig};
use tanknode::adapters::hardware::{Adc1Input, NodeBoard};
use tanknode::adapters::log_sink::LogEventSink;
use tanknode::adapters::tcp_transport::TcpTransport;
use tanknode::adapters::wifi::EspWifiRadio;
use tanknode::app::ControlLoop;
use tanknode::drivers::button::Button;
use tanknode::drivers::ds18b20::Ds18b20;
use tanknode::drivers::hw_init;
use tanknode::drivers::onewire::OneWire;
use tanknode::error::Error;
use tanknode::net::{ConnectivityMonitor, Reporter};
use tanknode::pins;
use tanknode::sensors::flow::FLOW_METER;
use tanknode::sensors::pressure::PressureSensor;
use tanknode::sensors::temperature::Thermometer;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  TankNode v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from the data partition ────────────────
    let config = config_file::load_boot_config(&JsonFileConfig::on_flash())?;
    info!(
        "Config: host='{}' ssid='{}' interval={}s",
        config.hostname, config.ssid, config.report_interval_secs
    );

    // ── 3. Raw peripherals: ADC + flow ISR ────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Without the flow input there is nothing worth reporting.
        error!("{} ({}), halting", Error::from(e), e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    if let Err(e) = hw_init::init_isr_service() {
        error!("{} ({}), flow will read zero", Error::from(e), e);
    }

    // ── 4. Typed peripherals ──────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio4,
        peripherals.pins.gpio5,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
    )?;

    #[cfg(not(feature = "oled"))]
    let display = tanknode::drivers::lcd::CharLcd::new(i2c, Ets, pins::LCD_I2C_ADDR);

    #[cfg(feature = "oled")]
    let display = {
        let mut reset = PinDriver::output(peripherals.pins.gpio16)?;
        tanknode::drivers::oled::pulse_reset(&mut reset, &mut Ets);
        // Keep the reset line driven high for the life of the program.
        core::mem::forget(reset);
        tanknode::drivers::oled::OledDisplay::new(i2c, pins::OLED_I2C_ADDR)
    };

    let onewire_pin = PinDriver::input_output_od(peripherals.pins.gpio13)?;
    let probe = Ds18b20::new(OneWire::new(onewire_pin, Ets), config.sensor_address);
    let thermometer = Thermometer::with_settle_ms(probe, FreeRtos, config.conversion_settle_ms);

    let pressure = PressureSensor::new(Adc1Input::new(
        pins::PRESSURE_ADC_CHANNEL,
        pins::PRESSURE_DIVIDER_RATIO,
    ));

    let mut button_pin = PinDriver::input(peripherals.pins.gpio0)?;
    button_pin.set_pull(Pull::Up)?;
    let button = Button::active_low(button_pin);

    let mut board = NodeBoard::new(display, thermometer, pressure, button);

    // ── 5. Networking ─────────────────────────────────────────
    let wifi = EspWifi::new(peripherals.modem, sysloop, Some(nvs))?;
    let radio = EspWifiRadio::new(wifi, &config.hostname).map_err(Error::from)?;
    let monitor = ConnectivityMonitor::new(
        radio,
        config.scan_interval_secs,
        config.connect_timeout_secs,
    );
    let reporter = Reporter::new(TcpTransport::new(config.socket_timeout_secs));

    // ── 6. Control loop ───────────────────────────────────────
    let mut clock = SystemClock::new();
    let mut log_sink = LogEventSink::new();
    let mut control = ControlLoop::new(config, &FLOW_METER, monitor, reporter);

    control.start(&mut board, &mut clock, &mut log_sink);
    if !control.monitor().is_connected() {
        warn!("Boot: starting offline, the monitor keeps searching");
    }
    info!("System ready. Entering control loop.");

    control.run(&mut board, &mut clock, &mut log_sink)
}
