//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements               | Connects to              |
//! |-----------------|--------------------------|--------------------------|
//! | `clock`         | Clock                    | ESP32 system timer       |
//! | `config_file`   | ConfigPort               | config.json on SPIFFS    |
//! | `hardware`      | DisplayPort, TemperaturePort, PressurePort, ButtonPort | LCD/OLED, DS18B20, ADC1, GPIO |
//! | `log_sink`      | EventSink                | Serial log output        |
//! | `tcp_transport` | HttpTransport            | lwIP TCP sockets         |
//! | `wifi`          | WifiRadio                | ESP-IDF WiFi STA         |

pub mod clock;
pub mod config_file;
pub mod hardware;
pub mod log_sink;
pub mod tcp_transport;
pub mod wifi;
