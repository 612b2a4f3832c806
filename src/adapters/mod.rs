//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements   | Connects to                   |
//! |---------------|--------------|-------------------------------|
//! | `hardware`    | SensorPort   | MS5607 altimeter over SPI     |
//! |               | ActuatorPort | HV gate GPIO                  |
//! | `log_sink`    | EventSink    | Serial status log             |
//! | `record_log`  | RecordSink   | CSV output file               |
//! | `config_file` | ConfigPort   | JSON override file + preset   |
//! | `time`        | -            | ESP32 high-resolution timer   |

pub mod config_file;
pub mod hardware;
pub mod log_sink;
pub mod record_log;
pub mod time;
