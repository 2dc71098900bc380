//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                  |
//! |----------------|--------------------|------------------------------|
//! | `config_file`  | ConfigPort         | JSON file on disk            |
//! | `email`        | Notifier           | SMTP relay (STARTTLS)        |
//! | `log_sink`     | EventSink          | `log` facade / stderr        |
//! | `mqtt`         | (feed producer)    | Weather station MQTT broker  |
//! | `owm`          | WeatherGateway     | OpenWeatherMap REST          |
//! | `tessie`       | VehicleGateway     | Tessie REST                  |
//! | `time`         | Clock              | System wall clock            |

pub mod config_file;
pub mod email;
pub mod log_sink;
pub mod mqtt;
pub mod owm;
pub mod tessie;
pub mod time;
