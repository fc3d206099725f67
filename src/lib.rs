//! # Flight Log
//!
//! Binary telemetry logging in the ArduPlane dataflash format.
//!
//! Every record is a three byte header (`0xA3 0x95 id`) followed by packed
//! little-endian fields whose layout comes from a schema catalogue. Logs
//! begin with self-describing format records, so any log can be replayed
//! without the code that wrote it.
//!
//! ## Main Components
//!
//! * `Catalogue`: validated set of message schemas, looked up by id
//! * `CategoryMask`: runtime switches deciding which optional records are kept
//! * `Logger`: gates, encodes and writes records to a `BlockWriter`
//! * `Replay`: iterator decoding a byte stream back into records, resyncing
//!   on garbage and reporting truncation
//! * `plane`: the built-in ArduPlane message set
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use flight_log::plane::{plane_catalogue, Startup};
//! use flight_log::{CategoryMask, Logger, MemoryLog, Replay, ReplayEvent};
//!
//! let catalogue = plane_catalogue().unwrap();
//! let log = MemoryLog::new();
//! let mask = Arc::new(CategoryMask::plane(0));
//! let mut logger = Logger::new(catalogue, mask, log.clone());
//!
//! logger.start_new_log().unwrap();
//! logger
//!     .write_message(&Startup { time_us: 0, startup_type: 0, command_total: 3 })
//!     .unwrap();
//!
//! let bytes = log.snapshot();
//! let strt = Replay::new(catalogue, &bytes)
//!     .filter_map(|event| match event {
//!         ReplayEvent::Decoded(record) if record.name() == "STRT" => Some(record.to_string()),
//!         _ => None,
//!     })
//!     .next();
//! assert_eq!(strt.as_deref(), Some("STRT { TimeUS: 0, SType: 0, CTot: 3 }"));
//! ```

pub mod catalogue;
pub mod category;
pub mod clock;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod loggable;
pub mod logger;
pub mod message;
pub mod plane;
pub mod schema;
pub mod type_code;

pub use catalogue::Catalogue;
pub use category::{Category, CategoryMask, CategoryTable, PLANE_CATEGORIES};
pub use clock::{ManualClock, MonotonicClock, TimeSource};
pub use config::LogConfig;
pub use decoder::{
    replay_into, Dispatcher, Record, RecordSink, Replay, ReplayEvent, ReplaySummary, Termination,
};
pub use encoder::{encode, encode_into};
pub use error::{CategoryError, ConfigError, EncodeError, LogError, SchemaError};
pub use loggable::LogField;
pub use logger::{BlockWriter, Logger, LoggerStats, MemoryLog, StreamWriter};
pub use message::Message;
pub use schema::SchemaEntry;
pub use type_code::{FieldValue, TypeCode};
