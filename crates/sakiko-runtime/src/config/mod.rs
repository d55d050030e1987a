//! Configuration module for the Sakiko runtime.
//!
//! Layered figment-based loading plus the schema and its validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config};
pub use schema::{
    BusConfig, FileOutputConfig, LogFormat, LogOutput, LoggingConfig, Rotation, SakikoConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
