//! Session configuration for the engine

pub mod config;

pub use config::{SessionConfig, SessionConfigBuilder, SessionFlags};
