//! Core types shared across the huella ingestion pipeline.
//!
//! This crate holds the configuration surface, the unified error enum and
//! the data model: classification verdicts, moderation outcomes and the
//! sighting record handed to the persistence layer.

pub mod config;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::AppError;
