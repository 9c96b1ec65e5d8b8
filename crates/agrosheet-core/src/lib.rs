//! Agrosheet Core - Domain models, errors, and configuration
//!
//! This crate holds the worksheet and CRS models shared by the geometry and
//! worksheet crates, together with the layered configuration.

pub mod config;
pub mod error;
pub mod models;

pub use error::{AgroError, Result};
