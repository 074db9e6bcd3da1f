//! CLI command handlers

pub mod commands;

pub use commands::{init, inspect, run};
