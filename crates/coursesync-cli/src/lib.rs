//! coursesync CLI - command-line entry point for the catalog mirror.
//!
//! Parses flags, merges them with the config file and wires the API client, the
//! PostgreSQL repository and the sync orchestrator together.

pub mod config;

pub use config::{Command, Config, Settings};
