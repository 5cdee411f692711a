//! Shared utilities for the research workspace
//!
//! This crate provides logging setup and small helpers for reading
//! configuration from the environment.

pub mod env;
pub mod logging;

pub use env::{EnvError, env_duration_secs, env_or, env_string};
pub use logging::{LogFormat, init_tracing};
