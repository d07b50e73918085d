//! CLI module for the pixelift library
//!
//! This module is only available when the "cli" feature is enabled.

#[path = "main.rs"]
mod main_impl;

pub use main_impl::{main, Cli, CliDenoise, CliFormat, CliPrecision};
