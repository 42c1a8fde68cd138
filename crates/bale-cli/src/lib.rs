//! Command-line front end for the bale bundler.
//!
//! The binary is a thin layer over [`bale_bundler`]: it layers configuration
//! from `bale.toml`, `BALE_` environment variables and flags, runs one-shot
//! builds, and drives dev sessions from a file watcher.

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;
