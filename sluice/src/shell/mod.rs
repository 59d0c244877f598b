//! # Shell Module
//!
//! Entry point and CLI logic for the `sluice` binary.

pub mod cli;

pub use cli::{Cli, EntryMode, exit_code, run, run_with};
