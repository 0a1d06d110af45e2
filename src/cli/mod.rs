//! CLI module for azaan.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `client`: IPC client for daemon communication
//! - `display`: Output formatting and display logic

pub mod client;
pub mod commands;
pub mod display;

pub use client::{IpcClient, WatchStream};
pub use commands::{
    Cli, Commands, DateArg, NextArgs, PermissionAction, ScheduleArgs, SetTimesArgs, TimeArgs,
    TimesCommand,
};
pub use display::Display;
