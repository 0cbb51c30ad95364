//! # iremote-cli: console client
//!
//! Connects to an iRemote controller, prints the downloaded snapshot,
//! then polls and prints every change until interrupted, reconnecting
//! when the controller drops the session or changes its configuration.

pub mod config;
pub mod report;
