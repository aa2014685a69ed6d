//! I/O helpers for action hosts.

pub mod config;
