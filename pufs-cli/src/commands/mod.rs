//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration inspection (path, show)
//! - [`mount`] - Union mount over several roots
//! - [`passthrough`] - Read/write mount of a single root

pub mod common;
pub mod config;
pub mod mount;
pub mod passthrough;
