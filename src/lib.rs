//! Host provisioning library
//!
//! This module exports the configuration engine, the distribution capability
//! layer and the task runner for testing and integration.

pub mod cli;
pub mod config;
pub mod context;
pub mod distro;
pub mod enums;
pub mod error;
pub mod format;
pub mod remote;
pub mod tasks;
pub mod template;
