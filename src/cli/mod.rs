//! CLI command definitions for host-provision
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod plan;
pub mod show;

use crate::context::DEFAULT_SSH_PORT;
use crate::format::OutputFormat;
use clap::{Parser, Subcommand};
use plan::PlanArgs;
use std::path::PathBuf;

/// Provision hosts from layered YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding common/ and distros/ (overrides discovery)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Path to the per-run document (distro selection and task overrides)
    #[arg(short = 'c', long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Comma-separated list of target hosts
    #[arg(long, default_value = "localhost", global = true)]
    pub hosts: String,

    /// User to connect to hosts as
    #[arg(short = 'u', long, default_value = "root", global = true)]
    pub hosts_connection_user: String,

    /// SSH port on the target hosts
    #[arg(long, default_value_t = DEFAULT_SSH_PORT, global = true)]
    pub ssh_port: u16,

    /// SSH identity file
    #[arg(long, global = true)]
    pub ssh_identity_file: Option<PathBuf>,

    /// Disable TLS verification warnings for artifact downloads
    #[arg(short = 'r', long, global = true)]
    pub requests_disable_warnings: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the fully resolved configuration
    Resolve {
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },

    /// Print the resolved configuration of one task
    Task {
        /// Task name, e.g. install-docker
        name: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },

    /// Show the commands a package task would run on each host
    Plan(PlanArgs),
}
