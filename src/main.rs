//! host-provision
//!
//! Resolves layered provisioning configuration and drives package tasks
//! against target hosts.

use anyhow::Result;
use clap::Parser;
use host_provision::cli::plan::run_plan;
use host_provision::cli::show::{render_resolved, render_task};
use host_provision::cli::{Cli, Command};
use host_provision::config::{ConfigLoader, ConfigPaths, ENV_CONFIG_PATH, RunDocument};
use host_provision::context::{HostTarget, RuntimeContext};
use host_provision::distro::Distribution;
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    // Everything below up to the context is pure config resolution; no host
    // is contacted until it succeeds.
    let paths = match &cli.config_dir {
        Some(dir) => ConfigPaths::with_dir(dir),
        None => ConfigPaths::discover(),
    };
    debug!(config_dir = %paths.config_dir.display(), "Using config directory");

    let run_path = cli
        .config_path
        .clone()
        .or_else(|| std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from));
    let run_document = run_path.map(RunDocument::load).transpose()?;

    let loader = ConfigLoader::for_run(paths, run_document.as_ref())?;
    let selection = loader.selection().clone();

    let hosts = HostTarget::parse_list(
        &cli.hosts,
        &cli.hosts_connection_user,
        cli.ssh_port,
        cli.ssh_identity_file.clone(),
    );
    let ctx = RuntimeContext::new(
        loader.into_resolved(),
        Distribution::for_distro(selection.distro),
    )
    .with_hosts(hosts)
    .with_requests_warnings_disabled(cli.requests_disable_warnings);
    info!(
        distro = %selection.distro,
        version = %selection.version,
        window_manager = ?selection.window_manager,
        hosts = ctx.hosts().len(),
        "Runtime context ready"
    );

    let output = match &cli.command {
        Command::Resolve { format } => render_resolved(ctx.config(), *format)?,
        Command::Task { name, format } => render_task(ctx.config(), name, *format)?,
        Command::Plan(args) => run_plan(&ctx, args)?,
    };
    print!("{}", output);

    Ok(())
}
