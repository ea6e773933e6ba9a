//! `plan` command: dry-run a package task against every host.

use crate::context::RuntimeContext;
use crate::remote::{CommandOutput, Recorded, RecordingExecutor};
use crate::tasks::run_package_task;
use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::fmt::Write;

/// Arguments for the plan command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Task to plan, e.g. install-docker
    pub task: String,

    /// Architecture reported by the simulated hosts
    #[arg(long, default_value = "amd64")]
    pub architecture: String,

    /// Release codename reported by the simulated hosts
    #[arg(long, default_value = "bookworm")]
    pub release: String,
}

/// Run the task against a recording executor per host and describe what it did.
///
/// Simulated hosts report the requested architecture and release, and find
/// the task's CA certificate in their bundle.
pub fn run_plan(ctx: &RuntimeContext, args: &PlanArgs) -> Result<String> {
    let cert_subject = ctx
        .get_task_config(&args.task)?
        .get("cert_validation")
        .and_then(Value::as_str)
        .map(|validation| format!("subject=CN = {}\n", validation));

    let mut out = String::new();
    for target in ctx.hosts() {
        let mut exec = RecordingExecutor::new(target.host.clone())
            .with_reply(
                "dpkg --print-architecture",
                CommandOutput::success(format!("{}\n", args.architecture)),
            )
            .with_reply(
                "lsb_release -cs",
                CommandOutput::success(format!("{}\n", args.release)),
            );
        if let Some(subject) = &cert_subject {
            exec = exec.with_reply("awk", CommandOutput::success(subject.clone()));
        }

        run_package_task(ctx, &exec, &args.task)
            .with_context(|| format!("planning task '{}' for {}", args.task, target.address()))?;

        writeln!(out, "# {} ({})", target.address(), args.task)?;
        for entry in exec.recorded() {
            match entry {
                Recorded::Command(cmd) => writeln!(out, "{}", cmd)?,
                Recorded::Upload { path, contents } => {
                    writeln!(out, "# upload {} ({} bytes)", path, contents.len())?
                }
            }
        }
    }
    Ok(out)
}
