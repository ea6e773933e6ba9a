//! `resolve` and `task` commands: print resolved configuration.

use crate::config::ResolvedConfig;
use crate::format::{OutputFormat, render_tree};
use anyhow::Result;

/// Render the whole resolved tree.
pub fn render_resolved(config: &ResolvedConfig, format: OutputFormat) -> Result<String> {
    render_tree(config.tree(), format)
}

/// Render one task's sub-tree.
pub fn render_task(config: &ResolvedConfig, task: &str, format: OutputFormat) -> Result<String> {
    let cfg = config.get_task_config(task)?;
    render_tree(&cfg.to_tree(), format)
}
