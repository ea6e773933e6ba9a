//! Output formatting for resolved configuration trees.

use crate::config::ConfigTree;
use anyhow::Result;
use clap::ValueEnum;

/// Output format for printed configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Render a tree in the requested format.
pub fn render_tree(tree: &ConfigTree, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(tree)?,
        OutputFormat::Json => {
            let mut s = serde_json::to_string_pretty(tree)?;
            s.push('\n');
            s
        }
    };
    Ok(rendered)
}
