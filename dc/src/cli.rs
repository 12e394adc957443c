//! CLI argument parsing for decomposer

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

/// Decompose a work item into a draft hierarchy of child items
#[derive(Parser, Debug)]
#[command(name = "dc", author, version, about = "Draft work item hierarchy tool", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// YAML type rules file (overrides config)
    #[arg(short, long, global = true)]
    pub types: Option<PathBuf>,

    /// Type of the item being decomposed (overrides config)
    #[arg(short, long = "root-type", global = true)]
    pub root_type: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse an outline file and print the resulting tree
    Parse {
        /// Outline file, one `Type: Title` per line, `-` per nesting level
        #[arg(required = true)]
        file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List configured work item types
    Types,

    /// Print the parent-first submission plan for an outline as JSON
    Plan {
        #[arg(required = true)]
        file: PathBuf,

        /// Items per batch
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Show which types may be placed under a type (or at the root)
    ChildTypes {
        #[arg(value_name = "TYPE")]
        item_type: Option<String>,
    },

    /// List keyboard shortcuts (stock bindings plus configured ones)
    Keys,
}

/// Output format for parse results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format '{}'. Use text or json", s)),
        }
    }
}
