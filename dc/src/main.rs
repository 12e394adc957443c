//! dc - draft work item hierarchy tool
//!
//! CLI entry point for parsing outlines and inspecting type rules.

use std::fs;
use std::path::Path;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use decomposer::cli::{Cli, Command, OutputFormat};
use decomposer::config::Config;
use decomposer::domain::{TypeName, WorkItemNode};
use decomposer::hierarchy::HierarchyManager;
use decomposer::parser::ParseResult;
use decomposer::rules::TypeRules;
use decomposer::shortcuts::ShortcutDispatcher;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    // stdout carries command output, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    debug!(?level, "setup_logging: complete");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(types) = cli.types {
        config.types_file = Some(types);
    }
    if let Some(root_type) = cli.root_type {
        config.root_type = Some(root_type);
    }

    let rules = config.rules().context("Failed to load type rules")?;
    let root_type = config.root_type(&rules)?;
    info!(types = rules.type_names().len(), root_type = ?root_type, "dc loaded type rules");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Parse { file, format } => cmd_parse(&config, rules, root_type, &file, format),
        Command::Types => cmd_types(&rules),
        Command::Plan { file, batch_size } => cmd_plan(&config, rules, root_type, &file, batch_size),
        Command::ChildTypes { item_type } => cmd_child_types(&config, rules, root_type, item_type.as_deref()),
        Command::Keys => cmd_keys(&config),
    }
}

/// Parse a file into a fresh manager, so flags are computed
fn load_outline(config: &Config, rules: TypeRules, root_type: Option<TypeName>, file: &Path) -> Result<(HierarchyManager, ParseResult)> {
    let text = fs::read_to_string(file).context(format!("Failed to read outline {}", file.display()))?;
    let mut manager = HierarchyManager::new(rules, root_type, config.path_context());
    let result = manager.merge_parsed(&text);
    Ok((manager, result))
}

fn cmd_parse(config: &Config, rules: TypeRules, root_type: Option<TypeName>, file: &Path, format: OutputFormat) -> Result<()> {
    debug!(file = %file.display(), ?format, "cmd_parse: called");
    let (manager, mut result) = load_outline(config, rules, root_type, file)?;
    if result.success {
        result.nodes = manager.get_hierarchy();
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            for node in &result.nodes {
                print_node(manager.rules(), node, 0);
            }
            for warning in &result.warnings {
                println!("{} {}", "warning:".yellow(), warning);
            }
            for error in &result.errors {
                println!("{} {}", "error:".red(), error);
            }
            if result.success {
                println!("{} {} item(s)", "✓".green(), manager.get_hierarchy_count());
            }
        }
    }

    if !result.success {
        return Err(eyre!("Outline has {} error(s)", result.errors.len()));
    }
    Ok(())
}

fn cmd_types(rules: &TypeRules) -> Result<()> {
    debug!("cmd_types: called");
    for (name, definition) in rules.iter() {
        let children = match &definition.allowed_child_types {
            Some(children) if children.is_empty() => "(no children)".dimmed().to_string(),
            Some(children) => children.iter().map(TypeName::as_str).collect::<Vec<_>>().join(", "),
            None => format!("{} (fallback)", rules.fallback_type()).dimmed().to_string(),
        };
        println!("{} -> {}", paint_type(rules, name), children);
    }
    Ok(())
}

fn cmd_plan(
    config: &Config,
    rules: TypeRules,
    root_type: Option<TypeName>,
    file: &Path,
    batch_size: Option<usize>,
) -> Result<()> {
    debug!(file = %file.display(), ?batch_size, "cmd_plan: called");
    let (manager, result) = load_outline(config, rules, root_type, file)?;
    if !result.success {
        for error in &result.errors {
            eprintln!("{} {}", "error:".red(), error);
        }
        return Err(eyre!("Outline has {} error(s)", result.errors.len()));
    }

    let plan = manager.submission_plan();
    let output = match batch_size {
        Some(size) => {
            let batches: Vec<Vec<&str>> = plan
                .batches(size)
                .iter()
                .map(|batch| batch.iter().map(|item| item.id.as_str()).collect())
                .collect();
            serde_json::json!({ "items": plan.items, "batches": batches })
        }
        None => serde_json::to_value(&plan)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_child_types(config: &Config, rules: TypeRules, root_type: Option<TypeName>, item_type: Option<&str>) -> Result<()> {
    debug!(?item_type, "cmd_child_types: called");
    let manager = HierarchyManager::new(rules, root_type, config.path_context());
    let types = match item_type {
        Some(raw) => {
            let resolved = manager
                .rules()
                .resolve_type_name(raw)
                .cloned()
                .ok_or_else(|| eyre!("Unknown type '{}'", raw))?;
            manager.rules().child_types_for(&resolved)
        }
        None => manager.get_possible_child_types(None),
    };
    for t in &types {
        println!("{}", paint_type(manager.rules(), t));
    }
    Ok(())
}

fn cmd_keys(config: &Config) -> Result<()> {
    debug!(contexts = config.shortcuts.len(), "cmd_keys: called");
    let dispatcher = ShortcutDispatcher::from_bindings(&config.shortcuts);
    let mut last_context = None;
    for (context, key, command) in dispatcher.bindings() {
        if last_context != Some(context) {
            println!("{}", context.bold());
            last_context = Some(context);
        }
        println!("  {:<12} {}", key, command.to_string().cyan());
    }
    Ok(())
}

fn print_node(rules: &TypeRules, node: &WorkItemNode, depth: usize) {
    let mut markers = String::new();
    if node.can_promote {
        markers.push('↑');
    }
    if node.can_demote {
        markers.push('↓');
    }
    println!(
        "{}{}: {} {}",
        "  ".repeat(depth),
        paint_type(rules, &node.item_type),
        node.title,
        markers.dimmed()
    );
    for child in &node.children {
        print_node(rules, child, depth + 1);
    }
}

/// Color a type name with its configured display color
fn paint_type(rules: &TypeRules, item_type: &TypeName) -> ColoredString {
    let rgb = rules
        .definition(item_type)
        .and_then(|def| def.display_color.as_deref())
        .and_then(parse_hex_color);
    match rgb {
        Some((r, g, b)) => item_type.as_str().truecolor(r, g, b).bold(),
        None => item_type.as_str().bold(),
    }
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
