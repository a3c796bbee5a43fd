use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

use richflow_cli::commands::{self, SortOptions};
use richflow_cli::config::ConfigManager;
use richflow_cli::error::exit_code;
use richflow_cli::output::{OutputFormat, Renderer};

#[derive(Parser)]
#[command(name = "rflow")]
#[command(author, version, about = "Lazy pipelines over lines of text files", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Read the input again for every pass instead of replaying the first one
    #[arg(long, global = true)]
    no_cache: bool,

    /// Output format (defaults to output.default_format from the configuration)
    #[arg(short, long, value_enum, global = true)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count lines across all files
    Count {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Ignore blank lines
        #[arg(long)]
        non_empty: bool,
    },

    /// Print the first lines
    Head {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Number of lines to print
        #[arg(short = 'n', long, default_value_t = 10)]
        lines: usize,
    },

    /// Sort lines
    Sort {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Sort in descending order
        #[arg(long)]
        desc: bool,

        /// Compare lines as numbers; non-numeric lines sort last
        #[arg(long)]
        numeric: bool,

        /// Drop adjacent duplicates after sorting
        #[arg(long)]
        unique: bool,
    },

    /// Count, sum, min, max and average of the numeric lines
    Stats {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Split each file into windows of consecutive lines
    Windows {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Lines per window
        #[arg(short, long, default_value_t = 2)]
        size: usize,

        /// Close a window after a line containing this text instead of by size
        #[arg(long, value_name = "PATTERN")]
        break_on: Option<String>,
    },

    /// Combine the files line by line into rows
    Interleave {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Rows per window
        #[arg(short, long, default_value_t = 1)]
        size: usize,

        /// Number of files contributing to each row (defaults to all)
        #[arg(long)]
        span: Option<usize>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the configuration file location
    Path,

    /// List all configuration values
    List,

    /// Get a configuration value
    Get {
        /// Configuration key (e.g., flow.max_padding)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., output.delimiter)
        key: String,

        /// Value to set
        value: String,
    },
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("richflow_core", log::LevelFilter::Debug)
            .filter_module("richflow_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    if let Err(e) = run(cli) {
        eprintln!("{}", format!("Error: {e:#}").red());
        std::process::exit(exit_code(&e).code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let manager = ConfigManager::new();
    let mut config = manager.load()?;
    config.apply_cli_overrides(cli.no_cache);

    if !config.output.color_enabled {
        colored::control::set_override(false);
    }

    let format = match cli.format {
        Some(format) => format,
        None => OutputFormat::from_string(&config.output.default_format)?,
    };
    let renderer = Renderer::new(format, &config.output);

    let rendered = match cli.command {
        Commands::Count { files, non_empty } => {
            let root = commands::open_root(&files, &config.flow)?;
            renderer.count(commands::count(&root, non_empty))?
        }
        Commands::Head { files, lines } => {
            let root = commands::open_root(&files, &config.flow)?;
            renderer.lines(&commands::head(&root, lines)?)?
        }
        Commands::Sort {
            files,
            desc,
            numeric,
            unique,
        } => {
            let root = commands::open_root(&files, &config.flow)?;
            let options = SortOptions {
                descending: desc,
                numeric,
                unique,
            };
            renderer.lines(&commands::sort(&root, options))?
        }
        Commands::Stats { files } => {
            let root = commands::open_root(&files, &config.flow)?;
            let (summary, skipped) = commands::stats(&root);
            renderer.summary(&summary, skipped)?
        }
        Commands::Windows {
            files,
            size,
            break_on,
        } => {
            let root = commands::open_root(&files, &config.flow)?;
            renderer.blocks(&commands::windows(&root, size, break_on)?)?
        }
        Commands::Interleave { files, size, span } => {
            let root = commands::open_root(&files, &config.flow)?;
            renderer.rows(&commands::interleave(&root, size, span)?)?
        }
        Commands::Config { command } => return config_command(manager, command),
    };

    if !rendered.is_empty() {
        println!("{rendered}");
    }
    Ok(())
}

fn config_command(mut manager: ConfigManager, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Path => {
            println!("{}", manager.get_config_path().display());
        }
        ConfigCommand::Get { key } => {
            println!("{}", manager.get(&key)?);
        }
        ConfigCommand::Set { key, value } => {
            manager
                .set(&key, &value)
                .with_context(|| format!("Failed to set {key}"))?;
            eprintln!("{}", format!("Set {key} = {value}").green());
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => list_config(&manager)?,
    }
    Ok(())
}

fn list_config(manager: &ConfigManager) -> Result<()> {
    let items = manager.list()?;

    eprintln!("{}", "Configuration:".bold().blue());
    eprintln!("Config file: {}", manager.get_config_path().display());
    eprintln!();

    let mut sections: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    for (key, value) in items {
        let (section, name) = key.split_once('.').unwrap_or(("general", key.as_str()));
        sections
            .entry(section.to_string())
            .or_default()
            .push((name.to_string(), value));
    }

    for (section, items) in sections {
        println!("[{}]", section.yellow());
        for (key, value) in items {
            println!("  {} = {:?}", key.cyan(), value);
        }
        println!();
    }
    Ok(())
}
