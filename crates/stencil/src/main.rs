//! Stencil Scout command-line interface
//!
//! - `list`: find draw.io documents in a directory
//! - `scan`: match template patterns against a document or a directory of them
//! - `templates`: validate a template file
//! - `config`: show the resolved scan policy

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use stencil_logging::{init_logging, LogConfig};

mod cli;

#[derive(Parser, Debug)]
#[command(name = "stencil", version, about = "Find stencil shapes in draw.io diagrams and extract their fields")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List draw.io documents in a directory
    List {
        /// Directory to search
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan a document, or every document in a directory
    Scan {
        /// A .drawio file or a directory containing them
        path: PathBuf,

        /// Template file (YAML or JSON)
        #[arg(short, long, env = "STENCIL_TEMPLATES")]
        templates: Option<PathBuf>,

        /// Scan policy file (TOML)
        #[arg(short, long, env = "STENCIL_CONFIG")]
        config: Option<PathBuf>,

        /// Separator between AND-terms in patterns (':' or ';')
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Consider every cell, not only stencil shapes
        #[arg(long)]
        all_cells: bool,

        /// Match patterns against all attributes instead of style and value
        #[arg(long)]
        attributes: bool,

        /// Descend into subdirectories when PATH is a directory
        #[arg(short, long)]
        recursive: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Print match counts only
        #[arg(short, long)]
        quiet: bool,
    },

    /// Load and validate a template file
    Templates {
        /// Template file (YAML or JSON)
        #[arg(short, long, env = "STENCIL_TEMPLATES")]
        templates: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved scan policy
    Config {
        /// Scan policy file (TOML)
        #[arg(short, long, env = "STENCIL_CONFIG")]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::List { dir, recursive, json } => {
            cli::list::run(cli::list::ListArgs { dir, recursive, json })
        }
        Commands::Scan {
            path,
            templates,
            config,
            delimiter,
            all_cells,
            attributes,
            recursive,
            json,
            quiet,
        } => cli::scan::run(cli::scan::ScanArgs {
            path,
            templates,
            config,
            delimiter,
            all_cells,
            attributes,
            recursive,
            json,
            quiet,
        }),
        Commands::Templates { templates, json } => {
            cli::templates::run(cli::templates::TemplatesArgs { templates, json })
        }
        Commands::Config { config, json } => {
            cli::config::run(cli::config::ConfigArgs { config, json })
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(LogConfig {
        app_name: "stencil",
        verbose: cli.verbose,
    }) {
        eprintln!("Warning: {:#}", err);
    }

    match run_command(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", err);
            ExitCode::from(1)
        }
    }
}
