//! wmiq - query a WMI repository from the command line
//!
//! Runs against a JSON repository fixture, or the built-in sample repository
//! when no fixture is configured. Settings come from `wmi.toml` (see
//! [`config`]), the environment and the global flags, in increasing order of
//! precedence.

use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wmi_core::repository::sample;
use wmi_core::{MemoryProvider, Repository, Service};

mod commands;
mod config;
mod output;

use config::ClientConfig;
use output::{Format, Output};

/// Environment variable holding the log filter
const LOG_ENV: &str = "WMI_LOG";

#[derive(Parser)]
#[command(name = "wmiq")]
#[command(about = "Query a WMI repository", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ./wmi.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Namespace to connect to
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Repository fixture (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    fixture: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a WQL query
    Query {
        /// Query text, e.g. "SELECT * FROM Win32_Process"
        wql: String,
    },

    /// List every instance of a class, subclasses included
    Instances {
        /// Class name
        class: String,
    },

    /// Show one object by path
    Get {
        /// Object path, e.g. Win32_Process.Handle="4"
        path: String,
    },

    /// List the methods of a class with their parameters
    Methods {
        /// Class name or object path
        path: String,
    },

    /// List child namespaces
    Namespaces {
        /// Descend into every child
        #[arg(short, long)]
        recursive: bool,
    },

    /// Invoke a method
    Call {
        /// Class name (static methods) or instance path
        path: String,
        /// Method name
        method: String,
        /// Input parameters
        #[arg(value_name = "NAME=VALUE")]
        args: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(namespace) = cli.namespace {
        config.namespace = namespace;
    }
    if let Some(fixture) = cli.fixture {
        config.fixture = Some(fixture);
    }
    init_logging(&config.log, cli.verbose);

    let repository = match &config.fixture {
        Some(path) => Repository::load_json(path)
            .with_context(|| format!("Failed to load fixture {}", path.display()))?,
        None => sample::repository(),
    };
    let service = Service::connect(Rc::new(MemoryProvider::new(repository)), &config.namespace)?;

    let format = if cli.json { Format::Json } else { Format::Text };
    let mut out = Output::new(format, io::stdout().lock());

    match cli.command {
        Commands::Query { wql } => commands::query::execute(&service, &wql, &mut out),
        Commands::Instances { class } => commands::instances::execute(&service, &class, &mut out),
        Commands::Get { path } => commands::get::execute(&service, &path, &mut out),
        Commands::Methods { path } => commands::methods::execute(&service, &path, &mut out),
        Commands::Namespaces { recursive } => {
            commands::namespaces::execute(&service, recursive, &mut out)
        }
        Commands::Call { path, method, args } => {
            commands::call::execute(&service, &path, &method, &args, &mut out)
        }
    }
}

/// `-v` flags win over `WMI_LOG`, which wins over the configured filter.
fn init_logging(configured: &str, verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(configured)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
