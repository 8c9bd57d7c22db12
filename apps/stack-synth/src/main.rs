//! stack-synth - emits the handler and route graph of one backend stack.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use api_surface::{HttpVerb, RouteManifest};
use clap::{Parser, Subcommand};
use stack_synth::{StackConfig, SynthesizedStack, synthesize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "stack-synth")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize the descriptor set and print or write it as JSON
    Synth {
        /// Path to the YAML configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Write the descriptor set here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the standard route manifest as JSON
    Manifest,

    /// Report which handler and authorization serve a request
    Explain {
        /// Path to the YAML configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// HTTP verb (POST, PUT, GET, DELETE)
        #[arg(long)]
        method: HttpVerb,

        /// Request path, e.g. `/v1/ui/admin`
        #[arg(long)]
        path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Synth { config, out } => {
            let stack = synthesize_from(&config)?;
            let json = stack
                .to_json()
                .context("failed to serialize the descriptor set")?;
            match out {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Commands::Manifest => {
            let json = serde_json::to_string_pretty(&RouteManifest::standard())
                .context("failed to serialize the standard manifest")?;
            println!("{json}");
        }
        Commands::Explain {
            config,
            method,
            path,
        } => {
            let stack = synthesize_from(&config)?;
            let policy = stack.route_policy()?;
            let Some(route) = policy.resolve(method, &path) else {
                anyhow::bail!("no route serves {method} {path}");
            };
            let via = route
                .authorizer
                .as_deref()
                .map_or_else(String::new, |a| format!(" via {a}"));
            println!(
                "{method} {path} -> {} ({}{via})",
                route.handler,
                route.authorization.as_str()
            );
        }
    }
    Ok(())
}

fn synthesize_from(path: &Path) -> Result<SynthesizedStack> {
    let config = StackConfig::load(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    let manifest = config.effective_manifest();
    Ok(synthesize(config, &manifest)?)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
