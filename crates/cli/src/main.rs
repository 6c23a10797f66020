//! apidispatch CLI
//!
//! Command-line interface for resolving, generating and invoking OpenAPI
//! operations as generic resource actions.

use anyhow::{Context, Result};
use apidispatch_common::ResolutionRules;
use apidispatch_generator::OperationEmitter;
use apidispatch_parser::{load_schema_index, OperationResolver, SchemaIndex};
use apidispatch_runtime::{
    resource_names, Dispatcher, InvokeRequest, RestCapability, RestConfig,
};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "apidispatch")]
#[command(version, about = "Resolve OpenAPI operations into generic resource actions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, default_value = "warn", env = "APIDISPATCH_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format
    #[arg(long, value_enum, env = "APIDISPATCH_LOG_FORMAT", global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the indexed operationIds of an API description
    Operations {
        /// Path to the OpenAPI document (JSON or YAML)
        #[arg(short, long)]
        spec: PathBuf,
    },

    /// Show how one operation resolves
    #[command(after_help = "EXAMPLES:\n  \
        apidispatch resolve --spec spec3.json PostCustomersCustomer\n  \
        apidispatch resolve --spec spec3.json --rules rules.yaml GetAccount")]
    Resolve {
        #[arg(short, long)]
        spec: PathBuf,

        /// Resolution rules YAML (built-in defaults if omitted)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// operationId to resolve
        operation_id: String,
    },

    /// Generate one Rust wrapper per operation
    Generate {
        #[arg(short, long)]
        spec: PathBuf,

        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "./generated")]
        output: PathBuf,
    },

    /// Invoke an operation against a REST backend
    #[command(after_help = "EXAMPLES:\n  \
        APIDISPATCH_API_KEY=sk_test_... apidispatch invoke \\\n    \
        --spec spec3.json \\\n    \
        --base-url https://api.example.com \\\n    \
        PostCustomersCustomer --params '{\"customer\":\"cus_1\",\"email\":\"a@b.com\"}'")]
    Invoke {
        #[arg(short, long)]
        spec: PathBuf,

        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Backend base URL, without the `/v1` prefix
        #[arg(long, env = "APIDISPATCH_BASE_URL")]
        base_url: String,

        /// Bearer token for the backend
        #[arg(long, env = "APIDISPATCH_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        operation_id: String,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Print the effective resolution rules as YAML
    Rules {
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_level, cli.log_format).context("Failed to set up logging")?;

    if cli.verbose {
        println!("{} Verbose mode enabled", "→".cyan());
    }

    match cli.command {
        Commands::Operations { spec } => operations_command(&spec, cli.verbose)?,
        Commands::Resolve {
            spec,
            rules,
            operation_id,
        } => resolve_command(&spec, rules.as_deref(), &operation_id)?,
        Commands::Generate {
            spec,
            rules,
            output,
        } => generate_command(&spec, rules.as_deref(), &output, cli.verbose)?,
        Commands::Invoke {
            spec,
            rules,
            base_url,
            api_key,
            operation_id,
            params,
        } => {
            let config = RestConfig::new(base_url).with_api_key(api_key);
            return invoke_command(&spec, rules.as_deref(), config, &operation_id, &params).await;
        }
        Commands::Rules { rules } => rules_command(rules.as_deref())?,
    }

    Ok(ExitCode::SUCCESS)
}

/// Initialize `tracing` with an env filter, writing to stderr
fn setup_tracing(level: &str, format: Option<LogFormat>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some(LogFormat::Json) => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?,
    }

    Ok(())
}

fn load_index(spec_path: &Path) -> Result<SchemaIndex> {
    load_schema_index(spec_path)
        .with_context(|| format!("Failed to load API description {}", spec_path.display()))
}

fn load_rules(rules_path: Option<&Path>) -> Result<ResolutionRules> {
    match rules_path {
        Some(path) => ResolutionRules::load(path)
            .with_context(|| format!("Failed to load resolution rules {}", path.display())),
        None => {
            debug!("Using built-in resolution rules");
            Ok(ResolutionRules::default())
        }
    }
}

fn operations_command(spec_path: &Path, verbose: bool) -> Result<()> {
    let index = load_index(spec_path)?;

    if verbose {
        for record in index.operations() {
            println!(
                "{}  {} {}",
                record.operation_id,
                record.verb.as_str().to_uppercase().yellow(),
                record.path
            );
        }
    } else {
        for operation_id in index.operation_ids() {
            println!("{}", operation_id);
        }
    }

    eprintln!("{} {} operations", "✓".green(), index.len());
    Ok(())
}

fn resolve_command(spec_path: &Path, rules_path: Option<&Path>, operation_id: &str) -> Result<()> {
    let index = load_index(spec_path)?;
    let rules = load_rules(rules_path)?;

    let resolution = OperationResolver::new(&index, &rules)
        .resolve(operation_id)
        .with_context(|| format!("Failed to resolve {}", operation_id))?;

    println!("{}", operation_id.bold());
    println!(
        "  Endpoint: {} {}",
        resolution.record.verb.as_str().to_uppercase(),
        resolution.record.path
    );
    println!("  Resource: {}", resolution.resource.canonical_name.yellow());
    println!("  Action: {}", resolution.decision.action.to_string().yellow());
    println!("  Singleton: {}", resolution.resource.is_singleton);
    println!("  Detail: {}", resolution.resource.is_detail);
    if resolution.requires_identifier() {
        println!("  Identifier: {} (required)", resolution.identifier_name().cyan());
    } else {
        println!("  Identifier: none");
    }

    Ok(())
}

fn generate_command(
    spec_path: &Path,
    rules_path: Option<&Path>,
    output: &Path,
    verbose: bool,
) -> Result<()> {
    println!(
        "{} Generating operations from: {}",
        "→".cyan(),
        spec_path.display()
    );

    let index = load_index(spec_path)?;
    let rules = load_rules(rules_path)?;
    println!("{} Indexed {} operations", "✓".green(), index.len());

    let emitter = OperationEmitter::new(&index, &rules).context("Failed to create emitter")?;
    let report = emitter
        .generate_to_directory(output)
        .context("Failed to generate operations")?;

    println!("\n{}", "✓ Generation complete!".green().bold());
    println!("  Operations written: {}", report.count.to_string().yellow());
    println!("  Index: {}/mod.rs", output.display());

    if !report.skipped.is_empty() {
        println!(
            "\n{} Skipped {} operations",
            "!".yellow(),
            report.skipped.len()
        );
        if verbose {
            for skipped in &report.skipped {
                println!("  • {}: {}", skipped.operation_id.cyan(), skipped.reason);
            }
        }
    }

    println!("{}", serde_json::json!({ "count": report.count }));
    Ok(())
}

async fn invoke_command(
    spec_path: &Path,
    rules_path: Option<&Path>,
    config: RestConfig,
    operation_id: &str,
    params: &str,
) -> Result<ExitCode> {
    let parameters: Map<String, Value> =
        serde_json::from_str(params).context("--params must be a JSON object")?;

    let index = load_index(spec_path)?;
    let rules = load_rules(rules_path)?;
    let registry = RestCapability::registry(config, resource_names(&index, &rules))
        .context("Failed to build REST capabilities")?;

    let dispatcher = Dispatcher::new(Arc::new(index), Arc::new(rules), Arc::new(registry));
    let response = dispatcher
        .handle(InvokeRequest::new(operation_id, parameters))
        .await;

    let failed = response.is_error();
    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("Failed to serialize response")?
    );

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn rules_command(rules_path: Option<&Path>) -> Result<()> {
    let rules = load_rules(rules_path)?;
    print!("{}", rules.to_yaml().context("Failed to serialize rules")?);
    Ok(())
}
