//! IdP Attribute Filter CLI
//!
//! Runs attribute filter policies over JSON request documents.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod request;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use console::style;
use idp_core::Component;
use idp_filter::{AttributeFilter, PolicyCompiler, PolicyDocument};
use request::{FilterRequest, released_values};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "idp-filter")]
#[command(about = "Attribute release filtering for a SAML identity provider", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter the attributes of a request and print what is released
    Filter {
        /// Policy document
        #[arg(short, long)]
        policy: PathBuf,
        /// Request document
        #[arg(short, long)]
        request: PathBuf,
        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
    /// Validate a policy document
    Check {
        /// Policy document
        #[arg(short, long)]
        policy: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("idp_filter=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Filter { policy, request, pretty } => {
            let output = filter(&policy, &request, pretty)?;
            println!("{}", output);
            Ok(())
        }
        Commands::Check { policy } => {
            let (filter, rules) = check(&policy)?;
            println!(
                "{} {}: {} policies, {} attribute rules",
                style("ok").green().bold(),
                filter.id(),
                filter.policies().len(),
                rules
            );
            Ok(())
        }
    }
}

fn load_filter(policy: &Path) -> Result<AttributeFilter> {
    let document = PolicyDocument::from_path(policy)?;
    let filter = PolicyCompiler::new()
        .compile(&document)
        .wrap_err_with(|| format!("policy document {} is invalid", policy.display()))?;
    tracing::info!(
        filter = %filter.id(),
        policies = filter.policies().len(),
        "Loaded policy document"
    );
    Ok(filter)
}

fn filter(policy: &Path, request: &Path, pretty: bool) -> Result<String> {
    let filter = load_filter(policy)?;
    let json = std::fs::read_to_string(request)
        .wrap_err_with(|| format!("failed to read request {}", request.display()))?;
    let request: FilterRequest = serde_json::from_str(&json).wrap_err("invalid request document")?;

    let mut ctx = request.into_context();
    filter.filter(&mut ctx)?;
    let released = released_values(ctx.into_filtered_attributes());

    let output = if pretty {
        serde_json::to_string_pretty(&released)?
    } else {
        serde_json::to_string(&released)?
    };
    Ok(output)
}

fn check(policy: &Path) -> Result<(AttributeFilter, usize)> {
    let filter = load_filter(policy)?;
    let rules = filter
        .policies()
        .iter()
        .map(|p| p.attribute_rules().len())
        .sum();
    Ok((filter, rules))
}
