//! Neutron CLI
//!
//! Command-line interface for the Neutron networking API.

use anyhow::{Context, Result};
use clap::Parser;
use neutron_core::config::default_clouds_path;
use neutron_core::{CloudsFile, Configuration};
use neutronctl::cli::{
    generate_completion, handle_auth_info, handle_config, handle_packet_filter, Cli, Commands,
    OutputFormat,
};
use neutronctl::client::NeutronClient;
use neutronctl::config::CliConfig;
use tracing::debug;

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Resolve the client configuration from arguments, `OS_*` variables and the cloud profile
fn resolve_configuration(cli: &Cli, timeout: Option<u64>) -> Result<Configuration> {
    let mut params = cli.auth.to_params();
    params.timeout = params.timeout.or(timeout);

    if params.cloud.as_deref().is_some_and(|c| !c.is_empty()) {
        let path = default_clouds_path();
        debug!("Loading cloud profiles from {}", path.display());
        let clouds = CloudsFile::load(&path)
            .with_context(|| format!("Failed to load cloud profiles from {}", path.display()))?;
        params = params.with_cloud_profile(&clouds)?;
    }

    Ok(Configuration::resolve(params)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build configuration using priority chain: args → env → file → defaults
    let config_path = cli.config.clone().unwrap_or_else(CliConfig::config_path);
    let mut builder = CliConfig::builder();

    if let Some(ref format) = cli.format {
        let format_str = match format {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
        };
        builder = builder.with_output_format(format_str)?;
    }
    if cli.verbose {
        builder = builder.with_verbose(true);
    }
    if let Some(timeout) = cli.auth.http_timeout {
        builder = builder.with_timeout(timeout)?;
    }

    builder = builder.with_env_overrides();
    if !cli.no_config {
        builder = builder.with_config_file(Some(&config_path))?;
    }

    let config = match builder.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.verbose);

    let output_format = match config.output_format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };

    // Commands that need no credentials
    match cli.command {
        Commands::Completion { shell } => {
            generate_completion(shell);
            return Ok(());
        }
        Commands::Config { command } => {
            if let Err(e) = handle_config(command, &config, &config_path, &output_format) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
            return Ok(());
        }
        _ => {}
    }

    let client = match resolve_configuration(&cli, config.timeout)
        .and_then(|c| NeutronClient::from_config(&c).map_err(Into::into))
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::AuthInfo => handle_auth_info(&client, &output_format).await,
        Commands::PacketFilter { command } => {
            handle_packet_filter(&client, command, &output_format).await
        }
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        if config.verbose {
            eprintln!("Error details: {:?}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}
