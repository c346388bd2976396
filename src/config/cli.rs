use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use larder_api_types::MutationAction;
use uuid::Uuid;

/// Command-line arguments for the Larder binary.
#[derive(Debug, Parser)]
#[command(name = "larder", version, about = "Larder cache invalidation service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "LARDER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the revalidation endpoint.
    Serve(Box<ServeArgs>),
    /// Derive the tags for one mutation and send them to the endpoint.
    Dispatch(DispatchArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RevalidationOverrides {
    /// Override the base URL the revalidation endpoint is served under.
    #[arg(long = "revalidate-url", env = "LARDER_REVALIDATE_URL", value_name = "URL")]
    pub revalidate_url: Option<String>,

    /// Override the shared secret.
    #[arg(
        long = "revalidate-secret",
        env = "LARDER_REVALIDATE_SECRET",
        value_name = "SECRET",
        hide_env_values = true
    )]
    pub revalidate_secret: Option<String>,

    /// Override the dispatch timeout in milliseconds.
    #[arg(long = "revalidate-timeout-ms", value_name = "MILLIS")]
    pub revalidate_timeout_ms: Option<u64>,

    /// Enable or disable invalidation entirely.
    #[arg(
        long = "revalidate-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub revalidate_enabled: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub revalidation: RevalidationOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the cache backend (memory|remote).
    #[arg(long = "cache-backend", value_name = "BACKEND")]
    pub cache_backend: Option<String>,

    /// Override the purge API base URL used by the remote backend.
    #[arg(long = "cache-purge-url", value_name = "URL")]
    pub cache_purge_url: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct DispatchArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub revalidation: RevalidationOverrides,

    /// Mutation to revalidate for (new-entity|update-entity|delete-entity).
    #[arg(long, value_name = "ACTION")]
    pub action: MutationAction,

    /// Id of the mutated recipe; a random id is used when omitted.
    #[arg(long, value_name = "UUID")]
    pub id: Option<Uuid>,

    /// Slug of the mutated recipe.
    #[arg(long, value_name = "SLUG")]
    pub slug: Option<String>,

    /// Slug of the recipe's category.
    #[arg(long = "category", value_name = "SLUG")]
    pub category: Option<String>,

    /// Print the request body instead of sending it.
    #[arg(long = "dry-run", action = clap::ArgAction::SetTrue)]
    pub dry_run: bool,
}
