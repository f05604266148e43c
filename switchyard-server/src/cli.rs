use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "switchyard",
    about = "Switchyard - LLM gateway with keys, rate limits, caching and cost accounting",
    version = env!("CARGO_PKG_VERSION"),
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// JSON configuration file
    #[arg(short, long, env = "SWITCHYARD_CONFIG", default_value = "switchyard.json")]
    pub config: PathBuf,

    /// Overrides the configured port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Overrides the configured log level
    #[arg(short, long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the gateway (default if no command specified)")]
    Serve,

    #[command(about = "Issue an API key into the configured key store")]
    GenerateKey {
        #[arg(long, help = "Client the key belongs to")]
        owner: String,

        #[arg(long, help = "Grant admin permission")]
        admin: bool,

        #[arg(long = "model", help = "Restrict the key to these models (repeatable)")]
        models: Vec<String>,

        #[arg(long, help = "Requests per minute allowed for the owner")]
        rate_limit: Option<u32>,
    },

    #[command(about = "Load and validate the configuration, then exit")]
    CheckConfig,
}
