//! Minimal CLI surface: one binary, configuration otherwise comes entirely
//! from the environment variables `Config::from_env` reads.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "agent-connector-gatewayd", version, about = "Agent-connector gateway")]
pub struct Cli {
    /// Log level passed to the tracing env-filter.
    #[arg(long, default_value = "info", env = "GATEWAY_LOG_LEVEL")]
    pub log_level: String,
}
