use clap::Parser;
use lsp_connection::lsp::ConnectionConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen: Option<String>,
    pub workspace: PathBuf,
    pub log_level: String,
    pub connection: ConnectionConfig,
}

#[derive(Parser, Debug)]
#[command(name = "lsp_connection")]
#[command(about = "Serve LSP connections over stdio or TCP", long_about = None)]
pub struct Cli {
    /// Listen for TCP clients on this address instead of using stdin/stdout
    #[arg(long)]
    listen: Option<String>,
    /// Workspace root handed to every connection
    #[arg(long)]
    workspace: Option<PathBuf>,
    #[arg(long, default_value_t = 60)]
    pub max_pending_age_secs: u64,
    #[arg(long, default_value_t = 10)]
    pub sweep_interval_secs: u64,
    #[arg(long, default_value_t = 64 * 1024 * 1024)]
    pub max_content_length: usize,
    /// Used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn from_args() -> Self {
        Self::parse()
    }

    pub fn into_config(self) -> Config {
        Config {
            listen: self.listen,
            workspace: self.workspace.unwrap_or_else(|| {
                std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
            }),
            log_level: self.log_level,
            connection: ConnectionConfig {
                max_content_length: self.max_content_length,
                max_pending_age: Duration::from_secs(self.max_pending_age_secs),
                sweep_interval: Duration::from_secs(self.sweep_interval_secs),
                ..ConnectionConfig::default()
            },
        }
    }
}
