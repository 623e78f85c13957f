use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "appguard",
    version,
    about = "Application access policy host speaking JSON lines on stdin/stdout"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "appguard.yaml")]
    pub config: PathBuf,

    /// Path to the policy file (overrides config file setting)
    #[arg(short, long)]
    pub policy: Option<PathBuf>,

    /// Path to the audit log (overrides config file setting)
    #[arg(long)]
    pub audit_log: Option<PathBuf>,

    /// Log level filter (overrides config file setting; RUST_LOG wins over both)
    #[arg(long)]
    pub log_level: Option<String>,
}
