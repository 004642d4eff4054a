use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ssobroker")]
#[command(about = "Single sign-on broker: codes, refresh rotation and logout")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (defaults to ssobroker.toml)
    #[arg(short, long, global = true, env = "SSOBROKER_CONFIG")]
    pub config: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the broker (the default)
    Serve,
    /// Print an argon2 hash for a [[users]] entry
    HashPassword {
        /// Password to hash
        password: String,
    },
}
