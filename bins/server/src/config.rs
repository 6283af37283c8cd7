use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rivulet-server", about = "Topic message broker with follower replication")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the broker
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "broker.toml", env = "RIVULET_CONFIG")]
    pub config: String,

    /// Override the listen address from the config file
    #[arg(long, env = "RIVULET_LISTEN")]
    pub listen: Option<String>,
}
