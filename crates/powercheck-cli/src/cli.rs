use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "powercheck",
    about = "Report API for Powercheck dashboards",
    version
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Serve the report API over HTTP.
    Serve {
        /// Interface to bind.
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind; defaults to API_HTTP_PORT.
        #[arg(long)]
        port: Option<u16>,
    },
}
