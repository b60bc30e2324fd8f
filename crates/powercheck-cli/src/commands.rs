use anyhow::Result;
use tracing_subscriber::EnvFilter;

use powercheck_core::config::Config;

use crate::cli::Command;

pub(crate) fn run(command: Command) -> Result<()> {
    init_tracing();

    match command {
        Command::Serve { host, port } => {
            let config = Config::from_env();
            let port = port.unwrap_or(config.api.http_port);
            powercheck_web::serve(&config, &host, port)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
