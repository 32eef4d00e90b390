//! One-shot SFTP client: performs one operation per invocation

use clap::Parser;
use sftpctl::{execute, Args, ClientConfig, SftpConnector};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for results
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut config = ClientConfig::new();
    if let Some(secs) = args.timeout {
        config = config.connect_timeout(Duration::from_secs(secs));
    }

    let request = match args.into_request() {
        Ok(request) => request,
        Err(rejection) => {
            println!("{}", rejection);
            return;
        }
    };
    tracing::debug!(?request, "Resolved request");

    let connector = SftpConnector::new().config(config);
    println!("{}", execute(&connector, &request).await);
}
