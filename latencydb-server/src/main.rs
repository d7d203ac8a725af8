use clap::Parser;
use latencydb_server::config::{parse_log_filter, DEFAULT_ADDRESS, DEFAULT_LOG_FILTER};
use latencydb_server::{Server, ServerConfig};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "latencydb-server", about = "In-memory response time percentile service")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "LATENCYDB_ADDRESS", default_value = DEFAULT_ADDRESS)]
    address: SocketAddr,

    /// tracing filter directive, e.g. `info` or `latencydb_server=debug`.
    #[arg(long, env = "RUST_LOG", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = parse_log_filter(&args.log_filter)
        .map_err(|e| format!("invalid log filter {:?}: {}", args.log_filter, e))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig { address: args.address };

    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();

    // Print "Listening on <addr>" once the server signals it is bound.
    tokio::spawn(async move {
        if let Ok(addr) = ready_rx.await {
            println!("Listening on {}", addr);
        }
    });

    Server::new(config).run(ready_tx).await?;
    Ok(())
}
