use clap::Parser;
use tracing_subscriber::EnvFilter;

use farmhand::config::{CoordinatorConfig, DEFAULT_PORT};
use farmhand::server::{console, Coordinator};
use farmhand::{shutdown, worker};

#[derive(Parser, Debug)]
#[command(name = "farmhand")]
#[command(about = "A simple job distribution system", version)]
struct Args {
    /// Run as the coordinator
    #[arg(short = 's', long = "server", conflicts_with = "client")]
    server: bool,

    /// Run as a worker; the value is the coordinator URL (e.g. ws://host:55000)
    #[arg(short = 'c', long = "client", value_name = "host")]
    client: Option<String>,

    /// Port the coordinator listens on
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Pre-ingest jobs from the given text file (coordinator only)
    #[arg(short = 't', long = "txtfile", value_name = "file")]
    txtfile: Option<std::path::PathBuf>,

    /// Enable debug output
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if let Some(url) = args.client {
        worker::runner::run(&url).await?;
        return Ok(());
    }

    if args.server {
        let mut config = CoordinatorConfig::new(args.port);
        if let Some(path) = args.txtfile {
            config = config.with_txtfile(path);
        }

        let token = shutdown::shutdown_token();
        let (coordinator, handle) = Coordinator::bind(config, token.clone()).await?;
        console::attach_stdin(handle.events(), token);
        coordinator.run().await?;
        return Ok(());
    }

    Err("Select a role: --server or --client <host>".into())
}
