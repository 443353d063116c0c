//! hostmgrd entry point

use clap::Parser;
use hostmgrd::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Synchronizes SSH host-based trust through a shared registry", long_about = None)]
struct Cli {
    /// Registry server address (host:port or redis:// URL)
    #[arg(long, env = "HOSTMGR_HOST", default_value = "localhost:6379")]
    host: String,

    /// Key prefix under which host records are stored
    #[arg(long, env = "HOSTMGR_FILTER", default_value = "/hostmgr")]
    filter: String,

    /// Server mode: manage this host's SSH trust files from the registry
    #[arg(long, conflicts_with = "client")]
    server: bool,

    /// Client mode: announce this host to participating servers
    #[arg(long)]
    client: bool,

    /// Username of the ssh client executor (not the login name)
    #[arg(long)]
    user: Option<String>,

    /// Show debugging output
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "hostmgrd=debug,hostmgr=debug"
    } else {
        "hostmgrd=info,hostmgr=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::new(&cli.host, &cli.filter, cli.server, cli.client, cli.user);

    if let Err(e) = hostmgrd::run(config).await {
        tracing::error!("Service error: {}", e);
        std::process::exit(1);
    }
}
