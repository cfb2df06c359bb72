use anyhow::{Context, Result};
use clap::Parser;
use imagestamp::config::Config;
use imagestamp::server::StampProxy;
use pingora_core::server::configuration::Opt;
use pingora_core::server::Server;
use std::path::PathBuf;

/// imagestamp - stamps and watermarks images behind a file cache
#[derive(Parser, Debug)]
#[command(name = "imagestamp")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Daemon mode
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    config.validate().context("Invalid configuration")?;

    imagestamp::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize logging subsystem")?;

    tracing::info!(
        config_file = %args.config.display(),
        server_address = %config.server.address,
        server_port = config.server.port,
        routes = config.routes.len(),
        cache_enabled = config.cache.enabled,
        cache_dir = %config.cache.dir.display(),
        cache_ttl_seconds = config.cache.ttl_seconds,
        "Configuration loaded successfully"
    );

    if args.test {
        tracing::info!("Configuration test successful");
        return Ok(());
    }

    let opt = Opt {
        daemon: args.daemon,
        ..Default::default()
    };

    let mut server = Server::new(Some(opt)).context("Failed to create Pingora server")?;
    server.bootstrap();

    let proxy = StampProxy::new(&config);
    let mut proxy_service = pingora_proxy::http_proxy_service(&server.configuration, proxy);
    proxy_service.threads = Some(config.server.threads);

    let listen_addr = config.server.listen_address();
    proxy_service.add_tcp(&listen_addr);

    tracing::info!(
        address = %listen_addr,
        threads = config.server.threads,
        "Starting imagestamp server"
    );

    server.add_service(proxy_service);

    // Blocks until shutdown
    server.run_forever();
}
