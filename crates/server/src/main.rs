mod config;
mod events;
mod server;

use anyhow::{Context, Result};
use clap::Parser;

use config::ServerConfig;
use server::RelayServer;

#[derive(Parser)]
#[command(name = "lazarus-relay")]
#[command(about = "Dedicated relay authority for revive and ghost events")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = lazarus::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = 32)]
    max_peers: usize,

    #[arg(long, default_value_t = 30, help = "Drop peers silent for this long")]
    timeout_secs: u64,

    #[arg(long, default_value_t = 5, help = "Sleep between socket polls")]
    tick_ms: u64,

    #[arg(long, default_value_t = 30, help = "Seconds between status lines, 0 to disable")]
    summary_secs: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let bind_addr = format!("{}:{}", args.bind, args.port);

    let config = ServerConfig {
        max_peers: args.max_peers,
        timeout_secs: args.timeout_secs,
        tick_ms: args.tick_ms,
        summary_interval_secs: args.summary_secs,
    };

    let mut server =
        RelayServer::new(&bind_addr, config).with_context(|| format!("binding {}", bind_addr))?;

    log::info!("Relay authority listening on {}", server.local_addr());
    server.run()
}
