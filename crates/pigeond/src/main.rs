use std::env;
use std::process;

use anyhow::Context;
use pigeonlink::{Direction, LinkConfig, LinkContext, PigeonLink, Registry};
use tracing::{error, info};

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [--list]", program);
    process::exit(2);
}

fn list(registry: &Registry, ctx: &LinkContext) {
    for direction in [Direction::Rx, Direction::Tx] {
        println!("{}:", direction);
        for desc in registry.descriptors(direction) {
            let state = if desc.is_available(ctx) { "available" } else { "unavailable" };
            println!("  {:<12} {}", desc.name(), state);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("pigeond");
    let list_only = match args.get(1).map(String::as_str) {
        None => false,
        Some("--list") => true,
        Some(_) => usage(program),
    };

    let config = LinkConfig::from_env().context("Reading configuration")?;
    let ctx = LinkContext::system(config);
    let registry = Registry::standard();

    if list_only {
        list(&registry, &ctx);
        return Ok(());
    }

    info!("Starting pigeond v{} (PID: {})", env!("CARGO_PKG_VERSION"), process::id());

    let link = match PigeonLink::open(&registry, &ctx) {
        Ok(link) => link,
        Err(e) => {
            error!("Could not bring the link up: {}", e);
            process::exit(1);
        }
    };

    tokio::signal::ctrl_c()
        .await
        .context("Waiting for Ctrl-C")?;
    info!("Shutting down");

    // Joining the runner threads blocks; keep it off the async workers.
    tokio::task::spawn_blocking(move || link.close())
        .await
        .context("Shutdown task")?
        .context("Closing link")?;

    info!("Stopped");
    Ok(())
}
