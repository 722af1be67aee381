use anyhow::{Context, Result};
use clap::Parser;
use macchanger_lib::{cli, list_interfaces, MacchangerError};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logs go to stderr so stdout only ever carries the resulting address.
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    // Allow RUST_LOG to override if set
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_interfaces() -> Result<()> {
    let interfaces = list_interfaces().context("failed to list network interfaces")?;
    for interface in interfaces {
        println!("{}\t{}\t{}", interface.name, interface.mac, interface.adapter);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = cli::Args::parse();

    init_tracing(args.verbose);

    if args.list {
        return print_interfaces();
    }

    let control = args.control()?;
    let mut rng = rand::thread_rng();
    let mut stdout = std::io::stdout().lock();

    match cli::run(&args, &control, &mut rng, &mut stdout) {
        Ok(_) => Ok(()),
        Err(e @ MacchangerError::InterfaceNotFound { .. }) => {
            if let Ok(interfaces) = list_interfaces() {
                let names: Vec<String> = interfaces.into_iter().map(|i| i.name).collect();
                warn!("available interfaces: {}", names.join(", "));
            }
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
