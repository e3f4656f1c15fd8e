mod agent_station;
mod config;
mod poller;
mod record_writer;
mod sensor_readings;
mod socket_station;
mod station;
mod time_encoder;

use agent_station::AgentStation;
use anyhow::Context;
use clap::Parser;
use config::{Cli, PollerConfig, SourceConfig};
use poller::{Poller, SystemClock};
use record_writer::RecordWriter;
use signal_hook::consts::{SIGINT, SIGTERM};
use socket_station::SocketStation;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = PollerConfig::from_cli(Cli::parse())?;

    // First signal stops the loop at the next check; a second one exits at once,
    // even while a fetch is blocked.
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGTERM, SIGINT] {
        signal_hook::flag::register_conditional_shutdown(signal, 1, shutdown.clone())
            .with_context(|| format!("Failed to register exit handler for signal {signal}"))?;
        signal_hook::flag::register(signal, shutdown.clone())
            .with_context(|| format!("Failed to register shutdown flag for signal {signal}"))?;
    }

    let clock = SystemClock::new(config.timezone, shutdown.clone());
    let writer = RecordWriter::new(&config.output, config.echo);

    info!(timezone = %config.timezone, echo = config.echo, "poller configured");
    match config.source {
        SourceConfig::Socket {
            host,
            port,
            timeout,
        } => {
            let station = SocketStation::new(host, port, timeout);
            Poller::new(station, clock, writer, config.delay).run(&shutdown);
        }
        SourceConfig::Agent {
            host,
            port,
            community,
            timeout,
            strict,
        } => {
            let station = AgentStation::new(host, port, community, timeout, strict);
            Poller::new(station, clock, writer, config.delay).run(&shutdown);
        }
    }

    Ok(())
}
