use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tsip_gpsdo::core::Dialect;
use tsip_gpsdo::link::SerialLink;
use tsip_gpsdo::{Driver, DriverConfig, LinkConfig, Notification, ReceiverState};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Parity {
    Odd,
    None,
}

impl From<Parity> for Dialect {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::Odd => Dialect::Odd,
            Parity::None => Dialect::None,
        }
    }
}

/// Watch a TSIP disciplined oscillator on a serial port
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Serial device, e.g. /dev/ttyUSB0
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Parity tried first; the driver toggles it if the receiver stays silent
    #[arg(long, value_enum)]
    parity: Option<Parity>,

    /// Receiver state snapshot, loaded at start and rewritten periodically
    #[arg(short, long, value_name = "FILE")]
    snapshot: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut link_config = LinkConfig::default();
    if let Some(port) = cli.port {
        link_config.device = port;
    }
    if let Some(baud) = cli.baud {
        link_config.baud = baud;
    }
    if let Some(parity) = cli.parity {
        link_config.dialect = parity.into();
    }

    if let Err(e) = run(link_config, cli.snapshot) {
        error!("monitor stopped: {}", e);
        std::process::exit(1);
    }
}

fn run(link_config: LinkConfig, snapshot: Option<PathBuf>) -> tsip_gpsdo::Result<()> {
    // Last-known values from a previous run, if any
    let state = match snapshot.as_ref().map(File::open) {
        Some(Ok(file)) => ReceiverState::load(file)?,
        _ => ReceiverState::new(),
    };

    let config = DriverConfig {
        dialect: link_config.dialect,
        ..DriverConfig::default()
    };
    let mut driver = Driver::with_state(config, state)?;
    let mut link = SerialLink::open(&link_config, driver.dialect())?;

    info!(device = %link_config.device, "monitoring receiver, Ctrl-C to stop");
    let mut last_idle = Instant::now();
    let mut last_report = Instant::now();

    loop {
        for notification in link.pump(&mut driver)? {
            if let Notification::Fault(diag) = notification {
                warn!("{}", diag);
            }
        }

        if last_idle.elapsed() >= link_config.idle_poll {
            driver.on_idle();
            last_idle = Instant::now();
        }

        if let Some(dialect) = driver.take_reconnect() {
            link.set_dialect(dialect)?;
            driver.link_reset();
        }

        if last_report.elapsed() >= Duration::from_secs(10) {
            report(&driver);
            if let Some(path) = &snapshot {
                driver.state().save(File::create(path)?)?;
            }
            last_report = Instant::now();
        }
    }
}

fn report(driver: &Driver) {
    let state = driver.state();
    let diagnostics = driver.diagnostics();

    if let Some(utc) = state.timing.and_then(|t| t.utc()) {
        info!(%utc, "receiver time");
    }
    if let Some(mode) = state.discipline_mode {
        info!(?mode, alarms = ?state.minor_alarms, progress = ?state.survey.progress, "disciplining");
    }
    if let Some(dops) = state.dops {
        info!(pdop = dops.pdop, tdop = dops.tdop, "dilution of precision");
    }
    let tracked: Vec<u8> = state
        .satellites
        .in_use()
        .filter(|(_, r)| r.tracking)
        .map(|(prn, _)| prn)
        .collect();
    info!(?tracked, "satellites");
    info!(
        messages = diagnostics.messages,
        bad = diagnostics.bad_packets,
        unknown = diagnostics.unknown_messages,
        repaired = diagnostics.repaired,
        "link quality"
    );
}
