//! obdscan — OBD-II diagnostics over an ELM327 adapter.
//!
//! Loads the lookup tables, opens the serial (or TCP) link, brings up
//! the adapter, and runs one subcommand against the vehicle.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use obdscan_elm327_lib::{Elm327, Link, SerialLink, Tables, TcpLink, Value, ENGINE_PROVIDED_MARKER};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "obdscan")]
#[command(version, about = "Talk to an ELM327 OBD-II adapter")]
struct Args {
    /// Path to a JSON config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port (overrides the config file).
    #[arg(short, long)]
    port: Option<String>,

    /// Connect to a TCP dongle (host:port) instead of a serial port.
    #[arg(long)]
    tcp: Option<String>,

    /// Directory containing the lookup-table resources.
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the adapter and print its information report.
    Info,
    /// Connect and list the PIDs the vehicle supports.
    Pids,
    /// Connect and decode PIDs; with none given, every supported PID
    /// that has a decoder.
    Read {
        /// PID codes, e.g. 010C 0105 0902.
        pids: Vec<String>,
    },
    /// Read stored trouble codes.
    Dtc {
        /// Read pending trouble codes as well.
        #[arg(long)]
        pending: bool,
    },
    /// Clear trouble codes and stored values.
    Clear {
        /// Confirm: clearing resets the MIL and erases freeze frames.
        #[arg(long)]
        yes: bool,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(port) = &args.port {
        config.port = port.clone();
    }
    if let Some(tcp) = &args.tcp {
        config.tcp = Some(tcp.clone());
    }
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    Ok(config)
}

fn load_tables(config: &Config) -> Arc<Tables> {
    let (mut tables, warnings) = Tables::load(&config.data_dir);
    for warning in &warnings {
        warn!("{warning}");
    }
    for path in &config.extra_trouble_codes {
        if let Some(warning) = tables.extend_trouble_descriptions(path) {
            warn!("{warning}");
        }
    }
    Arc::new(tables)
}

fn open_link(config: &Config) -> Result<Box<dyn Link>> {
    match &config.tcp {
        Some(addr) => {
            let link = TcpLink::connect(addr.as_str(), config.timeout())
                .with_context(|| format!("connecting to {addr}"))?;
            Ok(Box::new(link))
        }
        None => {
            let link = SerialLink::open(&config.port, config.baud, config.timeout())
                .with_context(|| format!("opening {}", config.port))?;
            Ok(Box::new(link))
        }
    }
}

fn connect(engine: &mut Elm327<Box<dyn Link>>) -> Result<()> {
    info!("connecting to vehicle bus...");
    engine.connect().context("connecting to the vehicle bus")?;
    Ok(())
}

fn print_decoded(engine: &mut Elm327<Box<dyn Link>>, pid: &str) {
    let description = engine
        .supported_pids()
        .description(pid)
        .unwrap_or("")
        .to_string();
    let value = engine.decode_pid(pid);
    println!("{pid}  {value}  {description}");
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let tables = load_tables(&config);
    let link = open_link(&config)?;

    let mut engine = Elm327::new(link, tables);
    engine.set_settle_delay(config.settle_delay());
    for failure in engine.init_failures() {
        warn!("{failure}");
    }

    match &args.command {
        Command::Info => {
            if !engine.is_present() {
                bail!("no ELM327 adapter is responding");
            }
            for (label, text) in engine.adapter_info().context("querying adapter info")? {
                println!("{label:<24} {text}");
            }
        }
        Command::Pids => {
            connect(&mut engine)?;
            for (pid, description) in engine.supported_pids().iter() {
                println!("{pid:<6} {description}");
            }
        }
        Command::Read { pids } => {
            connect(&mut engine)?;
            if pids.is_empty() {
                // Everything supported and decodable, skipping the
                // engine-provided entries (reading "04" would clear
                // the stored codes).
                let implemented = engine.implemented_pids();
                for pid in implemented {
                    let selectable = engine
                        .supported_pids()
                        .description(pid)
                        .is_some_and(|d| !d.starts_with(ENGINE_PROVIDED_MARKER));
                    if selectable {
                        print_decoded(&mut engine, pid);
                    }
                }
            } else {
                for pid in pids {
                    print_decoded(&mut engine, pid);
                }
            }
        }
        Command::Dtc { pending } => {
            connect(&mut engine)?;
            print_decoded(&mut engine, "03");
            if *pending {
                print_decoded(&mut engine, "07");
            }
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("pass --yes to confirm clearing trouble codes");
            }
            connect(&mut engine)?;
            match engine.decode_pid("04") {
                Value::Error => bail!("clear command failed"),
                value => println!("cleared: {value}"),
            }
        }
    }

    engine.close();
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
