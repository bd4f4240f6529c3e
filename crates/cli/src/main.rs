//! Command-line front end
//!
//! ```text
//! helio fetch --instrument aia --start 2024-01-01T00:00:00Z \
//!     --end 2024-01-01T01:00:00Z --wavelength 171 --cadence 12s
//! helio cache usage
//! helio cache clear
//! helio cache enforce
//! ```
//!
//! Logging goes to stderr, controlled by `RUST_LOG`; command output goes
//! to stdout.

use anyhow::{anyhow, bail, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

mod cache_cmd;
mod fetch;

fn cli() -> Command {
    let config_args = [
        Arg::new("config")
            .long("config")
            .value_name("FILE")
            .help("Path to a TOML configuration file")
            .global(true),
        Arg::new("cache-root")
            .long("cache-root")
            .value_name("DIR")
            .help("Cache directory (overrides configuration)")
            .global(true),
    ];

    Command::new("helio")
        .about("Solar observatory data retrieval and cache management")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .args(config_args)
        .subcommand(
            Command::new("fetch")
                .about("Fetch observational data into the cache")
                .arg(
                    Arg::new("instrument")
                        .long("instrument")
                        .value_name("NAME")
                        .help("Instrument: aia, hmi, iris, soho, learmonth")
                        .required(true),
                )
                .arg(
                    Arg::new("start")
                        .long("start")
                        .value_name("RFC3339")
                        .help("Start of the time range, e.g. 2024-01-01T00:00:00Z")
                        .required(true),
                )
                .arg(
                    Arg::new("end")
                        .long("end")
                        .value_name("RFC3339")
                        .help("End of the time range (inclusive)")
                        .required(true),
                )
                .arg(
                    Arg::new("wavelength")
                        .long("wavelength")
                        .value_name("ANGSTROMS")
                        .help("Wavelength (AIA, IRIS SJI, SOHO EIT)"),
                )
                .arg(
                    Arg::new("cadence")
                        .long("cadence")
                        .value_name("CADENCE")
                        .help("AIA cadence: 12s, 24s, or 1h"),
                )
                .arg(
                    Arg::new("series")
                        .long("series")
                        .value_name("SERIES")
                        .help("HMI series, e.g. 45s, 720s, B_45s, Ic_720s"),
                )
                .arg(
                    Arg::new("telescope")
                        .long("telescope")
                        .value_name("TELESCOPE")
                        .help("SOHO telescope: eit, lasco, mdi"),
                )
                .arg(
                    Arg::new("detector")
                        .long("detector")
                        .value_name("DETECTOR")
                        .help("LASCO detector: c1, c2, c3"),
                )
                .arg(
                    Arg::new("obs-type")
                        .long("obs-type")
                        .value_name("TYPE")
                        .help("IRIS observation type: sji or raster"),
                )
                .arg(
                    Arg::new("email")
                        .long("email")
                        .value_name("ADDRESS")
                        .help("Export account address (enables the JSOC export path)"),
                ),
        )
        .subcommand(
            Command::new("cache")
                .about("Inspect and manage the cache")
                .subcommand_required(true)
                .subcommand(Command::new("usage").about("Show cache usage"))
                .subcommand(
                    Command::new("clear")
                        .about("Remove every cache entry")
                        .arg(
                            Arg::new("yes")
                                .long("yes")
                                .action(ArgAction::SetTrue)
                                .help("Do not ask for confirmation"),
                        ),
                )
                .subcommand(
                    Command::new("enforce").about("Run one retention pass immediately"),
                ),
        )
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let client = open_client(&matches)?;

    let result = match matches.subcommand() {
        Some(("fetch", sub)) => fetch::run(&client, sub),
        Some(("cache", sub)) => match sub.subcommand() {
            Some(("usage", _)) => cache_cmd::usage(&client),
            Some(("clear", sub)) => cache_cmd::clear(&client, sub.get_flag("yes")),
            Some(("enforce", _)) => cache_cmd::enforce(&client),
            _ => unreachable!("subcommand_required"),
        },
        _ => unreachable!("subcommand_required"),
    };
    client.shutdown();
    result
}

fn open_client(matches: &ArgMatches) -> anyhow::Result<heliodata::Helio> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => heliodata::HelioConfig::load(std::path::Path::new(path))
            .with_context(|| format!("loading configuration from {}", path))?,
        None => heliodata::HelioConfig::default(),
    };
    if let Some(root) = matches.get_one::<String>("cache-root") {
        config.cache_root = root.into();
    }
    heliodata::HelioBuilder::from_config(config)
        .open()
        .map_err(|err| anyhow!(err))
}

pub(crate) fn confirm(prompt: &str) -> anyhow::Result<bool> {
    use std::io::Write;
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    if answer.is_empty() {
        return Ok(false);
    }
    match answer.as_str() {
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        other => bail!("unrecognized answer: {}", other),
    }
}
