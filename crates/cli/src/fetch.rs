//! The `fetch` subcommand

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use clap::ArgMatches;

use heliodata::prelude::*;

pub fn run(client: &Helio, matches: &ArgMatches) -> anyhow::Result<()> {
    // The default account is part of the cache key, so the displayed
    // fingerprint must be computed after it is applied.
    let request = client.with_default_account(build_request(matches)?);
    let fingerprint = request.fingerprint();

    match client.submit(request).map_err(|err| anyhow!(err))? {
        Submission::Cached(entries) => {
            println!(
                "fully cached: {} file(s) already present ({})",
                entries.len(),
                fingerprint
            );
            Ok(())
        }
        Submission::Started(handle) | Submission::Joined(handle) => watch(handle),
    }
}

/// Print progress from the event stream until the task finishes.
fn watch(handle: TaskHandle) -> anyhow::Result<()> {
    let events = handle.subscribe();
    for event in events {
        match event {
            TaskEvent::Started => {}
            TaskEvent::Resolved { total } => println!("resolved {} record(s)", total),
            TaskEvent::RecordCompleted {
                id,
                completed,
                total,
                cache_hit,
            } => {
                let note = if cache_hit { " (cached)" } else { "" };
                println!("[{}/{}] {}{}", completed, total, id, note);
            }
            TaskEvent::RecordFailed { id, reason } => {
                eprintln!("failed: {}: {}", id, reason);
            }
            TaskEvent::Finished(_) => break,
        }
    }

    match handle.wait() {
        TaskOutcome::Succeeded { records } => {
            println!("done: {} record(s) cached", records);
            Ok(())
        }
        TaskOutcome::PartiallySucceeded { completed, failed } => {
            bail!("partial: {} cached, {} failed", completed, failed.len())
        }
        TaskOutcome::Failed { reason } => bail!("failed: {}", reason),
        TaskOutcome::Cancelled => bail!("cancelled"),
    }
}

fn build_request(matches: &ArgMatches) -> anyhow::Result<RetrievalRequest> {
    let instrument: InstrumentId = matches
        .get_one::<String>("instrument")
        .map(String::as_str)
        .unwrap_or_default()
        .parse()
        .map_err(|err| anyhow!("{}", err))?;

    let start = parse_instant(matches, "start")?;
    let end = parse_instant(matches, "end")?;
    let range = TimeRange::new(start, end).map_err(|err| anyhow!(err))?;

    let mut request = RetrievalRequest::new(instrument, range);
    for (arg, param) in [
        ("wavelength", "wavelength"),
        ("cadence", "cadence"),
        ("series", "series"),
        ("telescope", "telescope"),
        ("detector", "detector"),
        ("obs-type", "obs_type"),
    ] {
        if let Some(value) = matches.get_one::<String>(arg) {
            request = request.with_param(param, value.clone());
        }
    }
    if let Some(email) = matches.get_one::<String>("email") {
        request = request.with_account(email.clone());
    }
    Ok(request)
}

fn parse_instant(matches: &ArgMatches, name: &str) -> anyhow::Result<DateTime<Utc>> {
    let raw = matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default();
    raw.parse::<DateTime<Utc>>()
        .with_context(|| format!("--{} expects an RFC 3339 instant, got {:?}", name, raw))
}
