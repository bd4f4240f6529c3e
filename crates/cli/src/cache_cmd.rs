//! The `cache` subcommands

use anyhow::anyhow;

use heliodata::Helio;

pub fn usage(client: &Helio) -> anyhow::Result<()> {
    let usage = client.cache_usage();
    println!(
        "{} entr{}, {} bytes ({})",
        usage.entry_count,
        if usage.entry_count == 1 { "y" } else { "ies" },
        usage.total_bytes,
        human_bytes(usage.total_bytes)
    );
    Ok(())
}

pub fn clear(client: &Helio, yes: bool) -> anyhow::Result<()> {
    let usage = client.cache_usage();
    if usage.entry_count == 0 {
        println!("cache is empty");
        return Ok(());
    }
    if !yes {
        let prompt = format!(
            "Remove {} cached entr{} ({})?",
            usage.entry_count,
            if usage.entry_count == 1 { "y" } else { "ies" },
            human_bytes(usage.total_bytes)
        );
        if !crate::confirm(&prompt)? {
            println!("aborted");
            return Ok(());
        }
    }
    let removed = client.clear_cache().map_err(|err| anyhow!(err))?;
    println!("removed {} entr{}", removed, if removed == 1 { "y" } else { "ies" });
    Ok(())
}

pub fn enforce(client: &Helio) -> anyhow::Result<()> {
    let report = client.enforce_retention();
    println!(
        "evicted {} entr{}, freed {}",
        report.evicted.len(),
        if report.evicted.len() == 1 { "y" } else { "ies" },
        human_bytes(report.freed_bytes)
    );
    if let Some(excess) = report.over_quota_bytes {
        println!("warning: still {} over the configured limit", human_bytes(excess));
    }
    Ok(())
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
