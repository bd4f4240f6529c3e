//! JSOC/DRMS query construction
//!
//! The JSOC export service addresses data with record-set commands of the
//! shape `series[time_UTC/span@cadence][wavelength]`. This module builds
//! those commands for AIA and HMI and parses the timestamps JSOC embeds in
//! returned record identifiers.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use helio_core::{AiaCadence, HmiSeries, TimeRange, ValidationError, ValidationResult};

/// Format an instant the way DRMS expects: `YYYY.MM.DD_HH:MM:SS_UTC`.
pub fn drms_time(instant: DateTime<Utc>) -> String {
    instant.format("%Y.%m.%d_%H:%M:%S_UTC").to_string()
}

/// Span token covering a time range, rounded up to whole hours.
///
/// JSOC accepts fractional spans but the export service is friendlier to
/// hour-aligned requests; a sub-hour range still exports as `1h`.
fn span_hours(range: TimeRange) -> i64 {
    let secs = range.duration_secs().max(1);
    (secs + 3599) / 3600
}

/// Build an AIA export command, validating the wavelength/cadence pair.
///
/// Example output: `aia.lev1_euv_12s[2024.01.01_00:00:00_UTC/1h@12s][171]`.
pub fn aia_export_command(
    wavelength: u16,
    cadence: AiaCadence,
    range: TimeRange,
) -> ValidationResult<String> {
    if !cadence.supports_wavelength(wavelength) {
        return Err(ValidationError::InvalidParameter {
            key: "wavelength".to_string(),
            value: wavelength.to_string(),
            reason: format!(
                "{}A not available at {} cadence (available: {:?})",
                wavelength,
                cadence.token(),
                cadence.wavelengths()
            ),
        });
    }
    Ok(format!(
        "{}[{}/{}h@{}][{}]",
        cadence.series(),
        drms_time(range.start),
        span_hours(range),
        cadence.token(),
        wavelength
    ))
}

/// Build an HMI export command.
///
/// Example output: `hmi.M_45s[2024.01.01_00:00:00_UTC/1h]`.
pub fn hmi_export_command(series: HmiSeries, range: TimeRange) -> String {
    format!(
        "{}[{}/{}h]",
        series.series(),
        drms_time(range.start),
        span_hours(range)
    )
}

/// Parse the content timestamp embedded in a JSOC record identifier.
///
/// Export responses name records like
/// `aia.lev1_euv_12s[2024-01-01T00:00:11Z][171]`; the first bracketed
/// segment is the observation instant.
pub fn parse_record_timestamp(record: &str) -> Option<DateTime<Utc>> {
    let inner = record.split('[').nth(1)?.split(']').next()?;
    let trimmed = inner.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
