//! Learmonth radio spectrograph archive
//!
//! Learmonth publishes one raw SRS file per UTC day, named `LMyymmdd.srs`
//! under a year directory. A retrieval request maps to the list of day
//! files touching the requested range; there are no further parameters.

use chrono::{DateTime, Datelike, Duration, Utc};

use helio_core::TimeRange;

use crate::backend::ArchiveQuery;

/// SRS file name for the day containing `instant`: `LMyymmdd.srs`.
pub fn srs_file_name(instant: DateTime<Utc>) -> String {
    format!(
        "LM{:02}{:02}{:02}.srs",
        instant.year() % 100,
        instant.month(),
        instant.day()
    )
}

/// Query covering every UTC day the range touches, in ascending order.
pub fn srs_query(range: TimeRange) -> ArchiveQuery {
    let mut files = Vec::new();
    let mut day = range.start.date_naive();
    let last = range.end.date_naive();
    while day <= last {
        let midnight = day.and_hms_opt(0, 0, 0).unwrap_or_default();
        files.push(srs_file_name(DateTime::from_naive_utc_and_offset(
            midnight, Utc,
        )));
        day += Duration::days(1);
    }
    ArchiveQuery::SrsFiles { files }
}
