//! VSO-style search construction
//!
//! The Virtual Solar Observatory path serves AIA and HMI without an
//! account identifier, and is the only path for IRIS and SOHO. Queries are
//! attribute searches: time window, instrument, and optional wavelength,
//! sample cadence, physical observable, detector, or data level.

use helio_core::{
    AiaCadence, HmiSeries, IrisObsType, LascoDetector, SohoTelescope, TimeRange,
    ValidationError, ValidationResult,
};

use crate::backend::ArchiveQuery;

/// AIA search: wavelength filter plus the cadence as a sample rate.
pub fn aia_search(
    wavelength: u16,
    cadence: AiaCadence,
    range: TimeRange,
) -> ValidationResult<ArchiveQuery> {
    if !cadence.supports_wavelength(wavelength) {
        return Err(ValidationError::InvalidParameter {
            key: "wavelength".to_string(),
            value: wavelength.to_string(),
            reason: format!("{}A not available at {} cadence", wavelength, cadence.token()),
        });
    }
    Ok(ArchiveQuery::VsoSearch {
        instrument: "AIA".to_string(),
        start: range.start,
        end: range.end,
        wavelength: Some(wavelength),
        sample_secs: Some(cadence.seconds()),
        physobs: None,
        detector: None,
        level: None,
    })
}

/// HMI search: physobs derived from the series, sample from its cadence.
pub fn hmi_search(series: HmiSeries, range: TimeRange) -> ArchiveQuery {
    ArchiveQuery::VsoSearch {
        instrument: "HMI".to_string(),
        start: range.start,
        end: range.end,
        wavelength: None,
        sample_secs: Some(series.cadence_seconds()),
        physobs: Some(series.physobs().to_string()),
        detector: None,
        level: None,
    }
}

/// IRIS search: slit-jaw images filter by wavelength, rasters by level 2.
pub fn iris_search(
    obs_type: IrisObsType,
    wavelength: Option<u16>,
    range: TimeRange,
) -> ValidationResult<ArchiveQuery> {
    if let (IrisObsType::Sji, Some(wl)) = (obs_type, wavelength) {
        if !IrisObsType::SJI_WAVELENGTHS.contains(&wl) {
            return Err(ValidationError::InvalidParameter {
                key: "wavelength".to_string(),
                value: wl.to_string(),
                reason: format!("SJI wavelengths are {:?}", IrisObsType::SJI_WAVELENGTHS),
            });
        }
    }
    Ok(ArchiveQuery::VsoSearch {
        instrument: "IRIS".to_string(),
        start: range.start,
        end: range.end,
        wavelength: match obs_type {
            IrisObsType::Sji => wavelength,
            IrisObsType::Raster => None,
        },
        sample_secs: None,
        physobs: Some("intensity".to_string()),
        detector: None,
        level: match obs_type {
            IrisObsType::Raster => Some(2),
            IrisObsType::Sji => None,
        },
    })
}

/// SOHO search: EIT filters by wavelength, LASCO by detector.
pub fn soho_search(
    telescope: SohoTelescope,
    wavelength: Option<u16>,
    detector: Option<LascoDetector>,
    range: TimeRange,
) -> ValidationResult<ArchiveQuery> {
    if telescope == SohoTelescope::Eit {
        if let Some(wl) = wavelength {
            if !SohoTelescope::EIT_WAVELENGTHS.contains(&wl) {
                return Err(ValidationError::InvalidParameter {
                    key: "wavelength".to_string(),
                    value: wl.to_string(),
                    reason: format!("EIT wavelengths are {:?}", SohoTelescope::EIT_WAVELENGTHS),
                });
            }
        }
    }
    Ok(ArchiveQuery::VsoSearch {
        instrument: telescope.to_string(),
        start: range.start,
        end: range.end,
        wavelength: if telescope == SohoTelescope::Eit {
            wavelength
        } else {
            None
        },
        sample_secs: None,
        physobs: None,
        detector: if telescope == SohoTelescope::Lasco {
            detector.map(|d| d.to_string())
        } else {
            None
        },
        level: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn range() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_aia_search_carries_sample_rate() {
        let q = aia_search(304, AiaCadence::TwelveSec, range()).unwrap();
        match q {
            ArchiveQuery::VsoSearch {
                instrument,
                wavelength,
                sample_secs,
                ..
            } => {
                assert_eq!(instrument, "AIA");
                assert_eq!(wavelength, Some(304));
                assert_eq!(sample_secs, Some(12));
            }
            other => panic!("unexpected query: {:?}", other),
        }
    }

    #[test]
    fn test_hmi_search_maps_physobs() {
        match hmi_search(HmiSeries::Ic45s, range()) {
            ArchiveQuery::VsoSearch {
                physobs, sample_secs, ..
            } => {
                assert_eq!(physobs.as_deref(), Some("continuum"));
                assert_eq!(sample_secs, Some(45));
            }
            other => panic!("unexpected query: {:?}", other),
        }
    }

    #[test]
    fn test_iris_raster_requests_level_2() {
        match iris_search(IrisObsType::Raster, None, range()).unwrap() {
            ArchiveQuery::VsoSearch { level, wavelength, .. } => {
                assert_eq!(level, Some(2));
                assert_eq!(wavelength, None);
            }
            other => panic!("unexpected query: {:?}", other),
        }
    }

    #[test]
    fn test_iris_sji_rejects_unknown_wavelength() {
        assert!(iris_search(IrisObsType::Sji, Some(9999), range()).is_err());
        assert!(iris_search(IrisObsType::Sji, Some(1400), range()).is_ok());
    }

    #[test]
    fn test_soho_lasco_detector_passthrough() {
        match soho_search(SohoTelescope::Lasco, None, Some(LascoDetector::C2), range()).unwrap() {
            ArchiveQuery::VsoSearch { detector, .. } => {
                assert_eq!(detector.as_deref(), Some("C2"));
            }
            other => panic!("unexpected query: {:?}", other),
        }
    }

    #[test]
    fn test_soho_eit_wavelength_table() {
        assert!(soho_search(SohoTelescope::Eit, Some(195), None, range()).is_ok());
        assert!(soho_search(SohoTelescope::Eit, Some(666), None, range()).is_err());
    }
}
