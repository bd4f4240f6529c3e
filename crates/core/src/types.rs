//! Instrument vocabulary
//!
//! The supported instruments form a closed set: each archive backend knows
//! the query shape for some subset of these, and the adapter validates
//! instrument-specific parameters against the tables in this module before
//! any network call.
//!
//! The series and wavelength tables mirror what the JSOC/DRMS and VSO
//! archives actually serve:
//! - AIA EUV/UV/visible series keyed by cadence
//! - HMI magnetogram and continuum series
//! - IRIS slit-jaw wavelengths
//! - SOHO EIT wavelengths and LASCO detectors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Identifier for a supported observatory instrument.
///
/// This is the dispatch key for the archive query adapter: each variant has
/// a fixed required-parameter set and a preferred backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentId {
    /// SDO Atmospheric Imaging Assembly (EUV/UV full-disk imagery)
    Aia,
    /// SDO Helioseismic and Magnetic Imager (magnetograms, continuum)
    Hmi,
    /// Interface Region Imaging Spectrograph
    Iris,
    /// Solar and Heliospheric Observatory (EIT, LASCO, MDI)
    Soho,
    /// Learmonth solar radio spectrograph (daily SRS files)
    Learmonth,
}

impl InstrumentId {
    /// Parameter keys that must be present for this instrument.
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            InstrumentId::Aia => &["wavelength", "cadence"],
            InstrumentId::Hmi => &["series"],
            InstrumentId::Iris => &[],
            InstrumentId::Soho => &["telescope"],
            InstrumentId::Learmonth => &[],
        }
    }

    /// All instrument identifiers, in canonical order.
    pub fn all() -> &'static [InstrumentId] {
        &[
            InstrumentId::Aia,
            InstrumentId::Hmi,
            InstrumentId::Iris,
            InstrumentId::Soho,
            InstrumentId::Learmonth,
        ]
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrumentId::Aia => "aia",
            InstrumentId::Hmi => "hmi",
            InstrumentId::Iris => "iris",
            InstrumentId::Soho => "soho",
            InstrumentId::Learmonth => "learmonth",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for InstrumentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aia" => Ok(InstrumentId::Aia),
            "hmi" => Ok(InstrumentId::Hmi),
            "iris" => Ok(InstrumentId::Iris),
            "soho" => Ok(InstrumentId::Soho),
            "learmonth" => Ok(InstrumentId::Learmonth),
            other => Err(ValidationError::UnsupportedInstrument(other.to_string())),
        }
    }
}

/// AIA image cadence, which selects the JSOC series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiaCadence {
    /// 12-second EUV series (`aia.lev1_euv_12s`)
    TwelveSec,
    /// 24-second UV series (`aia.lev1_uv_24s`)
    TwentyFourSec,
    /// 1-hour visible series (`aia.lev1_vis_1h`)
    OneHour,
}

impl AiaCadence {
    /// JSOC series name for this cadence.
    pub fn series(&self) -> &'static str {
        match self {
            AiaCadence::TwelveSec => "aia.lev1_euv_12s",
            AiaCadence::TwentyFourSec => "aia.lev1_uv_24s",
            AiaCadence::OneHour => "aia.lev1_vis_1h",
        }
    }

    /// Cadence token used inside a JSOC export command (e.g. `12s`).
    pub fn token(&self) -> &'static str {
        match self {
            AiaCadence::TwelveSec => "12s",
            AiaCadence::TwentyFourSec => "24s",
            AiaCadence::OneHour => "1h",
        }
    }

    /// Cadence in seconds, for VSO sample queries.
    pub fn seconds(&self) -> u64 {
        match self {
            AiaCadence::TwelveSec => 12,
            AiaCadence::TwentyFourSec => 24,
            AiaCadence::OneHour => 3600,
        }
    }

    /// Wavelengths (in angstroms) available at this cadence.
    pub fn wavelengths(&self) -> &'static [u16] {
        match self {
            AiaCadence::TwelveSec => &[94, 131, 171, 193, 211, 304, 335],
            AiaCadence::TwentyFourSec => &[1600, 1700],
            AiaCadence::OneHour => &[4500],
        }
    }

    /// Check that `wavelength` is served by this cadence.
    pub fn supports_wavelength(&self, wavelength: u16) -> bool {
        self.wavelengths().contains(&wavelength)
    }
}

impl FromStr for AiaCadence {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "12s" => Ok(AiaCadence::TwelveSec),
            "24s" => Ok(AiaCadence::TwentyFourSec),
            "1h" => Ok(AiaCadence::OneHour),
            other => Err(ValidationError::InvalidParameter {
                key: "cadence".to_string(),
                value: other.to_string(),
                reason: "expected one of: 12s, 24s, 1h".to_string(),
            }),
        }
    }
}

impl fmt::Display for AiaCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// HMI data series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HmiSeries {
    /// `hmi.M_45s` vector magnetogram
    M45s,
    /// `hmi.M_720s` vector magnetogram, 12-minute cadence
    M720s,
    /// `hmi.B_45s` line-of-sight magnetogram
    B45s,
    /// `hmi.B_720s` line-of-sight magnetogram, 12-minute cadence
    B720s,
    /// `hmi.Ic_45s` continuum intensity
    Ic45s,
    /// `hmi.Ic_720s` continuum intensity, 12-minute cadence
    Ic720s,
}

impl HmiSeries {
    /// JSOC series name.
    pub fn series(&self) -> &'static str {
        match self {
            HmiSeries::M45s => "hmi.M_45s",
            HmiSeries::M720s => "hmi.M_720s",
            HmiSeries::B45s => "hmi.B_45s",
            HmiSeries::B720s => "hmi.B_720s",
            HmiSeries::Ic45s => "hmi.Ic_45s",
            HmiSeries::Ic720s => "hmi.Ic_720s",
        }
    }

    /// Cadence in seconds (45 or 720 depending on the series).
    pub fn cadence_seconds(&self) -> u64 {
        match self {
            HmiSeries::M45s | HmiSeries::B45s | HmiSeries::Ic45s => 45,
            HmiSeries::M720s | HmiSeries::B720s | HmiSeries::Ic720s => 720,
        }
    }

    /// VSO physical-observable name for this series.
    pub fn physobs(&self) -> &'static str {
        match self {
            HmiSeries::B45s | HmiSeries::B720s => "LOS_magnetic_field",
            HmiSeries::Ic45s | HmiSeries::Ic720s => "continuum",
            HmiSeries::M45s | HmiSeries::M720s => "vector_magnetic_field",
        }
    }
}

impl FromStr for HmiSeries {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "45s" => Ok(HmiSeries::M45s),
            "720s" => Ok(HmiSeries::M720s),
            "B_45s" => Ok(HmiSeries::B45s),
            "B_720s" => Ok(HmiSeries::B720s),
            "Ic_45s" => Ok(HmiSeries::Ic45s),
            "Ic_720s" => Ok(HmiSeries::Ic720s),
            other => Err(ValidationError::InvalidParameter {
                key: "series".to_string(),
                value: other.to_string(),
                reason: "expected one of: 45s, 720s, B_45s, B_720s, Ic_45s, Ic_720s".to_string(),
            }),
        }
    }
}

impl fmt::Display for HmiSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.series())
    }
}

/// IRIS observation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrisObsType {
    /// Slit-jaw images (wavelengths 1330, 1400, 2796, 2832)
    Sji,
    /// Spectrograph raster data (level 2)
    Raster,
}

impl IrisObsType {
    /// Slit-jaw wavelengths served by the archive.
    pub const SJI_WAVELENGTHS: [u16; 4] = [1330, 1400, 2796, 2832];
}

impl FromStr for IrisObsType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sji" => Ok(IrisObsType::Sji),
            "raster" => Ok(IrisObsType::Raster),
            other => Err(ValidationError::InvalidParameter {
                key: "obs_type".to_string(),
                value: other.to_string(),
                reason: "expected SJI or raster".to_string(),
            }),
        }
    }
}

impl fmt::Display for IrisObsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrisObsType::Sji => write!(f, "SJI"),
            IrisObsType::Raster => write!(f, "raster"),
        }
    }
}

/// SOHO telescope selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SohoTelescope {
    /// Extreme ultraviolet Imaging Telescope (wavelengths 171, 195, 284, 304)
    Eit,
    /// Large Angle Spectrometric Coronagraph (detectors C1, C2, C3)
    Lasco,
    /// Michelson Doppler Imager
    Mdi,
}

impl SohoTelescope {
    /// EIT wavelengths served by the archive.
    pub const EIT_WAVELENGTHS: [u16; 4] = [171, 195, 284, 304];
}

impl FromStr for SohoTelescope {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EIT" => Ok(SohoTelescope::Eit),
            "LASCO" => Ok(SohoTelescope::Lasco),
            "MDI" => Ok(SohoTelescope::Mdi),
            other => Err(ValidationError::InvalidParameter {
                key: "telescope".to_string(),
                value: other.to_string(),
                reason: "expected EIT, LASCO, or MDI".to_string(),
            }),
        }
    }
}

impl fmt::Display for SohoTelescope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SohoTelescope::Eit => write!(f, "EIT"),
            SohoTelescope::Lasco => write!(f, "LASCO"),
            SohoTelescope::Mdi => write!(f, "MDI"),
        }
    }
}

/// LASCO coronagraph detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LascoDetector {
    /// C1 detector
    C1,
    /// C2 detector
    C2,
    /// C3 detector
    C3,
}

impl FromStr for LascoDetector {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "C1" => Ok(LascoDetector::C1),
            "C2" => Ok(LascoDetector::C2),
            "C3" => Ok(LascoDetector::C3),
            other => Err(ValidationError::InvalidParameter {
                key: "detector".to_string(),
                value: other.to_string(),
                reason: "expected C1, C2, or C3".to_string(),
            }),
        }
    }
}

impl fmt::Display for LascoDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LascoDetector::C1 => write!(f, "C1"),
            LascoDetector::C2 => write!(f, "C2"),
            LascoDetector::C3 => write!(f, "C3"),
        }
    }
}
