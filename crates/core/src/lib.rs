//! Core types for the heliodata retrieval subsystem
//!
//! This crate defines the fundamental types shared by every layer:
//! - [`InstrumentId`]: the closed set of supported observatory instruments
//! - [`RetrievalRequest`]: an immutable, fingerprintable download request
//! - [`RecordDescriptor`]: one addressable remote file in a request's result set
//! - [`Fingerprint`]: the deterministic cache key derived from a request
//!   or a single record

pub mod error;
pub mod fingerprint;
pub mod record;
pub mod request;
pub mod types;

pub use error::{ValidationError, ValidationResult};
pub use fingerprint::Fingerprint;
pub use record::{RecordDescriptor, RecordId};
pub use request::{RetrievalRequest, TimeRange};
pub use types::{
    AiaCadence, HmiSeries, InstrumentId, IrisObsType, LascoDetector, SohoTelescope,
};
