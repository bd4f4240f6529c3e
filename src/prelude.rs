//! Convenience re-exports for typical callers

pub use crate::client::{Helio, HelioBuilder};
pub use crate::config::{HelioConfig, RetryConfig};
pub use crate::error::{Error, Result};

pub use helio_cache::{CacheUsage, EvictionOrder, RetentionPolicy};
pub use helio_core::{
    AiaCadence, Fingerprint, HmiSeries, InstrumentId, IrisObsType, LascoDetector,
    RetrievalRequest, SohoTelescope, TimeRange,
};
pub use helio_tasks::{Submission, TaskEvent, TaskHandle, TaskOutcome, TaskState, TaskStatus};
