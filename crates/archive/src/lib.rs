//! Archive query adaptation
//!
//! This crate translates a normalized [`RetrievalRequest`] into one of
//! several backend-specific queries and resolves it into an ordered record
//! set:
//!
//! - [`jsoc`]: DRMS export commands for SDO/AIA and SDO/HMI (account-aware)
//! - [`vso`]: Fido-style searches for AIA, HMI, IRIS, and SOHO
//! - [`learmonth`]: daily SRS files from the Learmonth radio spectrograph
//!
//! The concrete wire protocols stay behind the [`ArchiveBackend`] trait;
//! this crate owns query construction, parameter validation, backend
//! selection, and result ordering, and never touches the filesystem.
//!
//! [`RetrievalRequest`]: helio_core::RetrievalRequest

pub mod adapter;
pub mod backend;
pub mod error;
pub mod jsoc;
pub mod learmonth;
pub mod vso;

pub use adapter::{ArchiveAdapter, ResolvedRequest};
pub use backend::{ArchiveBackend, ArchiveQuery, BackendKind};
pub use error::{ArchiveError, ArchiveResult, BackendError, FetchError};
