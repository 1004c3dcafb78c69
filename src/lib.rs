//! actiTIME Batch Library
//!
//! This library parses `.abf` batch files describing credentialed timesheet
//! submissions and feeds the resulting entries into an actiTIME server.

pub mod error;
pub mod helpers;
pub mod models;
pub mod service;

pub use error::{AbfError, DriverError};
pub use service::{BatchSubmitService, SubmitConfig, SubmitReport};

// Re-export key types for convenience
pub use helpers::abf::{AbfParser, ParserOptions, parse_str};
pub use helpers::actitime::{Driver, DriverConfig, TimeTrackWriter};
pub use models::abf::{BatchEntry, TimesheetRow};
pub use models::actitime::{TimeTrackWrite, UserIdentity};
