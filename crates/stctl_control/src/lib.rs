pub mod config;
pub mod control;
pub mod duration;
pub mod error;
pub mod listing;
pub mod matcher;
pub mod reconcile;
pub mod spec;

pub use config::{
    parse_time_of_day, ApiSettings, StctlFile, TransferConfig, TransferSettings,
    TIME_OF_DAY_FORMAT,
};
pub use control::{disable_request, TransferControl};
pub use duration::{format_api_seconds, format_elapsed, parse_duration, DurationError};
pub use error::StctlError;
pub use listing::{job_line, operation_line, parse_operation_metadata, Counters, OperationMetadata};
pub use matcher::spec_matches;
pub use reconcile::{is_managed, FindOutcome, SyncOutcome};
pub use spec::{build_description, build_job, build_spec};
