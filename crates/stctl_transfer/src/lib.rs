pub mod client;
pub mod memory;
pub mod model;
pub mod rest;

pub use client::{paginate, ClientError, PageStream, TransferJobClient};
pub use memory::{FailingCall, InMemoryTransferJobs, RecordedCall};
pub use model::{
    Date, GcsData, ObjectConditions, Operation, OperationsPage, Paged, Schedule, TimeOfDay,
    TransferJob, TransferJobPatch, TransferJobStatus, TransferJobsPage, TransferOptions,
    TransferSpec, UpdateTransferJobRequest, PATCH_FIELD_MASK,
};
pub use rest::{RestConfig, RestTransferJobs, DEFAULT_ENDPOINT};
