use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferJobStatus {
    Enabled,
    Disabled,
    Deleted,
    #[serde(rename = "STATUS_UNSPECIFIED", other)]
    Unspecified,
}

impl fmt::Display for TransferJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
            Self::Deleted => "DELETED",
            Self::Unspecified => "STATUS_UNSPECIFIED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferJob {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_spec: Option<TransferSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TransferJobStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_start_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_end_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_of_day: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repeat_interval: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Date {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeOfDay {
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub seconds: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub nanos: u32,
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcs_data_source: Option<GcsData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcs_data_sink: Option<GcsData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_conditions: Option<ObjectConditions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_options: Option<TransferOptions>,
    /// Spec fields this crate does not model. Kept so an update can send the
    /// fetched spec back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransferSpec {
    pub fn source_bucket(&self) -> Option<&str> {
        self.gcs_data_source.as_ref().map(|data| data.bucket_name.as_str())
    }

    pub fn sink_bucket(&self) -> Option<&str> {
        self.gcs_data_sink.as_ref().map(|data| data.bucket_name.as_str())
    }

    pub fn include_prefixes(&self) -> &[String] {
        self.object_conditions
            .as_ref()
            .map(|cond| cond.include_prefixes.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GcsData {
    #[serde(default)]
    pub bucket_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GcsData {
    pub fn bucket(name: impl Into<String>) -> Self {
        Self {
            bucket_name: name.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectConditions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_prefixes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_prefixes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_time_elapsed_since_last_modification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_elapsed_since_last_modification: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferOptions {
    #[serde(default, skip_serializing_if = "is_false")]
    pub overwrite_objects_already_existing_in_sink: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub delete_objects_unique_in_sink: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub delete_objects_from_source_after_transfer: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The only job fields the service accepts in an update. Schedule changes are
/// rejected remotely, so this type has no way to carry one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferJobPatch {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_spec: Option<TransferSpec>,
    pub status: TransferJobStatus,
}

pub const PATCH_FIELD_MASK: &str = "description,transfer_spec,status";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransferJobRequest {
    pub project_id: String,
    pub transfer_job: TransferJobPatch,
    pub update_transfer_job_field_mask: String,
}

impl UpdateTransferJobRequest {
    pub fn new(project_id: impl Into<String>, transfer_job: TransferJobPatch) -> Self {
        Self {
            project_id: project_id.into(),
            transfer_job,
            update_transfer_job_field_mask: PATCH_FIELD_MASK.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub done: bool,
}

pub trait Paged {
    fn next_page_token(&self) -> Option<&str>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferJobsPage {
    #[serde(default)]
    pub transfer_jobs: Vec<TransferJob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl Paged for TransferJobsPage {
    fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationsPage {
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl Paged for OperationsPage {
    fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|token| !token.is_empty())
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}
