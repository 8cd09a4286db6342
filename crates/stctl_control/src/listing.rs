use std::io::Write;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use stctl_transfer::{Operation, TransferJob, TransferSpec};
use tracing::debug;

use crate::control::TransferControl;
use crate::duration::format_elapsed;
use crate::error::StctlError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    #[serde(default)]
    pub transfer_spec: Option<TransferSpec>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub counters: Counters,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    #[serde(default)]
    pub objects_found_from_source: Option<String>,
    #[serde(default)]
    pub objects_copied_to_sink: Option<String>,
    #[serde(default)]
    pub objects_from_source_skipped_by_sync: Option<String>,
    #[serde(default)]
    pub objects_from_source_failed: Option<String>,
}

pub fn parse_operation_metadata(operation: &Operation) -> Result<OperationMetadata, StctlError> {
    match &operation.metadata {
        None => Ok(OperationMetadata::default()),
        Some(metadata) => serde_json::from_value(metadata.clone()).map_err(|source| {
            StctlError::Metadata {
                name: operation.name.clone(),
                source,
            }
        }),
    }
}

impl TransferControl {
    pub async fn list_jobs<W: Write + Send>(&self, out: &mut W) -> Result<usize, StctlError> {
        let mut written = 0;
        let mut pages = self.client.jobs();
        while let Some(page) = pages.try_next().await.map_err(StctlError::List)? {
            for job in &page.transfer_jobs {
                writeln!(out, "{}", job_line(job))?;
                written += 1;
            }
        }
        Ok(written)
    }

    pub async fn list_operations<W: Write + Send>(
        &self,
        name: &str,
        after: Option<DateTime<Utc>>,
        out: &mut W,
    ) -> Result<usize, StctlError> {
        let mut written = 0;
        let mut pages = self.client.operations(name);
        while let Some(page) = pages
            .try_next()
            .await
            .map_err(|source| StctlError::ListOperations {
                name: name.to_string(),
                source,
            })?
        {
            for operation in &page.operations {
                let metadata = parse_operation_metadata(operation)?;
                if let Some(after) = after {
                    if metadata.start_time.map_or(true, |start| start < after) {
                        debug!(operation = %operation.name, "skipping operation started before cutoff");
                        continue;
                    }
                }
                let Some(line) = operation_line(&operation.name, &metadata) else {
                    debug!(operation = %operation.name, "skipping operation without transfer spec");
                    continue;
                };
                writeln!(out, "{line}")?;
                written += 1;
            }
        }
        Ok(written)
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|value| !value.is_empty()).unwrap_or("-")
}

fn route(spec: Option<&TransferSpec>) -> String {
    format!(
        "{} -> {}",
        or_dash(spec.and_then(TransferSpec::source_bucket)),
        or_dash(spec.and_then(TransferSpec::sink_bucket))
    )
}

fn prefixes(spec: Option<&TransferSpec>) -> String {
    let prefixes = spec.map(TransferSpec::include_prefixes).unwrap_or_default();
    if prefixes.is_empty() {
        "-".to_string()
    } else {
        prefixes.join(",")
    }
}

pub fn job_line(job: &TransferJob) -> String {
    let status = job
        .status
        .map(|status| status.to_string())
        .unwrap_or_else(|| "-".to_string());
    let start = job
        .schedule
        .as_ref()
        .and_then(|schedule| schedule.start_time_of_day)
        .map(|time| time.to_string())
        .unwrap_or_else(|| "-".to_string());
    let spec = job.transfer_spec.as_ref();
    [
        job.name.clone(),
        status,
        start,
        route(spec),
        prefixes(spec),
        job.description.clone(),
    ]
    .join("\t")
}

pub fn operation_line(name: &str, metadata: &OperationMetadata) -> Option<String> {
    let spec = metadata.transfer_spec.as_ref()?;
    let start = metadata
        .start_time
        .map(|start| start.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    let elapsed = match (metadata.start_time, metadata.end_time) {
        (Some(start), Some(end)) => (end - start)
            .to_std()
            .map(format_elapsed)
            .unwrap_or_else(|_| "-".to_string()),
        _ => "-".to_string(),
    };
    let counters = &metadata.counters;
    let count = |value: &Option<String>| value.clone().unwrap_or_else(|| "0".to_string());
    Some(
        [
            name.to_string(),
            start,
            elapsed,
            or_dash(Some(metadata.status.as_str())).to_string(),
            route(Some(spec)),
            format!("found={}", count(&counters.objects_found_from_source)),
            format!("copied={}", count(&counters.objects_copied_to_sink)),
            format!("skipped={}", count(&counters.objects_from_source_skipped_by_sync)),
            format!("failed={}", count(&counters.objects_from_source_failed)),
            prefixes(Some(spec)),
        ]
        .join("\t"),
    )
}

#[cfg(test)]
mod tests {
    use super::{job_line, operation_line, parse_operation_metadata};
    use crate::control::TransferControl;
    use crate::error::StctlError;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use stctl_transfer::{
        FailingCall, InMemoryTransferJobs, ObjectConditions, Operation, Schedule, TimeOfDay,
        TransferJob, TransferJobStatus, TransferSpec,
    };
    use std::sync::Arc;

    fn operation(name: &str, metadata: Value) -> Operation {
        Operation {
            name: name.to_string(),
            metadata: Some(metadata),
            done: true,
        }
    }

    fn transfer_metadata(start: &str, end: &str) -> Value {
        json!({
            "transferSpec": {
                "gcsDataSource": {"bucketName": "mlab-fake-source"},
                "gcsDataSink": {"bucketName": "mlab-fake-target"},
                "objectConditions": {"includePrefixes": ["ndt"]}
            },
            "startTime": start,
            "endTime": end,
            "status": "SUCCESS",
            "counters": {
                "objectsFoundFromSource": "10",
                "objectsCopiedToSink": "9",
                "objectsFromSourceFailed": "1"
            }
        })
    }

    fn control(client: InMemoryTransferJobs) -> TransferControl {
        TransferControl::new(Arc::new(client), "fake-mlab-testing")
    }

    #[tokio::test]
    async fn list_jobs_writes_one_line_per_job() {
        let control = control(
            InMemoryTransferJobs::new(vec![TransferJob {
                name: "transferJobs/1234567890".to_string(),
                description: "description".to_string(),
                status: Some(TransferJobStatus::Enabled),
                schedule: Some(Schedule {
                    start_time_of_day: Some(TimeOfDay {
                        hours: 10,
                        minutes: 9,
                        ..TimeOfDay::default()
                    }),
                    ..Schedule::default()
                }),
                transfer_spec: Some(TransferSpec {
                    object_conditions: Some(ObjectConditions {
                        include_prefixes: vec!["a".to_string(), "b".to_string()],
                        ..ObjectConditions::default()
                    }),
                    ..TransferSpec::default()
                }),
                ..TransferJob::default()
            }])
            .with_page_size(1),
        );
        let mut output = Vec::new();

        let written = control.list_jobs(&mut output).await.expect("list");

        assert_eq!(written, 1);
        let text = String::from_utf8(output).expect("utf8");
        assert_eq!(
            text,
            "transferJobs/1234567890\tENABLED\t10:09:00\t- -> -\ta,b\tdescription\n"
        );
    }

    #[tokio::test]
    async fn list_jobs_propagates_list_failure() {
        let control = control(
            InMemoryTransferJobs::default().failing(FailingCall::JobsPage(0), 500, "boom"),
        );
        let mut output = Vec::new();
        let err = control.list_jobs(&mut output).await.expect_err("list fails");
        assert!(matches!(err, StctlError::List(_)));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn list_operations_filters_by_date_and_spec() {
        let control = control(InMemoryTransferJobs::default().with_operations(
            "transferJobs/1",
            vec![
                operation(
                    "transferOperations/1234567890",
                    transfer_metadata("2019-01-01T00:00:00Z", "2019-01-01T01:00:00Z"),
                ),
                operation(
                    "transferOperations/afterdate-excludes-operation-dates",
                    transfer_metadata("2018-01-01T00:00:00Z", "2018-01-01T01:00:00Z"),
                ),
                operation(
                    "transferOperations/missing-transferspec",
                    json!({
                        "startTime": "2019-02-01T00:00:00Z",
                        "endTime": "2019-02-01T01:00:00Z"
                    }),
                ),
            ],
        ));
        let after = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).single();
        let mut output = Vec::new();

        let written = control
            .list_operations("transferJobs/1", after, &mut output)
            .await
            .expect("list operations");

        assert_eq!(written, 1);
        let text = String::from_utf8(output).expect("utf8");
        assert_eq!(
            text,
            "transferOperations/1234567890\t2019-01-01T00:00:00+00:00\t1h0m0s\tSUCCESS\t\
             mlab-fake-source -> mlab-fake-target\tfound=10\tcopied=9\tskipped=0\tfailed=1\tndt\n"
        );
    }

    #[tokio::test]
    async fn list_operations_without_cutoff_keeps_old_operations() {
        let control = control(InMemoryTransferJobs::default().with_operations(
            "transferJobs/1",
            vec![operation(
                "transferOperations/old",
                transfer_metadata("2018-01-01T00:00:00Z", "2018-01-01T01:00:00Z"),
            )],
        ));
        let mut output = Vec::new();
        let written = control
            .list_operations("transferJobs/1", None, &mut output)
            .await
            .expect("list operations");
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn list_operations_rejects_malformed_metadata() {
        let control = control(InMemoryTransferJobs::default().with_operations(
            "transferJobs/1",
            vec![operation("transferOperations/bad", json!({"startTime": 42}))],
        ));
        let mut output = Vec::new();
        let err = control
            .list_operations("transferJobs/1", None, &mut output)
            .await
            .expect_err("bad metadata");
        assert!(matches!(err, StctlError::Metadata { name, .. } if name == "transferOperations/bad"));
    }

    #[tokio::test]
    async fn list_operations_propagates_list_failure() {
        let control = control(
            InMemoryTransferJobs::default().failing(FailingCall::OperationsPage(0), 500, "boom"),
        );
        let mut output = Vec::new();
        let err = control
            .list_operations("transferJobs/1", None, &mut output)
            .await
            .expect_err("list fails");
        assert!(matches!(err, StctlError::ListOperations { name, .. } if name == "transferJobs/1"));
    }

    #[test]
    fn metadata_defaults_when_absent() {
        let metadata = parse_operation_metadata(&Operation {
            name: "transferOperations/empty".to_string(),
            metadata: None,
            done: false,
        })
        .expect("metadata");
        assert!(metadata.transfer_spec.is_none());
        assert_eq!(operation_line("transferOperations/empty", &metadata), None);
    }

    #[test]
    fn job_line_marks_missing_fields() {
        let line = job_line(&TransferJob {
            name: "transferJobs/bare".to_string(),
            ..TransferJob::default()
        });
        assert_eq!(line, "transferJobs/bare\t-\t-\t- -> -\t-\t");
    }
}
