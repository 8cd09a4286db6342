use std::sync::Arc;

use chrono::Utc;
use stctl_transfer::{
    TransferJob, TransferJobClient, TransferJobPatch, TransferJobStatus, UpdateTransferJobRequest,
};
use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::error::StctlError;
use crate::spec::build_job;

#[derive(Clone)]
pub struct TransferControl {
    pub(crate) client: Arc<dyn TransferJobClient>,
    pub(crate) project: String,
}

impl TransferControl {
    pub fn new(client: Arc<dyn TransferJobClient>, project: impl Into<String>) -> Self {
        Self {
            client,
            project: project.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub async fn create(&self, config: &TransferConfig) -> Result<TransferJob, StctlError> {
        let job = build_job(config, Utc::now().date_naive());
        let description = job.description.clone();
        debug!(job = ?job, "creating transfer job");
        let created = self
            .client
            .create(job)
            .await
            .map_err(|source| StctlError::Create {
                description,
                source,
            })?;
        info!(name = %created.name, description = %created.description, "transfer job created");
        Ok(created)
    }

    pub async fn disable(&self, name: &str) -> Result<TransferJob, StctlError> {
        let current = self
            .client
            .get(name)
            .await
            .map_err(|source| {
                if source.is_not_found() {
                    warn!(name, "transfer job does not exist");
                }
                StctlError::JobNotFound {
                    name: name.to_string(),
                    source,
                }
            })?;
        let request = disable_request(&self.project, current);
        debug!(name, request = ?request, "disabling transfer job");
        let disabled = self
            .client
            .update(name, request)
            .await
            .map_err(|source| StctlError::Update {
                name: name.to_string(),
                source,
            })?;
        info!(name, "transfer job disabled");
        Ok(disabled)
    }
}

pub fn disable_request(project: &str, current: TransferJob) -> UpdateTransferJobRequest {
    UpdateTransferJobRequest::new(
        project,
        TransferJobPatch {
            description: current.description,
            transfer_spec: current.transfer_spec,
            status: TransferJobStatus::Disabled,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::{disable_request, TransferControl};
    use crate::config::TransferConfig;
    use crate::error::StctlError;
    use chrono::{NaiveTime, Utc};
    use serde_json::json;
    use stctl_transfer::{
        Date, FailingCall, GcsData, InMemoryTransferJobs, RecordedCall, Schedule, TimeOfDay,
        TransferJob, TransferJobStatus, TransferSpec,
    };
    use std::sync::Arc;

    fn control(client: &Arc<InMemoryTransferJobs>) -> TransferControl {
        TransferControl::new(client.clone(), "fake-mlab-testing")
    }

    fn stored_job() -> TransferJob {
        TransferJob {
            name: "job-name".to_string(),
            description: "This is the job description".to_string(),
            status: Some(TransferJobStatus::Enabled),
            schedule: Some(Schedule {
                schedule_start_date: Some(Date {
                    year: 2019,
                    month: 1,
                    day: 1,
                }),
                start_time_of_day: Some(TimeOfDay::default()),
                ..Schedule::default()
            }),
            transfer_spec: Some(TransferSpec {
                gcs_data_source: Some(GcsData::bucket("source")),
                gcs_data_sink: Some(GcsData::bucket("destination")),
                ..TransferSpec::default()
            }),
            ..TransferJob::default()
        }
    }

    #[tokio::test]
    async fn create_returns_named_enabled_job() {
        let client = Arc::new(InMemoryTransferJobs::default());
        let config = TransferConfig {
            prefixes: vec!["ndt".to_string()],
            ..TransferConfig::new(
                "fake-mlab-testing",
                "src-bucket",
                "dest-bucket",
                NaiveTime::from_hms_opt(2, 10, 0).expect("time"),
            )
        };

        let job = control(&client).create(&config).await.expect("create");

        assert_eq!(job.name, "transferJobs/fake-1");
        assert_eq!(job.description, "STCTL: transfer src-bucket -> dest-bucket at 02:10:00");
        assert_eq!(job.status, Some(TransferJobStatus::Enabled));
        let schedule = job.schedule.expect("schedule");
        assert_eq!(
            schedule.schedule_start_date,
            Some(Date::from(Utc::now().date_naive()))
        );
        assert!(schedule.schedule_end_date.is_none());
        assert_eq!(
            job.transfer_spec.expect("spec").include_prefixes(),
            ["ndt".to_string()]
        );
    }

    #[tokio::test]
    async fn create_failure_is_reported() {
        let client = Arc::new(
            InMemoryTransferJobs::default().failing(FailingCall::Create, 500, "Fake create error"),
        );
        let config = TransferConfig::new(
            "fake-mlab-testing",
            "src-bucket",
            "dest-bucket",
            NaiveTime::from_hms_opt(2, 10, 0).expect("time"),
        );
        let err = control(&client).create(&config).await.expect_err("create fails");
        assert!(matches!(err, StctlError::Create { .. }));
        assert!(client.stored_jobs().is_empty());
    }

    #[tokio::test]
    async fn disable_marks_job_disabled_and_keeps_spec() {
        let client = Arc::new(InMemoryTransferJobs::new(vec![stored_job()]));

        let job = control(&client).disable("job-name").await.expect("disable");

        assert_eq!(job.status, Some(TransferJobStatus::Disabled));
        assert_eq!(job.description, "This is the job description");
        assert_eq!(job.transfer_spec, stored_job().transfer_spec);
        assert_eq!(job.schedule, stored_job().schedule);
        assert!(client.enabled_jobs().is_empty());
    }

    #[tokio::test]
    async fn disable_payload_has_no_schedule() {
        let client = Arc::new(InMemoryTransferJobs::new(vec![stored_job()]));
        control(&client).disable("job-name").await.expect("disable");

        let request = client
            .calls()
            .into_iter()
            .find_map(|call| match call {
                RecordedCall::Update(_, request) => Some(request),
                _ => None,
            })
            .expect("update call");
        let payload = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            payload["transferJob"],
            json!({
                "description": "This is the job description",
                "transferSpec": {
                    "gcsDataSource": {"bucketName": "source"},
                    "gcsDataSink": {"bucketName": "destination"}
                },
                "status": "DISABLED"
            })
        );
        assert!(payload["transferJob"].get("schedule").is_none());
        assert_eq!(payload["projectId"], "fake-mlab-testing");
    }

    #[tokio::test]
    async fn disable_reports_missing_job() {
        let client = Arc::new(
            InMemoryTransferJobs::default().failing(FailingCall::Get, 404, "Fake error calling Get"),
        );
        let err = control(&client).disable("job-name").await.expect_err("get fails");
        assert!(matches!(err, StctlError::JobNotFound { name, .. } if name == "job-name"));
        assert!(client.writes().is_empty());
    }

    #[tokio::test]
    async fn disable_distinguishes_absent_job_from_fetch_failure() {
        let empty = Arc::new(InMemoryTransferJobs::default());
        let err = control(&empty).disable("job-name").await.expect_err("absent");
        assert!(err.is_not_found());

        let broken = Arc::new(
            InMemoryTransferJobs::new(vec![stored_job()]).failing(FailingCall::Get, 500, "backend"),
        );
        let err = control(&broken).disable("job-name").await.expect_err("get fails");
        assert!(matches!(err, StctlError::JobNotFound { .. }));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn disable_reports_update_failure() {
        let client = Arc::new(
            InMemoryTransferJobs::new(vec![stored_job()])
                .failing(FailingCall::Update, 400, "Fake error calling Update"),
        );
        let err = control(&client).disable("job-name").await.expect_err("update fails");
        assert!(matches!(err, StctlError::Update { .. }));
        assert_eq!(client.enabled_jobs().len(), 1);
    }

    #[tokio::test]
    async fn disable_sends_unmodelled_spec_fields_back_unchanged() {
        let spec = json!({
            "gcsDataSource": {"bucketName": "src", "path": "ndt/"},
            "gcsDataSink": {"bucketName": "dst"},
            "objectConditions": {
                "includePrefixes": ["ndt"],
                "lastModifiedSince": "2019-01-01T00:00:00Z"
            },
            "transferOptions": {
                "deleteObjectsFromSourceAfterTransfer": true,
                "metadataOptions": {"storageClass": "STORAGE_CLASS_PRESERVE"}
            },
            "transferManifest": {"location": "gs://manifests/list.csv"}
        });
        let stored: TransferJob = serde_json::from_value(json!({
            "name": "job-name",
            "description": "rich job",
            "status": "ENABLED",
            "transferSpec": spec.clone()
        }))
        .expect("decode job");
        let client = Arc::new(InMemoryTransferJobs::new(vec![stored]));

        control(&client).disable("job-name").await.expect("disable");

        let request = client
            .calls()
            .into_iter()
            .find_map(|call| match call {
                RecordedCall::Update(_, request) => Some(request),
                _ => None,
            })
            .expect("update call");
        let payload = serde_json::to_value(&request).expect("serialize");
        assert_eq!(payload["transferJob"]["transferSpec"], spec);
    }

    #[test]
    fn disable_request_copies_description_and_spec() {
        let request = disable_request("fake-mlab-testing", stored_job());
        assert_eq!(request.transfer_job.description, "This is the job description");
        assert_eq!(request.transfer_job.transfer_spec, stored_job().transfer_spec);
        assert_eq!(request.transfer_job.status, TransferJobStatus::Disabled);
        assert_eq!(request.update_transfer_job_field_mask, "description,transfer_spec,status");
    }
}
