use futures::TryStreamExt;
use stctl_transfer::TransferJob;
use tracing::debug;

use crate::config::TransferConfig;
use crate::control::TransferControl;
use crate::error::StctlError;
use crate::matcher::spec_matches;
use crate::spec::build_description;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindOutcome {
    Found(TransferJob),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created(TransferJob),
    Unchanged(TransferJob),
    Replaced {
        disabled: TransferJob,
        created: TransferJob,
    },
}

impl SyncOutcome {
    pub fn job(&self) -> &TransferJob {
        match self {
            Self::Created(job) | Self::Unchanged(job) => job,
            Self::Replaced { created, .. } => created,
        }
    }

    pub fn into_job(self) -> TransferJob {
        match self {
            Self::Created(job) | Self::Unchanged(job) => job,
            Self::Replaced { created, .. } => created,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Unchanged(_) => "unchanged",
            Self::Replaced { .. } => "replaced",
        }
    }
}

/// Jobs with an end date are one-shot transfers and never reconciled.
pub fn is_managed(job: &TransferJob) -> bool {
    job.schedule
        .as_ref()
        .is_some_and(|schedule| schedule.schedule_end_date.is_none())
}

impl TransferControl {
    pub async fn find(&self, config: &TransferConfig) -> Result<FindOutcome, StctlError> {
        let description = build_description(config);
        debug!(%description, "listing jobs");
        let mut pages = self.client.jobs();
        while let Some(page) = pages.try_next().await.map_err(StctlError::List)? {
            for job in page.transfer_jobs {
                if !is_managed(&job) {
                    continue;
                }
                debug!(name = %job.name, description = %job.description, "managed job");
                // Descriptions are unique among managed jobs, so the first
                // match is the only one.
                if job.description == description {
                    return Ok(FindOutcome::Found(job));
                }
            }
        }
        Ok(FindOutcome::NotFound)
    }

    pub async fn sync(&self, config: &TransferConfig) -> Result<SyncOutcome, StctlError> {
        let found = match self.find(config).await? {
            FindOutcome::NotFound => {
                debug!("no managed job found");
                return self.create(config).await.map(SyncOutcome::Created);
            }
            FindOutcome::Found(job) => job,
        };

        debug!(name = %found.name, "found managed job");
        if spec_matches(config, &found) {
            debug!(name = %found.name, "specs match");
            return Ok(SyncOutcome::Unchanged(found));
        }

        let disabled = self.disable(&found.name).await?;
        let created = self.create(config).await?;
        Ok(SyncOutcome::Replaced { disabled, created })
    }
}
