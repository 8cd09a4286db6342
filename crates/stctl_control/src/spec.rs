use chrono::{NaiveDate, NaiveTime, Timelike};
use stctl_transfer::{
    GcsData, ObjectConditions, Schedule, TimeOfDay, TransferJob, TransferJobStatus,
    TransferOptions, TransferSpec,
};

use crate::config::TransferConfig;
use crate::duration::format_api_seconds;

/// Existing jobs are located by exact equality with this string. Changing the
/// format orphans every job created before the change.
pub fn build_description(config: &TransferConfig) -> String {
    format!(
        "STCTL: transfer {} -> {} at {}",
        config.source_bucket,
        config.target_bucket,
        config.start_time_label()
    )
}

pub fn build_spec(config: &TransferConfig) -> TransferSpec {
    let mut conditions = ObjectConditions::default();
    let mut has_conditions = false;
    if !config.prefixes.is_empty() {
        conditions.include_prefixes = config.prefixes.clone();
        has_conditions = true;
    }
    if !config.max_file_age.is_zero() {
        conditions.max_time_elapsed_since_last_modification =
            Some(format_api_seconds(config.max_file_age));
        has_conditions = true;
    }
    if !config.min_file_age.is_zero() {
        conditions.min_time_elapsed_since_last_modification =
            Some(format_api_seconds(config.min_file_age));
        has_conditions = true;
    }

    TransferSpec {
        gcs_data_source: Some(GcsData::bucket(&config.source_bucket)),
        gcs_data_sink: Some(GcsData::bucket(&config.target_bucket)),
        object_conditions: has_conditions.then_some(conditions),
        transfer_options: config.delete_after_transfer.then(|| TransferOptions {
            delete_objects_from_source_after_transfer: true,
            ..TransferOptions::default()
        }),
        ..TransferSpec::default()
    }
}

pub fn time_of_day(time: NaiveTime) -> TimeOfDay {
    TimeOfDay {
        hours: time.hour(),
        minutes: time.minute(),
        seconds: time.second(),
        nanos: 0,
    }
}

pub fn build_job(config: &TransferConfig, today: NaiveDate) -> TransferJob {
    TransferJob {
        name: String::new(),
        description: build_description(config),
        project_id: config.project.clone(),
        schedule: Some(Schedule {
            schedule_start_date: Some(today.into()),
            schedule_end_date: None,
            start_time_of_day: Some(time_of_day(config.start_time)),
            repeat_interval: config.interval().to_string(),
        }),
        transfer_spec: Some(build_spec(config)),
        status: Some(TransferJobStatus::Enabled),
    }
}
