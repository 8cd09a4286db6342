use std::collections::BTreeSet;
use std::time::Duration;

use stctl_transfer::{Schedule, TransferJob, TransferSpec};
use tracing::debug;

use crate::config::TransferConfig;
use crate::duration::parse_duration;

pub fn spec_matches(desired: &TransferConfig, job: &TransferJob) -> bool {
    let default_schedule = Schedule::default();
    let schedule = job.schedule.as_ref().unwrap_or(&default_schedule);
    let default_spec = TransferSpec::default();
    let spec = job.transfer_spec.as_ref().unwrap_or(&default_spec);

    start_time_matches(desired, schedule)
        && interval_matches(desired, schedule)
        && conditions_match(desired, spec)
        && delete_option_matches(desired, spec)
}

pub fn start_time_matches(desired: &TransferConfig, schedule: &Schedule) -> bool {
    let wanted = desired.start_time_label();
    match &schedule.start_time_of_day {
        Some(time) if time.to_string() == wanted => true,
        scheduled => {
            debug!(?scheduled, %wanted, "spec: start times differ");
            false
        }
    }
}

pub fn interval_matches(desired: &TransferConfig, schedule: &Schedule) -> bool {
    if schedule.repeat_interval == desired.interval() {
        return true;
    }
    debug!(
        scheduled = %schedule.repeat_interval,
        wanted = %desired.interval(),
        "spec: repeat intervals differ"
    );
    false
}

pub fn conditions_match(desired: &TransferConfig, spec: &TransferSpec) -> bool {
    let matches = match &spec.object_conditions {
        None => {
            desired.prefixes.is_empty()
                && desired.min_file_age.is_zero()
                && desired.max_file_age.is_zero()
        }
        Some(conditions) => {
            prefixes_equal(&conditions.include_prefixes, &desired.prefixes)
                && age_matches(
                    desired.max_file_age,
                    conditions.max_time_elapsed_since_last_modification.as_deref(),
                )
                && age_matches(
                    desired.min_file_age,
                    conditions.min_time_elapsed_since_last_modification.as_deref(),
                )
        }
    };
    if !matches {
        debug!(
            conditions = ?spec.object_conditions,
            prefixes = ?desired.prefixes,
            max_file_age = ?desired.max_file_age,
            min_file_age = ?desired.min_file_age,
            "spec: object conditions differ"
        );
    }
    matches
}

pub fn delete_option_matches(desired: &TransferConfig, spec: &TransferSpec) -> bool {
    let configured = spec
        .transfer_options
        .as_ref()
        .is_some_and(|options| options.delete_objects_from_source_after_transfer);
    if configured == desired.delete_after_transfer {
        return true;
    }
    debug!(
        configured,
        wanted = desired.delete_after_transfer,
        "spec: delete after transfer differs"
    );
    false
}

pub fn prefixes_equal(configured: &[String], desired: &[String]) -> bool {
    let configured: BTreeSet<&str> = configured.iter().map(String::as_str).collect();
    let desired: BTreeSet<&str> = desired.iter().map(String::as_str).collect();
    configured == desired
}

/// An elapsed-time string that fails to parse counts as zero.
pub fn age_matches(age: Duration, elapsed: Option<&str>) -> bool {
    let configured = elapsed
        .and_then(|raw| parse_duration(raw).ok())
        .unwrap_or(Duration::ZERO);
    configured == age
}
