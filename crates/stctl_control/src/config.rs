use std::path::Path;
use std::time::Duration;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::duration::{parse_duration, truncate_to_seconds};
use crate::error::StctlError;

pub const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub project: String,
    pub source_bucket: String,
    pub target_bucket: String,
    pub prefixes: Vec<String>,
    pub start_time: NaiveTime,
    pub interval: Option<String>,
    pub min_file_age: Duration,
    pub max_file_age: Duration,
    pub delete_after_transfer: bool,
}

impl TransferConfig {
    pub fn new(
        project: impl Into<String>,
        source_bucket: impl Into<String>,
        target_bucket: impl Into<String>,
        start_time: NaiveTime,
    ) -> Self {
        Self {
            project: project.into(),
            source_bucket: source_bucket.into(),
            target_bucket: target_bucket.into(),
            prefixes: Vec::new(),
            start_time,
            interval: None,
            min_file_age: Duration::ZERO,
            max_file_age: Duration::ZERO,
            delete_after_transfer: false,
        }
    }

    pub fn start_time_label(&self) -> String {
        self.start_time.format(TIME_OF_DAY_FORMAT).to_string()
    }

    pub fn interval(&self) -> &str {
        self.interval.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StctlFile {
    pub project_id: Option<String>,
    pub api: ApiSettings,
    pub transfer: TransferSettings,
}

impl StctlFile {
    pub fn load(path: &Path) -> Result<Self, StctlError> {
        let source = std::fs::read_to_string(path).map_err(|err| {
            StctlError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::parse(&source)
            .map_err(|err| StctlError::Config(format!("{}: {err}", path.display())))
    }

    pub fn parse(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSettings {
    pub endpoint: Option<String>,
    pub access_token: Option<String>,
    pub timeout: Option<String>,
}

impl ApiSettings {
    pub fn overlay(self, other: ApiSettings) -> Self {
        Self {
            endpoint: other.endpoint.or(self.endpoint),
            access_token: other.access_token.or(self.access_token),
            timeout: other.timeout.or(self.timeout),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TransferSettings {
    pub source: Option<String>,
    pub target: Option<String>,
    pub include: Vec<String>,
    pub time: Option<String>,
    pub interval: Option<String>,
    pub min_file_age: Option<String>,
    pub max_file_age: Option<String>,
    pub delete_after_transfer: Option<bool>,
}

impl TransferSettings {
    pub fn overlay(self, other: TransferSettings) -> Self {
        Self {
            source: other.source.or(self.source),
            target: other.target.or(self.target),
            include: if other.include.is_empty() {
                self.include
            } else {
                other.include
            },
            time: other.time.or(self.time),
            interval: other.interval.or(self.interval),
            min_file_age: other.min_file_age.or(self.min_file_age),
            max_file_age: other.max_file_age.or(self.max_file_age),
            delete_after_transfer: other.delete_after_transfer.or(self.delete_after_transfer),
        }
    }

    pub fn resolve(self, project: &str) -> Result<TransferConfig, StctlError> {
        let project = require("project id", Some(project.to_string()))?;
        let source_bucket = require("source bucket", self.source)?;
        let target_bucket = require("target bucket", self.target)?;
        let start_time = match self.time.as_deref().map(str::trim) {
            None | Some("") => NaiveTime::MIN,
            Some(raw) => parse_time_of_day(raw)?,
        };
        let prefixes = self
            .include
            .into_iter()
            .map(|prefix| prefix.trim().to_string())
            .filter(|prefix| !prefix.is_empty())
            .collect();

        Ok(TransferConfig {
            project,
            source_bucket,
            target_bucket,
            prefixes,
            start_time,
            interval: self.interval.filter(|interval| !interval.trim().is_empty()),
            min_file_age: parse_age("min file age", self.min_file_age.as_deref())?,
            max_file_age: parse_age("max file age", self.max_file_age.as_deref())?,
            delete_after_transfer: self.delete_after_transfer.unwrap_or(false),
        })
    }
}

pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, StctlError> {
    NaiveTime::parse_from_str(raw, TIME_OF_DAY_FORMAT)
        .map_err(|err| StctlError::Config(format!("invalid start time {raw:?} (want HH:MM:SS): {err}")))
}

fn parse_age(field: &'static str, raw: Option<&str>) -> Result<Duration, StctlError> {
    match raw {
        None => Ok(Duration::ZERO),
        Some(raw) => parse_duration(raw)
            .map(truncate_to_seconds)
            .map_err(|source| StctlError::Duration { field, source }),
    }
}

fn require(field: &str, value: Option<String>) -> Result<String, StctlError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(StctlError::Config(format!("{field} is required"))),
    }
}
