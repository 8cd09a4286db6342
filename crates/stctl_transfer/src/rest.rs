use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::client::{paginate, ClientError, PageStream, TransferJobClient};
use crate::model::{OperationsPage, TransferJob, TransferJobsPage, UpdateTransferJobRequest};

pub const DEFAULT_ENDPOINT: &str = "https://storagetransfer.googleapis.com";
const JOBS_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone)]
pub struct RestConfig {
    pub project: String,
    pub endpoint: String,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

#[derive(Debug)]
pub struct RestTransferJobs {
    http: reqwest::Client,
    project: String,
    endpoint: String,
    token: OnceCell<String>,
}

impl RestTransferJobs {
    pub fn new(config: RestConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let token = match config.access_token {
            Some(token) => OnceCell::new_with(Some(token)),
            None => OnceCell::new(),
        };
        Ok(Self {
            http,
            project: config.project,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoint, path.trim_start_matches('/'))
    }

    fn filter(&self, job_statuses: &[&str], job_names: &[&str]) -> String {
        let mut filter = Map::new();
        filter.insert("project_id".to_string(), json!(self.project));
        if !job_statuses.is_empty() {
            filter.insert("job_statuses".to_string(), json!(job_statuses));
        }
        if !job_names.is_empty() {
            filter.insert("job_names".to_string(), json!(job_names));
        }
        Value::Object(filter).to_string()
    }

    async fn access_token(&self) -> Result<&str, ClientError> {
        self.token
            .get_or_try_init(gcloud_access_token)
            .await
            .map(String::as_str)
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = self.access_token().await?;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    async fn list_page<P: DeserializeOwned>(
        &self,
        path: &str,
        filter: String,
        page_size: Option<u32>,
        page_token: Option<String>,
    ) -> Result<P, ClientError> {
        let mut query = vec![("filter", filter)];
        if let Some(size) = page_size {
            query.push(("pageSize", size.to_string()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        debug!(path, "listing page");
        let request = self.request(Method::GET, path).await?.query(&query);
        send(request).await
    }
}

#[async_trait]
impl TransferJobClient for RestTransferJobs {
    fn jobs(&self) -> PageStream<'_, TransferJobsPage> {
        let filter = self.filter(&["ENABLED"], &[]);
        paginate(move |token| {
            let filter = filter.clone();
            async move {
                self.list_page("transferJobs", filter, Some(JOBS_PAGE_SIZE), token)
                    .await
            }
        })
    }

    async fn create(&self, job: TransferJob) -> Result<TransferJob, ClientError> {
        let request = self.request(Method::POST, "transferJobs").await?.json(&job);
        send(request).await
    }

    async fn get(&self, name: &str) -> Result<TransferJob, ClientError> {
        let request = self
            .request(Method::GET, name)
            .await?
            .query(&[("projectId", self.project.as_str())]);
        send(request).await
    }

    async fn update(
        &self,
        name: &str,
        request: UpdateTransferJobRequest,
    ) -> Result<TransferJob, ClientError> {
        let request = self.request(Method::PATCH, name).await?.json(&request);
        send(request).await
    }

    fn operations<'a>(&'a self, name: &'a str) -> PageStream<'a, OperationsPage> {
        let filter = self.filter(&[], &[name]);
        paginate(move |token| {
            let filter = filter.clone();
            async move {
                self.list_page("transferOperations", filter, None, token)
                    .await
            }
        })
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Api {
            status: status.as_u16(),
            message: api_error_message(&body),
        });
    }
    serde_json::from_str(&body).map_err(ClientError::Decode)
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

async fn gcloud_access_token() -> Result<String, ClientError> {
    let output = tokio::process::Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|err| ClientError::Token(format!("failed to run gcloud: {err}")))?;
    if !output.status.success() {
        return Err(ClientError::Token(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ClientError::Token("gcloud returned an empty token".to_string()));
    }
    Ok(token)
}
