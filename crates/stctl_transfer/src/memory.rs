use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use futures::future;
use tracing::info;

use crate::client::{paginate, ClientError, PageStream, TransferJobClient};
use crate::model::{
    Operation, OperationsPage, TransferJob, TransferJobStatus, TransferJobsPage,
    UpdateTransferJobRequest,
};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    JobsPage(usize),
    Create(TransferJob),
    Get(String),
    Update(String, UpdateTransferJobRequest),
    OperationsPage(String, usize),
}

impl RecordedCall {
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Create(_) | Self::Update(..))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailingCall {
    JobsPage(usize),
    Create,
    Get,
    Update,
    OperationsPage(usize),
}

#[derive(Debug, Default)]
struct State {
    jobs: Vec<TransferJob>,
    operations: HashMap<String, Vec<Operation>>,
    calls: Vec<RecordedCall>,
    next_id: u64,
}

#[derive(Debug)]
pub struct InMemoryTransferJobs {
    page_size: usize,
    failures: HashMap<FailingCall, ClientErrorTemplate>,
    state: Mutex<State>,
}

#[derive(Debug, Clone)]
struct ClientErrorTemplate {
    status: u16,
    message: String,
}

impl ClientErrorTemplate {
    fn to_error(&self) -> ClientError {
        ClientError::Api {
            status: self.status,
            message: self.message.clone(),
        }
    }
}

impl Default for InMemoryTransferJobs {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl InMemoryTransferJobs {
    pub fn new(jobs: Vec<TransferJob>) -> Self {
        Self {
            page_size: 20,
            failures: HashMap::new(),
            state: Mutex::new(State {
                jobs,
                ..State::default()
            }),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_operations(self, job_name: &str, operations: Vec<Operation>) -> Self {
        self.lock()
            .operations
            .insert(job_name.to_string(), operations);
        self
    }

    pub fn failing(mut self, call: FailingCall, status: u16, message: &str) -> Self {
        self.failures.insert(
            call,
            ClientErrorTemplate {
                status,
                message: message.to_string(),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn writes(&self) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(RecordedCall::is_write).collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn stored_jobs(&self) -> Vec<TransferJob> {
        self.lock().jobs.clone()
    }

    pub fn enabled_jobs(&self) -> Vec<TransferJob> {
        self.lock()
            .jobs
            .iter()
            .filter(|job| job.status == Some(TransferJobStatus::Enabled))
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, call: FailingCall) -> Result<(), ClientError> {
        match self.failures.get(&call) {
            Some(template) => Err(template.to_error()),
            None => Ok(()),
        }
    }

    fn page<T: Clone>(&self, items: &[T], index: usize) -> (Vec<T>, Option<String>) {
        let start = index.saturating_mul(self.page_size);
        let chunk = items.iter().skip(start).take(self.page_size).cloned().collect();
        let next = (start.saturating_add(self.page_size) < items.len())
            .then(|| format!("page-{}", index + 1));
        (chunk, next)
    }
}

fn page_index(token: Option<&str>) -> Result<usize, ClientError> {
    match token {
        None => Ok(0),
        Some(token) => token
            .strip_prefix("page-")
            .and_then(|index| index.parse().ok())
            .ok_or_else(|| ClientError::Api {
                status: 400,
                message: format!("invalid page token {token:?}"),
            }),
    }
}

#[async_trait]
impl TransferJobClient for InMemoryTransferJobs {
    fn jobs(&self) -> PageStream<'_, TransferJobsPage> {
        let jobs = self.enabled_jobs();
        paginate(move |token| {
            let page = page_index(token.as_deref()).and_then(|index| {
                self.lock().calls.push(RecordedCall::JobsPage(index));
                self.check(FailingCall::JobsPage(index))?;
                let (transfer_jobs, next_page_token) = self.page(&jobs, index);
                Ok(TransferJobsPage {
                    transfer_jobs,
                    next_page_token,
                })
            });
            future::ready(page)
        })
    }

    async fn create(&self, mut job: TransferJob) -> Result<TransferJob, ClientError> {
        let mut state = self.lock();
        state.calls.push(RecordedCall::Create(job.clone()));
        self.check(FailingCall::Create)?;
        state.next_id += 1;
        job.name = format!("transferJobs/fake-{}", state.next_id);
        info!(name = %job.name, "fake transfer job created");
        state.jobs.push(job.clone());
        Ok(job)
    }

    async fn get(&self, name: &str) -> Result<TransferJob, ClientError> {
        let mut state = self.lock();
        state.calls.push(RecordedCall::Get(name.to_string()));
        self.check(FailingCall::Get)?;
        state
            .jobs
            .iter()
            .find(|job| job.name == name)
            .cloned()
            .ok_or_else(|| ClientError::Api {
                status: 404,
                message: format!("transfer job {name} not found"),
            })
    }

    async fn update(
        &self,
        name: &str,
        request: UpdateTransferJobRequest,
    ) -> Result<TransferJob, ClientError> {
        let mut state = self.lock();
        state
            .calls
            .push(RecordedCall::Update(name.to_string(), request.clone()));
        self.check(FailingCall::Update)?;
        let job = state
            .jobs
            .iter_mut()
            .find(|job| job.name == name)
            .ok_or_else(|| ClientError::Api {
                status: 404,
                message: format!("transfer job {name} not found"),
            })?;
        let patch = request.transfer_job;
        job.description = patch.description;
        job.transfer_spec = patch.transfer_spec;
        job.status = Some(patch.status);
        Ok(job.clone())
    }

    fn operations<'a>(&'a self, name: &'a str) -> PageStream<'a, OperationsPage> {
        let stored = self.lock().operations.get(name).cloned().unwrap_or_default();
        paginate(move |token| {
            let page = page_index(token.as_deref()).and_then(|index| {
                self.lock()
                    .calls
                    .push(RecordedCall::OperationsPage(name.to_string(), index));
                self.check(FailingCall::OperationsPage(index))?;
                let (operations, next_page_token) = self.page(&stored, index);
                Ok(OperationsPage {
                    operations,
                    next_page_token,
                })
            });
            future::ready(page)
        })
    }
}
