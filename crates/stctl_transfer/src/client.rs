use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::future::Future;
use thiserror::Error;

use crate::model::{
    OperationsPage, Paged, TransferJob, TransferJobsPage, UpdateTransferJobRequest,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transfer API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("transfer API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("failed to decode transfer API response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to obtain access token: {0}")]
    Token(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

pub type PageStream<'a, P> = BoxStream<'a, Result<P, ClientError>>;

#[async_trait]
pub trait TransferJobClient: Send + Sync {
    fn jobs(&self) -> PageStream<'_, TransferJobsPage>;

    async fn create(&self, job: TransferJob) -> Result<TransferJob, ClientError>;

    async fn get(&self, name: &str) -> Result<TransferJob, ClientError>;

    async fn update(
        &self,
        name: &str,
        request: UpdateTransferJobRequest,
    ) -> Result<TransferJob, ClientError>;

    fn operations<'a>(&'a self, name: &'a str) -> PageStream<'a, OperationsPage>;
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

pub fn paginate<'a, P, F, Fut>(fetch: F) -> PageStream<'a, P>
where
    P: Paged + Send + 'a,
    F: FnMut(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<P, ClientError>> + Send + 'a,
{
    stream::try_unfold((fetch, Cursor::Start), |(mut fetch, cursor)| async move {
        let token = match cursor {
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
            Cursor::Done => return Ok(None),
        };
        let page = fetch(token).await?;
        let next = match page.next_page_token() {
            Some(token) => Cursor::Next(token.to_string()),
            None => Cursor::Done,
        };
        Ok::<_, ClientError>(Some((page, (fetch, next))))
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::{paginate, ClientError};
    use crate::model::TransferJobsPage;
    use futures::TryStreamExt;

    fn page(token: Option<&str>) -> TransferJobsPage {
        TransferJobsPage {
            transfer_jobs: Vec::new(),
            next_page_token: token.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn follows_tokens_until_exhausted() {
        let mut requested = Vec::new();
        let pages: Vec<TransferJobsPage> = paginate(|token: Option<String>| {
            requested.push(token.clone());
            async move {
                Ok(match token.as_deref() {
                    None => page(Some("p2")),
                    Some("p2") => page(Some("p3")),
                    _ => page(None),
                })
            }
        })
        .try_collect()
        .await
        .expect("pages");

        assert_eq!(pages.len(), 3);
        assert_eq!(
            requested,
            vec![None, Some("p2".to_string()), Some("p3".to_string())]
        );
    }

    #[tokio::test]
    async fn stops_at_first_error() {
        let result: Result<Vec<TransferJobsPage>, ClientError> =
            paginate(|token: Option<String>| async move {
                match token {
                    None => Ok(page(Some("next"))),
                    Some(_) => Err(ClientError::Api {
                        status: 503,
                        message: "unavailable".to_string(),
                    }),
                }
            })
            .try_collect()
            .await;

        assert!(matches!(result, Err(ClientError::Api { status: 503, .. })));
    }
}
