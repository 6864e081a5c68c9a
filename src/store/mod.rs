//! Data access for objects. The gateway owns no storage: every operation is
//! a call to the upstream objects API.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::object::{CreatedObject, DeleteConfirmation, Object, ObjectPatch, ObjectPayload};

pub mod upstream;

pub use upstream::HttpObjectStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection failure, or the request deadline elapsed.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),

    #[error("failed to encode request payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode upstream response: {0}")]
    Decode(String),

    /// Upstream answered 200 but with an empty list or an object with no id.
    #[error("no data retrieved in response")]
    NoData,

    #[error("unexpected response shape: {0}")]
    UnexpectedResponseShape(String),
}

/// One method per upstream resource verb. The HTTP implementation is
/// [`HttpObjectStore`]; tests plug in stubs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_objects(&self) -> Result<Vec<Object>, StoreError>;

    async fn get_objects_by_ids(&self, ids: &[String]) -> Result<Vec<Object>, StoreError>;

    async fn get_object(&self, id: &str) -> Result<Object, StoreError>;

    async fn create_object(&self, payload: &ObjectPayload) -> Result<CreatedObject, StoreError>;

    async fn update_object(
        &self,
        id: &str,
        payload: &ObjectPayload,
    ) -> Result<CreatedObject, StoreError>;

    async fn patch_object(&self, id: &str, patch: &ObjectPatch) -> Result<CreatedObject, StoreError>;

    async fn delete_object(&self, id: &str) -> Result<DeleteConfirmation, StoreError>;
}

/// Bound an upstream call by the request deadline. An elapsed deadline drops
/// (and so cancels) the in-flight call and surfaces as a transport failure.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Transport(format!(
            "request deadline of {}ms elapsed",
            deadline.as_millis()
        ))),
    }
}
