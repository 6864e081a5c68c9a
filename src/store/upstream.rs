//! HTTP-backed [`ObjectStore`]: forwards each operation to the upstream
//! objects API and maps the answer into typed results.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{ObjectStore, StoreError};
use crate::models::object::{CreatedObject, DeleteConfirmation, Object, ObjectPatch, ObjectPayload};

const POOL_MAX_IDLE_PER_HOST: usize = 100;
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Substring upstream puts in its delete confirmation message.
const DELETED_MARKER: &str = "has been deleted";

pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObjectStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        // One client for the process; connections are pooled across calls.
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}/objects/{}", self.base_url, id),
            None => format!("{}/objects", self.base_url),
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
    }

    fn with_json<B: Serialize>(req: RequestBuilder, body: &B) -> Result<RequestBuilder, StoreError> {
        let bytes = serde_json::to_vec(body).map_err(StoreError::Encode)?;
        Ok(req.body(bytes))
    }

    /// Send, require a 200, and decode the JSON body into `T`.
    async fn execute<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        op: &'static str,
    ) -> Result<T, StoreError> {
        let resp = req.send().await.map_err(|e| {
            tracing::warn!(op, error = %e, "upstream request failed");
            StoreError::Transport(e.to_string())
        })?;

        let status = resp.status();
        if status != StatusCode::OK {
            tracing::warn!(op, status = status.as_u16(), "upstream returned unexpected status");
            return Err(StoreError::UnexpectedStatus(status.as_u16()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(op, error = %e, "failed to decode upstream response");
            StoreError::Decode(e.to_string())
        })
    }
}

/// Upstream answers "nothing matched" with an empty list, or with a list
/// whose first entry has no id, rather than a 404. Later entries are not
/// inspected.
fn non_empty_list(objects: Vec<Object>) -> Result<Vec<Object>, StoreError> {
    if objects.first().map_or(true, |o| o.id.is_empty()) {
        return Err(StoreError::NoData);
    }
    Ok(objects)
}

fn require_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() {
        return Err(StoreError::NoData);
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn list_objects(&self) -> Result<Vec<Object>, StoreError> {
        let req = self.request(Method::GET, &self.url(None));
        let objects: Vec<Object> = self.execute(req, "list_objects").await?;
        non_empty_list(objects)
    }

    async fn get_objects_by_ids(&self, ids: &[String]) -> Result<Vec<Object>, StoreError> {
        let query: Vec<(&str, &str)> = ids.iter().map(|id| ("id", id.as_str())).collect();
        let req = self.request(Method::GET, &self.url(None)).query(&query);
        let objects: Vec<Object> = self.execute(req, "get_objects_by_ids").await?;
        non_empty_list(objects)
    }

    async fn get_object(&self, id: &str) -> Result<Object, StoreError> {
        let req = self.request(Method::GET, &self.url(Some(id)));
        let object: Object = self.execute(req, "get_object").await?;
        require_id(&object.id)?;
        Ok(object)
    }

    async fn create_object(&self, payload: &ObjectPayload) -> Result<CreatedObject, StoreError> {
        let req = Self::with_json(self.request(Method::POST, &self.url(None)), payload)?;
        let created: CreatedObject = self.execute(req, "create_object").await?;
        require_id(&created.id)?;
        Ok(created)
    }

    async fn update_object(
        &self,
        id: &str,
        payload: &ObjectPayload,
    ) -> Result<CreatedObject, StoreError> {
        let req = Self::with_json(self.request(Method::PUT, &self.url(Some(id))), payload)?;
        let updated: CreatedObject = self.execute(req, "update_object").await?;
        require_id(&updated.id)?;
        Ok(updated)
    }

    async fn patch_object(&self, id: &str, patch: &ObjectPatch) -> Result<CreatedObject, StoreError> {
        let req = Self::with_json(self.request(Method::PATCH, &self.url(Some(id))), patch)?;
        let updated: CreatedObject = self.execute(req, "patch_object").await?;
        require_id(&updated.id)?;
        Ok(updated)
    }

    async fn delete_object(&self, id: &str) -> Result<DeleteConfirmation, StoreError> {
        let req = self.request(Method::DELETE, &self.url(Some(id)));
        let confirmation: DeleteConfirmation = self
            .execute(req, "delete_object")
            .await
            .map_err(|e| match e {
                // A body without a `message` string decodes as a shape problem.
                StoreError::Decode(msg) => StoreError::UnexpectedResponseShape(msg),
                other => other,
            })?;

        if !confirmation.message.contains(DELETED_MARKER) {
            return Err(StoreError::UnexpectedResponseShape(format!(
                "delete message did not confirm deletion: {:?}",
                confirmation.message
            )));
        }
        Ok(confirmation)
    }
}
