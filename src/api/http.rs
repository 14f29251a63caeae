use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use super::CrudApi;
use crate::config::ApiConfig;
use crate::entity::{Entity, Resource};
use crate::error::ApiError;
use crate::session::CredentialStore;

/// Shared HTTP plumbing: base URL, timeout and bearer authorization.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, credentials: Arc<dyn CredentialStore>) -> anyhow::Result<Self> {
        let mut base_url = Url::parse(&config.base_url)?;
        // Url::join drops the last segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::validation(format!("Invalid request path '{}': {}", path, e)))
    }

    /// `path` followed by `id` as one percent-encoded segment, so an id can
    /// never climb to another endpoint or start a query string.
    pub fn item_url(&self, path: &str, id: &str) -> Result<Url, ApiError> {
        if id.is_empty() || id == "." || id == ".." {
            return Err(ApiError::validation(format!("Invalid record id '{}'", id)));
        }
        let mut url = self.url(path)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::validation(format!("Cannot append an id to '{}'", path)))?
            .push(id);
        Ok(url)
    }

    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.request_url(method, self.url(path)?))
    }

    pub fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(token) = self.credentials.get() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Send and return the JSON body of a successful response.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Value, ApiError> {
        let response = builder.send().await?;
        Self::read_body(response).await
    }

    async fn read_body(response: Response) -> Result<Value, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string));
            tracing::warn!("Request failed with {}: {:?}", status, message);
            return Err(ApiError::from_status(status.as_u16(), message));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// `CrudApi` over the hotel backend's REST routes.
pub struct HttpCrudApi<T> {
    client: ApiClient,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> HttpCrudApi<T> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            _entity: PhantomData,
        }
    }

    fn resource(&self) -> Resource {
        T::RESOURCE
    }

    fn write_path(&self, path: Option<&'static str>) -> Result<&'static str, ApiError> {
        path.ok_or_else(|| {
            ApiError::validation(format!("{} records are read-only", self.resource().label))
        })
    }

    /// Pull `key` out of the response envelope and decode it.
    fn unwrap_envelope<V: serde::de::DeserializeOwned>(body: Value, key: &str) -> Result<V, ApiError> {
        match body {
            Value::Object(mut map) => match map.remove(key) {
                Some(inner) => Ok(serde_json::from_value(inner)?),
                None => {
                    tracing::warn!("Response is missing the '{}' key", key);
                    Err(ApiError::unexpected_format())
                }
            },
            _ => Err(ApiError::unexpected_format()),
        }
    }
}

#[async_trait]
impl<T: Entity> CrudApi<T> for HttpCrudApi<T> {
    async fn fetch_all(&self) -> Result<Vec<T>, ApiError> {
        let resource = self.resource();
        let body = self
            .client
            .send(self.client.request(Method::GET, resource.list_path)?)
            .await?;
        Self::unwrap_envelope(body, resource.collection_key)
    }

    async fn create(&self, draft: &Value) -> Result<T, ApiError> {
        let resource = self.resource();
        let path = self.write_path(resource.add_path)?;
        let body = self
            .client
            .send(self.client.request(Method::POST, path)?.json(draft))
            .await?;
        Self::unwrap_envelope(body, resource.item_key)
    }

    async fn update(&self, id: &T::Id, patch: &Value) -> Result<T, ApiError> {
        let resource = self.resource();
        let url = self
            .client
            .item_url(self.write_path(resource.edit_path)?, &id.to_string())?;
        let body = self
            .client
            .send(self.client.request_url(Method::PUT, url).json(patch))
            .await?;
        Self::unwrap_envelope(body, resource.item_key)
    }

    async fn delete(&self, id: &T::Id) -> Result<(), ApiError> {
        let resource = self.resource();
        let url = self
            .client
            .item_url(self.write_path(resource.delete_path)?, &id.to_string())?;
        self.client
            .send(self.client.request_url(Method::DELETE, url))
            .await?;
        Ok(())
    }
}
