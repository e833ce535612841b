// HTTP RemoteStore backed by the DataManager JSON API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::error::RemoteError;
use super::models::AttributeSnapshot;
use super::traits::RemoteStore;
use crate::config::RemoteConfig;

const EP_USER_ATTRIBUTES: &str = "user/attributes/get";
const EP_NAMESPACE_UPDATE: &str = "namespace/update";
const EP_NAMESPACE_DELETE: &str = "namespace/delete";
const EP_NAMESPACE_LIST: &str = "namespaces";

#[derive(Serialize)]
struct NamespaceRequest<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct NamespaceUpdateRequest<'a> {
    name: &'a str,
    #[serde(rename = "newName")]
    new_name: &'a str,
}

#[derive(Serialize)]
struct EmptyRequest {}

/// Client for the DataManager server.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    http_client: HttpClient,
    base_url: Url,
    token: String,
}

impl HttpRemoteStore {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let mut base_url = Url::parse(&config.url)?;
        // Endpoints are joined relative to the base, which needs a trailing slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = HttpClient::builder()
            .user_agent(concat!("dmfs/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { http_client, base_url, token: config.token.clone() })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        Ok(self.base_url.join(path)?)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RemoteError> {
        let text = self.send(path, body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn send<B: Serialize>(&self, path: &str, body: &B) -> Result<String, RemoteError> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "remote request");

        let mut request = self.http_client.post(url).json(body);
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(RemoteError::Status { status: status.as_u16(), message: text.trim().to_string() })
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_attributes(&self) -> Result<AttributeSnapshot, RemoteError> {
        self.post(EP_USER_ATTRIBUTES, &EmptyRequest {}).await
    }

    async fn rename_namespace(&self, old_id: &str, new_id: &str) -> Result<(), RemoteError> {
        let body = NamespaceUpdateRequest { name: old_id, new_name: new_id };
        self.send(EP_NAMESPACE_UPDATE, &body).await.map(drop)
    }

    async fn delete_namespace(&self, id: &str) -> Result<(), RemoteError> {
        self.send(EP_NAMESPACE_DELETE, &NamespaceRequest { name: id }).await.map(drop)
    }

    async fn probe_reachable(&self) -> Result<(), RemoteError> {
        self.send(EP_NAMESPACE_LIST, &EmptyRequest {}).await.map(drop)
    }
}
