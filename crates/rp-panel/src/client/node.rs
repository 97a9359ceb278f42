//! HTTP client bound to one node

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};

use rp_core::error::RemoteError;
use rp_core::model::Node;
use rp_core::traits::RemoteControl;
use rp_protocol::{
    ApiStatus, ChainConfig, DaemonConfig, ObserverConfig, ServiceConfig, ERR_DUPLICATE,
    ERR_NOT_FOUND,
};

/// Client for one node's management API
///
/// Every request carries the node's basic auth credentials (when a username
/// is set) and a fixed timeout. Requests are never retried.
pub struct NodeClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    timeout: Duration,
}

impl NodeClient {
    /// Bind a client to `node`, sharing the connection pool of `http`
    pub fn new(http: reqwest::Client, node: &Node, timeout: Duration) -> Result<Self, RemoteError> {
        let base_url = node.api_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RemoteError::InvalidEndpoint(node.api_url.clone()));
        }

        Ok(Self {
            http,
            base_url,
            username: node.username.clone(),
            password: node.password.clone(),
            timeout,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .timeout(self.timeout);
        if self.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.username, Some(&self.password))
        }
    }

    /// Send a request and turn non-2xx answers into [`RemoteError`]s.
    ///
    /// `object` names what the call is about, for duplicate/not-found errors.
    async fn send(&self, request: RequestBuilder, object: &str) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &body, object))
    }

    fn transport_error(&self, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout(self.base_url.clone())
        } else {
            RemoteError::Transport(format!("{}: {}", self.base_url, err))
        }
    }
}

/// Map an error answer to a [`RemoteError`]
fn classify_failure(status: StatusCode, body: &str, object: &str) -> RemoteError {
    match serde_json::from_str::<ApiStatus>(body) {
        Ok(api) if api.code == ERR_DUPLICATE => RemoteError::Duplicate(object.to_string()),
        Ok(api) if api.code == ERR_NOT_FOUND => RemoteError::NotFound(object.to_string()),
        Ok(api) if !api.msg.is_empty() => RemoteError::Rejected {
            status: status.as_u16(),
            message: api.msg,
        },
        _ => RemoteError::Rejected {
            status: status.as_u16(),
            message: body.trim().to_string(),
        },
    }
}

#[async_trait]
impl RemoteControl for NodeClient {
    async fn create_service(&self, service: &ServiceConfig) -> Result<(), RemoteError> {
        let request = self.request(Method::POST, "/config/services").json(service);
        self.send(request, &service.name).await?;
        Ok(())
    }

    async fn delete_service(&self, name: &str) -> Result<(), RemoteError> {
        let request = self.request(Method::DELETE, &format!("/config/services/{}", name));
        self.send(request, name).await?;
        Ok(())
    }

    async fn create_chain(&self, chain: &ChainConfig) -> Result<(), RemoteError> {
        let request = self.request(Method::POST, "/config/chains").json(chain);
        self.send(request, &chain.name).await?;
        Ok(())
    }

    async fn delete_chain(&self, name: &str) -> Result<(), RemoteError> {
        let request = self.request(Method::DELETE, &format!("/config/chains/{}", name));
        self.send(request, name).await?;
        Ok(())
    }

    async fn create_observer(&self, observer: &ObserverConfig) -> Result<(), RemoteError> {
        let request = self.request(Method::POST, "/config/observers").json(observer);
        self.send(request, &observer.name).await?;
        Ok(())
    }

    async fn get_config(&self) -> Result<DaemonConfig, RemoteError> {
        let request = self.request(Method::GET, "/config?format=json");
        let response = self.send(request, "config").await?;
        response.json::<DaemonConfig>().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout(self.base_url.clone())
            } else {
                RemoteError::Decode(e.to_string())
            }
        })
    }

    async fn save_config(&self) -> Result<(), RemoteError> {
        let request = self.request(Method::POST, "/config?format=json");
        self.send(request, "config").await?;
        Ok(())
    }
}
