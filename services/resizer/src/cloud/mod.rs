use crate::config::Config;
use crate::models::ActivationPolicy;
use async_trait::async_trait;
use auth::{MetadataTokenSource, StaticTokenSource, TokenSource};
use gke::GkeClient;
use log::info;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use sql::SqlAdminClient;
use std::sync::Arc;

pub mod auth;
#[cfg(test)]
pub mod fake;
pub mod gke;
pub mod sql;

#[async_trait]
pub trait NodePoolService: Send + Sync {
    async fn set_node_pool_size(&self, node_pool: &str, node_count: i64) -> Result<Value, CloudError>;
}

#[async_trait]
pub trait SqlInstanceService: Send + Sync {
    async fn set_activation_policy(&self, policy: ActivationPolicy) -> Result<Value, CloudError>;
}

/// Resolves credentials once per request and hands back a session holding
/// them.
#[async_trait]
pub trait CloudConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn CloudSession>, CloudError>;
}

/// Authenticated API clients sharing one set of credentials.
pub trait CloudSession: Send + Sync {
    fn node_pools(&self) -> Result<Box<dyn NodePoolService>, CloudError>;
    fn sql_instances(&self) -> Result<Box<dyn SqlInstanceService>, CloudError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum CloudError {
    Credentials(String),
    ClientBuild(String),
    Transport(String),
    Api { status: u16, body: String },
    InvalidResponse(String),
}

impl std::fmt::Display for CloudError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudError::Credentials(msg) => write!(f, "Credentials unavailable: {}", msg),
            CloudError::ClientBuild(msg) => write!(f, "Client construction failed: {}", msg),
            CloudError::Transport(msg) => write!(f, "Transport error: {}", msg),
            CloudError::Api { status, body } => write!(f, "API returned {}: {}", status, body),
            CloudError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for CloudError {}

/// Sends a prepared request and returns the JSON body of a 2xx response.
pub(crate) async fn execute(request: RequestBuilder) -> Result<Value, CloudError> {
    let response = request
        .send()
        .await
        .map_err(|e| CloudError::Transport(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| CloudError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(CloudError::Api {
            status: status.as_u16(),
            body,
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    serde_json::from_str(&body).map_err(|e| CloudError::InvalidResponse(e.to_string()))
}

/// Talks to the GKE and Cloud SQL Admin REST APIs with bearer tokens from a
/// [`TokenSource`].
pub struct GcpConnector {
    http: Client,
    tokens: Arc<dyn TokenSource>,
    config: Arc<Config>,
}

impl GcpConnector {
    pub fn new(http: Client, tokens: Arc<dyn TokenSource>, config: Arc<Config>) -> Self {
        Self {
            http,
            tokens,
            config,
        }
    }

    pub fn from_config(config: Arc<Config>) -> Result<Self, CloudError> {
        let http = Client::builder()
            .build()
            .map_err(|e| CloudError::ClientBuild(e.to_string()))?;

        let tokens: Arc<dyn TokenSource> = match &config.access_token {
            Some(token) => {
                info!("Using static access token from GCP_ACCESS_TOKEN");
                Arc::new(StaticTokenSource::new(token.clone()))
            }
            None => {
                info!("Using metadata server at {} for credentials", config.metadata_host);
                Arc::new(MetadataTokenSource::new(http.clone(), &config.metadata_host))
            }
        };

        Ok(Self::new(http, tokens, config))
    }
}

#[async_trait]
impl CloudConnector for GcpConnector {
    async fn connect(&self) -> Result<Box<dyn CloudSession>, CloudError> {
        let token = self.tokens.access_token().await?;

        Ok(Box::new(GcpSession {
            http: self.http.clone(),
            token,
            config: self.config.clone(),
        }))
    }
}

struct GcpSession {
    http: Client,
    token: String,
    config: Arc<Config>,
}

impl CloudSession for GcpSession {
    fn node_pools(&self) -> Result<Box<dyn NodePoolService>, CloudError> {
        Ok(Box::new(GkeClient::new(
            self.http.clone(),
            self.token.clone(),
            &self.config.container_endpoint,
            self.config.cluster_path(),
        )))
    }

    fn sql_instances(&self) -> Result<Box<dyn SqlInstanceService>, CloudError> {
        Ok(Box::new(SqlAdminClient::new(
            self.http.clone(),
            self.token.clone(),
            &self.config.sqladmin_endpoint,
            &self.config.project_id,
            &self.config.cloud_sql_instance,
        )))
    }
}
