use super::CloudError;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, CloudError>;
}

/// Ambient credentials of the default service account, served by the
/// metadata server of the hosting environment.
pub struct MetadataTokenSource {
    http: Client,
    token_url: String,
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl MetadataTokenSource {
    pub fn new(http: Client, metadata_host: &str) -> Self {
        Self {
            http,
            token_url: format!("http://{}{}", metadata_host, TOKEN_PATH),
        }
    }
}

#[async_trait]
impl TokenSource for MetadataTokenSource {
    async fn access_token(&self) -> Result<String, CloudError> {
        let response = self
            .http
            .get(&self.token_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| CloudError::Credentials(format!("metadata server unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CloudError::Credentials(format!(
                "metadata server returned {}",
                status.as_u16()
            )));
        }

        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| CloudError::Credentials(format!("malformed token response: {}", e)))?;

        debug!("Fetched access token (expires in {:?}s)", token.expires_in);

        Ok(token.access_token)
    }
}

pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String, CloudError> {
        Ok(self.token.clone())
    }
}
