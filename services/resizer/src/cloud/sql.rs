use super::{execute, CloudError, SqlInstanceService};
use crate::models::ActivationPolicy;
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde_json::{json, Value};

/// Cloud SQL Admin `instances` client bound to one instance.
pub struct SqlAdminClient {
    http: Client,
    token: String,
    endpoint: String,
    project_id: String,
    instance: String,
}

impl SqlAdminClient {
    pub fn new(http: Client, token: String, endpoint: &str, project_id: &str, instance: &str) -> Self {
        Self {
            http,
            token,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            instance: instance.to_string(),
        }
    }

    fn instance_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/instances/{}",
            self.endpoint, self.project_id, self.instance
        )
    }
}

fn activation_patch(policy: ActivationPolicy) -> Value {
    json!({
        "settings": {
            "activationPolicy": policy
        }
    })
}

#[async_trait]
impl SqlInstanceService for SqlAdminClient {
    async fn set_activation_policy(&self, policy: ActivationPolicy) -> Result<Value, CloudError> {
        info!(
            "Patching Cloud SQL instance '{}' activationPolicy to '{}'",
            self.instance, policy
        );

        let request = self
            .http
            .patch(self.instance_url())
            .bearer_auth(&self.token)
            .json(&activation_patch(policy));

        execute(request).await
    }
}
