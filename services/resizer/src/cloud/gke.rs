use super::{execute, CloudError, NodePoolService};
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde_json::{json, Value};

/// GKE `projects.locations.clusters.nodePools` client bound to one cluster.
pub struct GkeClient {
    http: Client,
    token: String,
    endpoint: String,
    cluster_path: String,
}

impl GkeClient {
    pub fn new(http: Client, token: String, endpoint: &str, cluster_path: String) -> Self {
        Self {
            http,
            token,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            cluster_path,
        }
    }

    fn node_pool_name(&self, node_pool: &str) -> String {
        format!("{}/nodePools/{}", self.cluster_path, node_pool)
    }

    fn set_size_url(&self, node_pool: &str) -> String {
        format!("{}/v1/{}:setSize", self.endpoint, self.node_pool_name(node_pool))
    }

}

fn set_size_body(node_count: i64) -> Value {
    json!({ "nodeCount": node_count })
}

#[async_trait]
impl NodePoolService for GkeClient {
    async fn set_node_pool_size(&self, node_pool: &str, node_count: i64) -> Result<Value, CloudError> {
        info!(
            "Setting node pool '{}' size to {} nodes",
            self.node_pool_name(node_pool),
            node_count
        );

        let request = self
            .http
            .post(self.set_size_url(node_pool))
            .bearer_auth(&self.token)
            .json(&set_size_body(node_count));

        execute(request).await
    }
}
