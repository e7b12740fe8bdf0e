use crate::cloud::{CloudConnector, CloudError, CloudSession};
use crate::config::Config;
use crate::models::*;
use log::{error, info};
use std::sync::Arc;

/// Resizes every configured node pool, then starts or stops the Cloud SQL
/// instance to match.
pub struct PoolResizer {
    config: Arc<Config>,
    connector: Arc<dyn CloudConnector>,
}

impl PoolResizer {
    pub fn new(config: Arc<Config>, connector: Arc<dyn CloudConnector>) -> Self {
        Self { config, connector }
    }

    /// Fails only when credentials or the node pool client cannot be
    /// obtained. Every individual API failure is reported inside the
    /// returned report.
    pub async fn resize(&self, node_count: i64) -> Result<ResizeReport, CloudError> {
        let session = self.connector.connect().await?;
        let node_pools = session.node_pools()?;

        info!("Resizing GKE node pools to {} nodes", node_count);

        let mut gke_responses = PoolResults::default();
        for node_pool in &self.config.node_pools {
            let result = node_pools.set_node_pool_size(node_pool, node_count).await;
            match &result {
                Ok(_) => info!("Node pool '{}' resized to {} nodes", node_pool, node_count),
                Err(e) => error!("Error resizing node pool '{}': {}", node_pool, e),
            }
            gke_responses.record(node_pool, result.into());
        }

        info!(
            "{} of {} node pools accepted the resize",
            gke_responses.succeeded(),
            gke_responses.count()
        );

        let policy = ActivationPolicy::for_node_count(node_count);
        let cloud_sql_response = self
            .apply_activation_policy(session.as_ref(), policy)
            .await
            .into();

        Ok(ResizeReport {
            gke_responses,
            cloud_sql_response,
        })
    }

    async fn apply_activation_policy(
        &self,
        session: &dyn CloudSession,
        policy: ActivationPolicy,
    ) -> Result<serde_json::Value, CloudError> {
        let instance = &self.config.cloud_sql_instance;

        let result = match session.sql_instances() {
            Ok(sql) => sql.set_activation_policy(policy).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => info!(
                "Cloud SQL instance '{}' set to activationPolicy '{}'",
                instance, policy
            ),
            Err(e) => error!("Error updating Cloud SQL instance '{}': {}", instance, e),
        }

        result
    }
}
