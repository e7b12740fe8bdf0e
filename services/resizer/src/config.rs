use std::fmt;

pub const DEFAULT_CONTAINER_ENDPOINT: &str = "https://container.googleapis.com";
pub const DEFAULT_SQLADMIN_ENDPOINT: &str = "https://sqladmin.googleapis.com";
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_id: String,
    pub region: String,
    pub cluster_id: String,
    pub node_pools: Vec<String>,
    pub cloud_sql_instance: String,
    pub container_endpoint: String,
    pub sqladmin_endpoint: String,
    pub metadata_host: String,
    pub access_token: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    EmptyValue(&'static str),
    NoNodePools,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyValue(var) => write!(f, "{} must not be empty", var),
            ConfigError::NoNodePools => write!(f, "NODE_POOLS must name at least one node pool"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            project_id: var("PROJECT_ID", "default-project-id"),
            region: var("REGION", "us-central1"),
            cluster_id: var("CLUSTER_ID", "my-gke-cluster"),
            node_pools: parse_node_pools(&var("NODE_POOLS", "default-pool,default-pool")),
            cloud_sql_instance: var("CLOUD_SQL_INSTANCE", "default-sql-instance"),
            container_endpoint: var("CONTAINER_API_ENDPOINT", DEFAULT_CONTAINER_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            sqladmin_endpoint: var("SQLADMIN_API_ENDPOINT", DEFAULT_SQLADMIN_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            metadata_host: var("GCE_METADATA_HOST", DEFAULT_METADATA_HOST),
            access_token: lookup("GCP_ACCESS_TOKEN").filter(|token| !token.trim().is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("PROJECT_ID", &self.project_id),
            ("REGION", &self.region),
            ("CLUSTER_ID", &self.cluster_id),
            ("CLOUD_SQL_INSTANCE", &self.cloud_sql_instance),
        ];
        for (var, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyValue(var));
            }
        }

        if self.node_pools.is_empty() {
            return Err(ConfigError::NoNodePools);
        }

        Ok(())
    }

    /// `projects/{project}/locations/{region}/clusters/{cluster}`
    pub fn cluster_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/clusters/{}",
            self.project_id, self.region, self.cluster_id
        )
    }
}

fn parse_node_pools(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
