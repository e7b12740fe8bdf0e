use super::auth::TokenSource;
use super::{CloudConnector, CloudError, CloudSession, NodePoolService, SqlInstanceService};
use crate::models::ActivationPolicy;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    SetSize { node_pool: String, node_count: i64 },
    PatchInstance { policy: ActivationPolicy },
}

/// In-memory stand-in for both APIs that records every call it receives.
#[derive(Clone, Default)]
pub struct FakeCloud {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    failing_pools: Vec<String>,
    fail_credentials: bool,
    fail_sql_client: bool,
    fail_sql_patch: bool,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_pool(mut self, node_pool: &str) -> Self {
        self.failing_pools.push(node_pool.to_string());
        self
    }

    pub fn with_credential_failure(mut self) -> Self {
        self.fail_credentials = true;
        self
    }

    pub fn with_sql_client_failure(mut self) -> Self {
        self.fail_sql_client = true;
        self
    }

    pub fn with_sql_patch_failure(mut self) -> Self {
        self.fail_sql_patch = true;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CloudConnector for FakeCloud {
    async fn connect(&self) -> Result<Box<dyn CloudSession>, CloudError> {
        if self.fail_credentials {
            return Err(CloudError::Credentials("no default credentials".to_string()));
        }
        Ok(Box::new(self.clone()))
    }
}

impl CloudSession for FakeCloud {
    fn node_pools(&self) -> Result<Box<dyn NodePoolService>, CloudError> {
        Ok(Box::new(self.clone()))
    }

    fn sql_instances(&self) -> Result<Box<dyn SqlInstanceService>, CloudError> {
        if self.fail_sql_client {
            return Err(CloudError::ClientBuild("sqladmin discovery failed".to_string()));
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl NodePoolService for FakeCloud {
    async fn set_node_pool_size(&self, node_pool: &str, node_count: i64) -> Result<Value, CloudError> {
        self.record(RecordedCall::SetSize {
            node_pool: node_pool.to_string(),
            node_count,
        });

        if self.failing_pools.iter().any(|p| p == node_pool) {
            return Err(CloudError::Api {
                status: 404,
                body: format!("node pool {} not found", node_pool),
            });
        }

        Ok(json!({
            "name": format!("operation-{}", node_pool),
            "operationType": "SET_NODE_POOL_SIZE",
            "status": "RUNNING"
        }))
    }
}

#[async_trait]
impl SqlInstanceService for FakeCloud {
    async fn set_activation_policy(&self, policy: ActivationPolicy) -> Result<Value, CloudError> {
        self.record(RecordedCall::PatchInstance { policy });

        if self.fail_sql_patch {
            return Err(CloudError::Api {
                status: 409,
                body: "operation in progress".to_string(),
            });
        }

        Ok(json!({
            "kind": "sql#operation",
            "operationType": "UPDATE",
            "status": "PENDING"
        }))
    }
}

pub struct FailingTokenSource;

#[async_trait]
impl TokenSource for FailingTokenSource {
    async fn access_token(&self) -> Result<String, CloudError> {
        Err(CloudError::Credentials("metadata server unreachable".to_string()))
    }
}

pub struct CountingTokenSource {
    token: String,
    fetches: AtomicUsize,
}

impl CountingTokenSource {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for CountingTokenSource {
    async fn access_token(&self) -> Result<String, CloudError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.clone())
    }
}

/// Answers exactly one HTTP request on a loopback port with `status` and
/// `body`. The handle resolves to the raw request that was received.
pub async fn serve_once(status: u16, body: &'static str) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;

        let response = format!(
            "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();

        request
    });

    (addr, handle)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}
