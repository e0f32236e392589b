//! Test server management.
//!
//! Serves the HTTP surface in-process on an ephemeral port.

use super::Harness;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A test server instance.
pub struct TestServer {
    pub harness: Harness,
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Spawn a server over a fresh harness.
    pub async fn spawn() -> anyhow::Result<Self> {
        let harness = Harness::new().await;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let engine = harness.engine.clone();
        let task = tokio::spawn(async move {
            let _ = sanctiond::http::serve(listener, engine).await;
        });
        Ok(Self {
            harness,
            addr,
            task,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
