//! Per-node RPC connection pooling.
//!
//! Grounded on `examples/original_source/src/coordinator/handler.py`'s
//! `RPCClientPool`: a bounded idle-connection list keyed by node
//! address, `borrow`/`release`, and "discard rather than return" on any
//! transport error (spec.md §4.8).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::rpc::RpcClient;

/// A bounded pool of idle [`RpcClient`] connections, one idle list per
/// node address.
pub struct RpcClientPool {
    idle: Mutex<HashMap<String, Vec<RpcClient>>>,
    max_idle_per_node: usize,
    connect_timeout: Duration,
    max_frame_size: u32,
}

impl RpcClientPool {
    /// Creates an empty pool.
    pub fn new(max_idle_per_node: usize, connect_timeout: Duration, max_frame_size: u32) -> Arc<Self> {
        Arc::new(Self {
            idle: Mutex::new(HashMap::new()),
            max_idle_per_node,
            connect_timeout,
            max_frame_size,
        })
    }

    /// Borrows a connection to `address`, reusing an idle one if
    /// available, otherwise dialing a fresh one.
    pub async fn borrow(&self, address: &str) -> Result<RpcClient> {
        if let Some(client) = self
            .idle
            .lock()
            .await
            .get_mut(address)
            .and_then(|list| list.pop())
        {
            debug!(address, "reusing pooled rpc connection");
            return Ok(client);
        }
        debug!(address, "dialing new rpc connection");
        RpcClient::connect(address, self.connect_timeout, self.max_frame_size).await
    }

    /// Returns a connection to the idle pool for `address`, dropping it
    /// instead if the pool for that node is already at capacity.
    pub async fn release(&self, address: &str, client: RpcClient) {
        let mut idle = self.idle.lock().await;
        let list = idle.entry(address.to_string()).or_default();
        if list.len() < self.max_idle_per_node {
            list.push(client);
        }
    }

    /// Discards all pooled connections to `address`, called once a node
    /// is evicted from membership (spec.md §4.9).
    pub async fn close_all(&self, address: &str) {
        self.idle.lock().await.remove(address);
    }
}
