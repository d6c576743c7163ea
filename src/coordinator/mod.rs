//! The coordinator: shard placement, request routing, replication
//! fan-out, and broadcast search merge.
//!
//! Grounded on `examples/original_source/src/coordinator/handler.py`'s
//! `CoordinatorHandler` — the piece of the original that owns no vectors
//! itself and instead routes every call to the data node(s) that do,
//! using the membership cache ([`membership`]) to find them and an RPC
//! pool ([`pool`]) to talk to them.

pub mod membership;
pub mod placement;
pub mod pool;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{instrument, warn};

use crate::config::Config;
use crate::error::{MeshError, Result};
use crate::record::VectorRecord;
use crate::rpc::{ReplicateOp, Request, Response, SearchRequest, SearchResponse};
use crate::types::{NodeId, ShardId};

pub use membership::{ChildWatch, MembershipCache, MembershipStore, MemoryMembershipStore};
pub use placement::{assign, shard_id, ShardMapping};
pub use pool::RpcClientPool;

/// Routes PUT/DELETE/GET/SEARCH to the data nodes owning each shard,
/// maintaining cluster placement as nodes join and leave.
///
/// Holds no vector data itself — every method either dispatches one RPC
/// to a shard's master (writes, point reads) or fans out to every live
/// node and merges the results (search), matching the original's
/// stateless coordinator role (spec.md §4.6–§4.9).
pub struct Coordinator {
    config: Config,
    membership: Arc<MembershipCache>,
    pool: Arc<RpcClientPool>,
    placement: RwLock<HashMap<ShardId, ShardMapping>>,
}

impl Coordinator {
    /// Builds a coordinator backed by `store` for membership, starting
    /// its background watch/probe tasks immediately.
    pub fn new(config: Config, store: Arc<dyn MembershipStore>) -> Arc<Self> {
        let membership = Arc::new(MembershipCache::new(
            store,
            Duration::from_secs(config.membership.probe_interval_secs),
            Duration::from_secs(config.membership.probe_timeout_secs),
        ));
        membership.start();
        let pool = RpcClientPool::new(
            config.rpc.pool_size,
            Duration::from_millis(config.rpc.timeout_ms),
            config.rpc.max_frame_size,
        );
        Arc::new(Self {
            config,
            membership,
            pool,
            placement: RwLock::new(HashMap::new()),
        })
    }

    fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.config.rpc.timeout_ms)
    }

    /// Registers a data node with the membership cache and recomputes
    /// shard placement over the resulting node set (spec.md §4.6: "on
    /// any membership change, shards are reassigned by round-robin over
    /// the currently known node list").
    #[instrument(skip(self))]
    pub async fn register_node(&self, node_id: NodeId, address: &str) -> Result<()> {
        self.membership.register(node_id.as_str(), address).await?;
        self.recompute_placement();
        Ok(())
    }

    /// Returns the coordinator's current membership view as
    /// `(node_id, address)` pairs.
    pub fn list_nodes(&self) -> Vec<(NodeId, String)> {
        self.membership
            .live_nodes()
            .into_iter()
            .map(|(id, addr)| (NodeId::new(id), addr))
            .collect()
    }

    /// Recomputes shard placement from the current membership view.
    ///
    /// The original hands `assign_shards_to_nodes` whatever order ZooKeeper
    /// happens to return `get_children` in, which isn't itself a documented
    /// guarantee. This cache stores nodes in a hash map, so that order isn't
    /// available here either; nodes are sorted by id instead, which gives
    /// the same property the spec's round robin actually depends on (a
    /// stable mapping for a fixed node set) without relying on incidental
    /// backend ordering.
    fn recompute_placement(&self) {
        let mut nodes: Vec<NodeId> = self
            .membership
            .live_nodes()
            .into_iter()
            .map(|(id, _)| NodeId::new(id))
            .collect();
        nodes.sort();
        let mapping = assign(&nodes, self.config.shard_count, self.config.replica_count);
        *self.placement.write().unwrap() = mapping;
    }

    /// Looks up a shard's current master/slaves. A shard with no assigned
    /// master is a routing failure, not a missing record, so this is
    /// `Unavailable` rather than `NotFound` (spec.md §7/§4.6).
    fn mapping_for(&self, shard: ShardId) -> Result<ShardMapping> {
        self.placement
            .read()
            .unwrap()
            .get(&shard)
            .cloned()
            .ok_or_else(|| MeshError::unavailable(format!("shard {shard} has no assigned master")))
    }

    /// Resolves a node id to its address for routing. An unreachable/
    /// unregistered node is `Unavailable`, matching `mapping_for`: both are
    /// "couldn't route this request", not "this record doesn't exist".
    async fn address_of(&self, node_id: &NodeId) -> Result<String> {
        self.membership
            .address_of(node_id.as_str())
            .map_err(|_| MeshError::unavailable(format!("node {node_id} is not reachable")))
    }

    /// Calls `node_id` at `address`. A transport error discards the
    /// pooled connection and evicts `node_id` from the membership view
    /// (spec.md §7(b)): a node that just failed a live call is removed
    /// from the routing set immediately rather than waiting for the next
    /// health probe tick, so the caller's own retry/failover sees it gone.
    async fn rpc_call(&self, node_id: &NodeId, address: &str, req: &Request) -> Result<Response> {
        let mut client = self.pool.borrow(address).await?;
        match client.call(req, self.call_timeout()).await {
            Ok(resp) => {
                self.pool.release(address, client).await;
                Ok(resp)
            }
            Err(e) => {
                // Discard on any transport error rather than returning it
                // to the pool (spec.md §4.8).
                self.pool.close_all(address).await;
                self.membership.evict(node_id.as_str()).await;
                Err(e)
            }
        }
    }

    /// Writes `record` to its shard's master, then best-effort
    /// replicates the same write to each slave. A slave replication
    /// failure is logged but does not fail the call, and the write is
    /// never retried against a slave if the master is unreachable
    /// (spec.md §7: writes fail outright rather than silently promoting
    /// a slave).
    #[instrument(skip(self, record), fields(key = %record.key))]
    pub async fn put(&self, record: VectorRecord) -> Result<()> {
        let shard = shard_id(&record.key, self.config.shard_count);
        let mapping = self.mapping_for(shard)?;
        let master_addr = self.address_of(&mapping.master).await?;

        let resp = self
            .rpc_call(&mapping.master, &master_addr, &Request::Put(record.clone()))
            .await?;
        self.expect_success(resp)?;

        self.replicate(&mapping, ReplicateOp::Put(record)).await;
        Ok(())
    }

    /// Deletes `key` from its shard's master, then best-effort
    /// replicates the delete to each slave.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        let shard = shard_id(key, self.config.shard_count);
        let mapping = self.mapping_for(shard)?;
        let master_addr = self.address_of(&mapping.master).await?;

        let resp = self
            .rpc_call(&mapping.master, &master_addr, &Request::Delete(key.to_string()))
            .await?;
        self.expect_success(resp)?;

        self.replicate(&mapping, ReplicateOp::Delete(key.to_string()))
            .await;
        Ok(())
    }

    async fn replicate(&self, mapping: &ShardMapping, op: ReplicateOp) {
        for slave in &mapping.slaves {
            let Ok(addr) = self.address_of(slave).await else {
                continue;
            };
            let req = Request::Replicate(op.clone());
            if let Err(e) = self.rpc_call(slave, &addr, &req).await {
                warn!(node = %slave, error = %e, "replication to slave failed");
            }
        }
    }

    /// Fetches `key` from its shard's master; if the master is
    /// unreachable, fails over to the first reachable slave (spec.md
    /// §4.6: reads may be served by any replica, unlike writes).
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<VectorRecord> {
        let shard = shard_id(key, self.config.shard_count);
        let mapping = self.mapping_for(shard)?;

        let mut candidates = vec![mapping.master.clone()];
        candidates.extend(mapping.slaves.iter().cloned());

        let mut last_err = None;
        for node in candidates {
            let addr = match self.address_of(&node).await {
                Ok(a) => a,
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            };
            match self.rpc_call(&node, &addr, &Request::Get(key.to_string())).await {
                Ok(Response::Record(record)) => return Ok(record),
                Ok(Response::Error { kind, message }) => return Err(kind.into_mesh_error(message)),
                Ok(_) => return Err(MeshError::unavailable("unexpected response type from data node")),
                Err(e) => {
                    warn!(node = %node, error = %e, "get failed, trying next replica");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| MeshError::unavailable("no reachable replica for shard")))
    }

    /// Broadcasts a search to every live node, merges results by
    /// ascending score with first-seen-wins deduplication by key
    /// (matching the original's `seen_keys` set, which keeps the first
    /// occurrence a node reports rather than the lowest score), and
    /// truncates to `top_k`.
    #[instrument(skip(self, req))]
    pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
        let nodes = self.membership.live_nodes();
        if nodes.is_empty() {
            return Err(MeshError::unavailable("no live data nodes"));
        }

        let top_k = req.top_k;
        let mut handles = Vec::with_capacity(nodes.len());
        for (node_id, address) in nodes {
            let pool = self.pool.clone();
            let membership = self.membership.clone();
            let timeout = self.call_timeout();
            let req = Request::Search(req.clone());
            handles.push(tokio::spawn(async move {
                let mut client = match pool.borrow(&address).await {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(node = %node_id, error = %e, "search: node unreachable");
                        return None;
                    }
                };
                match client.call(&req, timeout).await {
                    Ok(Response::Search(resp)) => {
                        pool.release(&address, client).await;
                        Some(resp)
                    }
                    Ok(_) => {
                        pool.release(&address, client).await;
                        None
                    }
                    Err(e) => {
                        pool.close_all(&address).await;
                        membership.evict(&node_id).await;
                        warn!(node = %node_id, error = %e, "search: rpc failed");
                        None
                    }
                }
            }));
        }

        let mut merged: Vec<(String, f32, Vec<f32>)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for handle in handles {
            let Some(resp) = handle.await.unwrap_or(None) else {
                continue;
            };
            for ((key, score), vector) in resp
                .keys
                .into_iter()
                .zip(resp.scores)
                .zip(resp.vectors)
            {
                if seen.insert(key.clone()) {
                    merged.push((key, score, vector));
                }
            }
        }

        merged.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        merged.truncate(top_k);

        let mut out = SearchResponse::default();
        for (key, score, vector) in merged {
            out.keys.push(key);
            out.scores.push(score);
            out.vectors.push(vector);
        }
        Ok(out)
    }

    /// Surfaces a node-side failure as the same `MeshError` variant the
    /// node itself raised, rather than collapsing every failed call to
    /// `Unavailable` (spec.md §7: `InvalidInput`/`NotFound`/`IndexError`
    /// must reach the client as-is).
    fn expect_success(&self, resp: Response) -> Result<()> {
        match resp {
            Response::Error { kind, message } => Err(kind.into_mesh_error(message)),
            _ => Ok(()),
        }
    }
}
