//! Membership: the external coordination-service abstraction, an
//! in-memory reference implementation, and the coordinator's locally
//! cached, actively health-probed view of it.
//!
//! Grounded on `examples/original_source/src/coordinator/zk_manager.py`:
//! the original talks to ZooKeeper through a small path-based API
//! (`create` ephemeral/persistent nodes, `get_children`, a watch
//! callback) and layers a local cache with a periodic TCP liveness
//! probe on top. [`MembershipStore`] is that path-based API as a trait
//! so the coordinator doesn't hard-depend on any particular
//! coordination service; [`MemoryMembershipStore`] is an in-process
//! stand-in suitable for tests and single-binary demos.

use std::collections::HashMap;
use std::future::poll_fn;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use atomic_waker::AtomicWaker;
use crossbeam_channel::{unbounded, Receiver, Sender};
use futures_core::Stream;
use tokio::net::TcpStream;
use tracing::{debug, instrument, warn};

use crate::error::{MeshError, NotFoundError, Result};

/// A path-based coordination-service client (ZooKeeper-shaped).
///
/// Paths are plain strings (e.g. `"/nodes/node-1"`); there is no
/// hierarchical traversal beyond `list_children`, matching how the
/// original only ever uses a flat `/nodes/<id>` namespace.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Creates (or overwrites) an ephemeral node at `path` with `data`.
    /// Ephemeral nodes are expected to disappear if the owning session
    /// ends; the in-memory store has no session concept and treats this
    /// identically to [`MembershipStore::put`].
    async fn put_ephemeral(&self, path: &str, data: String) -> Result<()>;

    /// Creates or overwrites a persistent node at `path` with `data`.
    async fn put(&self, path: &str, data: String) -> Result<()>;

    /// Fetches the data stored at `path`, if any node exists there.
    async fn get(&self, path: &str) -> Result<Option<String>>;

    /// Lists the immediate child names under `path` (not full paths).
    async fn list_children(&self, path: &str) -> Result<Vec<String>>;

    /// Returns a stream that yields the current children of `path`
    /// every time that set changes, starting with the current value.
    async fn watch_children(&self, path: &str) -> Result<ChildWatch>;

    /// Removes the node at `path`, if present.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// A stream of child-list snapshots for a watched path.
pub struct ChildWatch {
    receiver: Receiver<Vec<String>>,
    waker: Arc<AtomicWaker>,
}

impl Stream for ChildWatch {
    type Item = Vec<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.receiver.try_recv() {
            Ok(children) => Poll::Ready(Some(children)),
            Err(crossbeam_channel::TryRecvError::Empty) => {
                self.waker.register(cx.waker());
                match self.receiver.try_recv() {
                    Ok(children) => Poll::Ready(Some(children)),
                    Err(crossbeam_channel::TryRecvError::Empty) => Poll::Pending,
                    Err(crossbeam_channel::TryRecvError::Disconnected) => Poll::Ready(None),
                }
            }
            Err(crossbeam_channel::TryRecvError::Disconnected) => Poll::Ready(None),
        }
    }
}

impl ChildWatch {
    /// Awaits the next snapshot without requiring `StreamExt`, since
    /// this crate only carries `futures-core` (not `futures-util`) as a
    /// non-dev dependency.
    pub async fn next(&mut self) -> Option<Vec<String>> {
        poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }
}

#[derive(Default)]
struct StoreState {
    nodes: HashMap<String, String>,
    watchers: HashMap<String, Vec<(Sender<Vec<String>>, Arc<AtomicWaker>)>>,
}

/// An in-memory [`MembershipStore`], suitable for tests and
/// single-process demos where no real coordination service is running.
#[derive(Clone, Default)]
pub struct MemoryMembershipStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryMembershipStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn parent_of(path: &str) -> String {
        match path.trim_end_matches('/').rsplit_once('/') {
            Some((parent, _)) if !parent.is_empty() => parent.to_string(),
            _ => "/".to_string(),
        }
    }

    fn children_of(state: &StoreState, path: &str) -> Vec<String> {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path.trim_end_matches('/'))
        };
        let mut names: Vec<String> = state
            .nodes
            .keys()
            .filter_map(|k| {
                let rest = k.strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('/') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn notify_parent(state: &mut StoreState, path: &str) {
        let parent = Self::parent_of(path);
        let children = Self::children_of(state, &parent);
        if let Some(watchers) = state.watchers.get_mut(&parent) {
            watchers.retain(|(tx, waker)| {
                let alive = tx.send(children.clone()).is_ok();
                if alive {
                    waker.wake();
                }
                alive
            });
        }
    }
}

#[async_trait]
impl MembershipStore for MemoryMembershipStore {
    async fn put_ephemeral(&self, path: &str, data: String) -> Result<()> {
        self.put(path, data).await
    }

    async fn put(&self, path: &str, data: String) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.nodes.insert(path.to_string(), data);
        Self::notify_parent(&mut state, path);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.nodes.get(path).cloned())
    }

    async fn list_children(&self, path: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(Self::children_of(&state, path))
    }

    async fn watch_children(&self, path: &str) -> Result<ChildWatch> {
        let (tx, rx) = unbounded();
        let waker = Arc::new(AtomicWaker::new());
        let mut state = self.state.lock().unwrap();
        let current = Self::children_of(&state, path);
        let _ = tx.send(current);
        state
            .watchers
            .entry(path.to_string())
            .or_default()
            .push((tx, waker.clone()));
        Ok(ChildWatch { receiver: rx, waker })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.nodes.remove(path);
        Self::notify_parent(&mut state, path);
        Ok(())
    }
}

/// One node's cached membership record.
#[derive(Clone, Debug)]
pub struct NodeInfo {
    /// The node's `host:port` address.
    pub address: String,
    /// Last time this node answered its TCP health probe, as millis
    /// since start; `None` until the first successful probe.
    pub last_seen_alive: bool,
}

/// The coordinator's local, actively-maintained view of cluster
/// membership: a cache kept current by a watch on `/nodes` plus a
/// periodic TCP connect probe that evicts unreachable nodes from both
/// the cache and the backing store (spec.md §4.7 / §4.9).
pub struct MembershipCache {
    store: Arc<dyn MembershipStore>,
    nodes: Arc<Mutex<HashMap<String, NodeInfo>>>,
    probe_interval: Duration,
    probe_timeout: Duration,
}

const NODES_PATH: &str = "/nodes";

impl MembershipCache {
    /// Builds a cache backed by `store`, not yet populated or watching.
    /// Call [`MembershipCache::start`] to begin the background tasks.
    pub fn new(store: Arc<dyn MembershipStore>, probe_interval: Duration, probe_timeout: Duration) -> Self {
        Self {
            store,
            nodes: Arc::new(Mutex::new(HashMap::new())),
            probe_interval,
            probe_timeout,
        }
    }

    /// Registers `node_id` at `address` in the backing store as an
    /// ephemeral node, so the cluster's watchers observe it.
    #[instrument(skip(self))]
    pub async fn register(&self, node_id: &str, address: &str) -> Result<()> {
        self.store
            .put_ephemeral(&format!("{NODES_PATH}/{node_id}"), address.to_string())
            .await?;
        self.nodes.lock().unwrap().insert(
            node_id.to_string(),
            NodeInfo {
                address: address.to_string(),
                last_seen_alive: true,
            },
        );
        Ok(())
    }

    /// Loads the current `/nodes` children into the cache immediately,
    /// without waiting for the watch task to fire.
    pub async fn refresh_once(&self) -> Result<()> {
        let children = self.store.list_children(NODES_PATH).await?;
        let mut nodes = self.nodes.lock().unwrap();
        for child in &children {
            if !nodes.contains_key(child) {
                nodes.insert(
                    child.clone(),
                    NodeInfo {
                        address: String::new(),
                        last_seen_alive: true,
                    },
                );
            }
        }
        drop(nodes);
        for child in children {
            if let Some(data) = self.store.get(&format!("{NODES_PATH}/{child}")).await? {
                self.nodes.lock().unwrap().entry(child).and_modify(|info| {
                    info.address = data;
                });
            }
        }
        Ok(())
    }

    /// Spawns the watch-refresh and health-probe background tasks. The
    /// returned handles are detached; dropping the cache does not stop
    /// them (they hold a clone of the `Arc` state, matching the
    /// original's daemon-thread watcher/heartbeat loops that run for the
    /// coordinator process's whole lifetime).
    pub fn start(self: &Arc<Self>) {
        let watch_handle = self.clone();
        tokio::spawn(async move {
            if let Err(e) = watch_handle.run_watch_loop().await {
                warn!(error = %e, "membership watch loop exited");
            }
        });

        let probe_handle = self.clone();
        tokio::spawn(async move {
            probe_handle.run_probe_loop().await;
        });
    }

    async fn run_watch_loop(&self) -> Result<()> {
        let mut watch = self.store.watch_children(NODES_PATH).await?;
        while let Some(children) = watch.next().await {
            let mut nodes = self.nodes.lock().unwrap();
            nodes.retain(|id, _| children.contains(id));
            for child in &children {
                nodes.entry(child.clone()).or_insert_with(|| NodeInfo {
                    address: String::new(),
                    last_seen_alive: true,
                });
            }
            drop(nodes);
            for child in children {
                if let Ok(Some(data)) = self.store.get(&format!("{NODES_PATH}/{child}")).await {
                    self.nodes.lock().unwrap().entry(child).and_modify(|info| {
                        info.address = data;
                    });
                }
            }
        }
        Ok(())
    }

    async fn run_probe_loop(&self) {
        let mut ticker = tokio::time::interval(self.probe_interval);
        loop {
            ticker.tick().await;
            let snapshot: Vec<(String, String)> = self
                .nodes
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, info)| !info.address.is_empty())
                .map(|(id, info)| (id.clone(), info.address.clone()))
                .collect();
            for (node_id, address) in snapshot {
                let alive = self.probe(&address).await;
                if !alive {
                    warn!(node_id = %node_id, address = %address, "node failed health probe, evicting");
                    self.nodes.lock().unwrap().remove(&node_id);
                    let _ = self.store.delete(&format!("{NODES_PATH}/{node_id}")).await;
                } else {
                    debug!(node_id = %node_id, "node health probe ok");
                    if let Some(info) = self.nodes.lock().unwrap().get_mut(&node_id) {
                        info.last_seen_alive = true;
                    }
                }
            }
        }
    }

    async fn probe(&self, address: &str) -> bool {
        let addr: SocketAddr = match address.parse() {
            Ok(a) => a,
            Err(_) => return false,
        };
        tokio::time::timeout(self.probe_timeout, TcpStream::connect(addr))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false)
    }

    /// Returns the current `(node_id, address)` pairs for all nodes
    /// believed alive.
    pub fn live_nodes(&self) -> Vec<(String, String)> {
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, info)| !info.address.is_empty())
            .map(|(id, info)| (id.clone(), info.address.clone()))
            .collect()
    }

    /// Looks up a single node's address.
    pub fn address_of(&self, node_id: &str) -> Result<String> {
        self.nodes
            .lock()
            .unwrap()
            .get(node_id)
            .filter(|info| !info.address.is_empty())
            .map(|info| info.address.clone())
            .ok_or_else(|| MeshError::from(NotFoundError::node(node_id)))
    }

    /// Returns true if `node_id` is currently present in the cache.
    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.lock().unwrap().contains_key(node_id)
    }

    /// Marks `node_id` offline immediately: removes it from the cache and
    /// the backing store, the same eviction the health probe performs on
    /// a failed connect (spec.md §7(b): a detected transport failure must
    /// remove the node from the routing set so later requests fail over
    /// rather than retrying the same dead node).
    #[instrument(skip(self))]
    pub async fn evict(&self, node_id: &str) {
        warn!(node_id = %node_id, "evicting node after transport failure");
        self.nodes.lock().unwrap().remove(node_id);
        let _ = self.store.delete(&format!("{NODES_PATH}/{node_id}")).await;
    }
}
