//! RPC server loops for the data-node and coordinator roles.
//!
//! Each server accepts connections on a [`tokio::net::TcpListener`] and
//! spawns one task per connection, reading request frames and writing
//! response frames in a loop until the peer disconnects — the bounded
//! worker-pool-per-node model spec.md §5 describes, realized as tokio
//! tasks rather than OS threads.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::node::DataNodeHandler;
use crate::rpc::proto::{ErrorKind, ReplicateOp, Request, Response, SearchResponse};
use crate::rpc::transport::{read_frame, write_frame};
use crate::types::NodeId;

/// Serves the data-node RPC surface (`put, delete, get, search,
/// replicate, replay_wal, offline`) for one [`DataNodeHandler`].
pub struct DataNodeServer {
    handler: Arc<DataNodeHandler>,
    max_frame_size: u32,
}

impl DataNodeServer {
    /// Wraps a handler for serving.
    pub fn new(handler: Arc<DataNodeHandler>, max_frame_size: u32) -> Self {
        Self {
            handler,
            max_frame_size,
        }
    }

    /// Accepts connections from `listener` until it errors, spawning a
    /// task per connection. Runs until the listener is closed.
    pub async fn serve(self: Arc<Self>, listener: tokio::net::TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            let this = self.clone();
            tokio::spawn(async move {
                if let Err(e) = this.handle_connection(stream).await {
                    warn!(peer = %peer, error = %e, "data node connection ended with error");
                }
            });
        }
    }

    async fn handle_connection(&self, mut stream: tokio::net::TcpStream) -> Result<()> {
        loop {
            let req: Request = match read_frame(&mut stream, self.max_frame_size).await {
                Ok(req) => req,
                Err(e) if e.is_transport() => return Ok(()),
                Err(e) => return Err(e),
            };
            let resp = self.dispatch(req).await;
            write_frame(&mut stream, &resp, self.max_frame_size).await?;
        }
    }

    #[instrument(skip(self, req))]
    async fn dispatch(&self, req: Request) -> Response {
        let handler = self.handler.clone();
        match tokio::task::spawn_blocking(move || Self::dispatch_blocking(&handler, req)).await {
            Ok(resp) => resp,
            Err(e) => Response::error_with(ErrorKind::Unavailable, format!("handler task panicked: {e}")),
        }
    }

    fn dispatch_blocking(handler: &DataNodeHandler, req: Request) -> Response {
        match req {
            Request::Put(record) => match handler.put(record) {
                Ok(()) => Response::ok(),
                Err(e) => Response::error(&e),
            },
            Request::Delete(key) => match handler.delete(&key) {
                Ok(()) => Response::ok(),
                Err(e) => Response::error(&e),
            },
            Request::Get(key) => match handler.get(&key) {
                Ok(record) => Response::Record(record),
                Err(e) => Response::error(&e),
            },
            Request::Search(search_req) => {
                let filter = search_req
                    .filter
                    .map(crate::filter::SearchFilter::from_raw);
                match handler.search(
                    &search_req.query_vector,
                    search_req.top_k,
                    filter.as_ref(),
                    search_req.threshold,
                ) {
                    Ok(hits) => {
                        let mut resp = SearchResponse::default();
                        for (record, score) in hits {
                            resp.keys.push(record.key);
                            resp.scores.push(score);
                            resp.vectors.push(record.vector);
                        }
                        Response::Search(resp)
                    }
                    Err(e) => Response::error(&e),
                }
            }
            Request::Replicate(ReplicateOp::Put(record)) => match handler.replicate_put(record) {
                Ok(()) => Response::ok(),
                Err(e) => Response::error(&e),
            },
            Request::Replicate(ReplicateOp::Delete(key)) => {
                match handler.replicate_delete(&key) {
                    Ok(()) => Response::ok(),
                    Err(e) => Response::error(&e),
                }
            }
            Request::ReplayWal => match handler.replay_wal() {
                Ok(()) => Response::ok(),
                Err(e) => Response::error(&e),
            },
            Request::Offline => match handler.offline() {
                Ok(()) => Response::ok(),
                Err(e) => Response::error(&e),
            },
            Request::RegisterNode { .. } | Request::ListNodes => {
                Response::error_with(ErrorKind::InvalidInput, "unsupported request for a data node")
            }
        }
    }
}

/// Serves the coordinator RPC surface (`register_node, list_nodes, put,
/// delete, get, search`).
pub struct CoordinatorServer {
    coordinator: Arc<Coordinator>,
    max_frame_size: u32,
}

impl CoordinatorServer {
    /// Wraps a coordinator for serving.
    pub fn new(coordinator: Arc<Coordinator>, max_frame_size: u32) -> Self {
        Self {
            coordinator,
            max_frame_size,
        }
    }

    /// Accepts connections from `listener` until it errors, spawning a
    /// task per connection.
    pub async fn serve(self: Arc<Self>, listener: tokio::net::TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            let this = self.clone();
            tokio::spawn(async move {
                if let Err(e) = this.handle_connection(stream).await {
                    warn!(peer = %peer, error = %e, "coordinator connection ended with error");
                }
            });
        }
    }

    async fn handle_connection(&self, mut stream: tokio::net::TcpStream) -> Result<()> {
        loop {
            let req: Request = match read_frame(&mut stream, self.max_frame_size).await {
                Ok(req) => req,
                Err(e) if e.is_transport() => return Ok(()),
                Err(e) => return Err(e),
            };
            let resp = self.dispatch(req).await;
            write_frame(&mut stream, &resp, self.max_frame_size).await?;
        }
    }

    #[instrument(skip(self, req))]
    async fn dispatch(&self, req: Request) -> Response {
        match req {
            Request::RegisterNode { node_id, address } => {
                match self
                    .coordinator
                    .register_node(NodeId::new(node_id.clone()), &address)
                    .await
                {
                    Ok(()) => Response::Success {
                        message: format!("node {node_id} registered, placement recomputed"),
                    },
                    Err(e) => Response::error(&e),
                }
            }
            Request::ListNodes => {
                let nodes = self.coordinator.list_nodes();
                Response::Nodes(
                    nodes
                        .into_iter()
                        .map(|(id, addr)| (id.as_str().to_string(), addr))
                        .collect(),
                )
            }
            Request::Put(record) => match self.coordinator.put(record).await {
                Ok(()) => Response::ok(),
                Err(e) => Response::error(&e),
            },
            Request::Delete(key) => match self.coordinator.delete(&key).await {
                Ok(()) => Response::ok(),
                Err(e) => Response::error(&e),
            },
            Request::Get(key) => match self.coordinator.get(&key).await {
                Ok(record) => Response::Record(record),
                Err(e) => Response::error(&e),
            },
            Request::Search(search_req) => match self.coordinator.search(search_req).await {
                Ok(resp) => Response::Search(resp),
                Err(e) => Response::error(&e),
            },
            Request::Replicate(_) | Request::ReplayWal | Request::Offline => {
                Response::error_with(ErrorKind::InvalidInput, "unsupported request for the coordinator")
            }
        }
    }
}
