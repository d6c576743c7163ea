//! Wire protocol, framed transport, client, and server loop.
//!
//! The spec (spec.md §6) fixes the RPC *surface* — which calls exist and
//! what they carry — but leaves the wire encoding unspecified. This
//! module picks one: a length-prefixed [`bincode`] frame (`u32`
//! big-endian length, then payload) over [`tokio::net::TcpStream`],
//! reusing the `bincode` dependency the teacher already carries for its
//! on-disk structures rather than introducing a codegen-based RPC stack
//! (see SPEC_FULL.md's ambient RPC section for the rejected
//! `tonic`/`prost` alternative).

pub mod proto;
mod server;
mod transport;

pub use proto::{ErrorKind, ReplicateOp, Request, Response, SearchRequest, SearchResponse};
pub use server::{CoordinatorServer, DataNodeServer};
pub use transport::RpcClient;
