//! JSON-RPC client for the host automation runtime.
//!
//! The host runtime owns the object/state registry and the message
//! transport to notification adapter instances. bkpost only ever talks to
//! it as a client.
//!
//! ## Architecture
//!
//! - `protocol`: JSON-RPC 2.0 request/response types
//! - `client`: TCP client with newline-delimited JSON framing

pub mod client;
mod protocol;

pub use client::{ClientError, RpcClient};
pub use protocol::{Request, Response, RpcError};

/// Read an object from the registry. Params: `{"id": "..."}`.
pub const METHOD_GET_OBJECT: &str = "objects.get";
/// Read a state from the registry. Params: `{"id": "..."}`.
pub const METHOD_GET_STATE: &str = "states.get";
/// Forward a message to an adapter instance.
/// Params: `{"instance": "...", "command": "...", "message": {...}}`.
pub const METHOD_SEND_TO: &str = "messages.sendTo";
