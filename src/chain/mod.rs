//! Chain node integration module
//!
//! This module provides the RPC client and wire types used to talk to the blockchain node's
//! HTTP gateway. Everything here mirrors the node's JSON framing; translation into the explorer's
//! own record types happens in `explorer::fetcher`.

/// HTTP client for the node gateway
mod client;
/// Wire types returned by the node gateway
mod types;

pub use client::{ChainRpc, HttpChainClient};
pub use types::*;
