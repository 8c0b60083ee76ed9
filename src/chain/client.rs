//!
//! HTTP client for the blockchain node gateway.
//!
//! This module provides an async client for the node's JSON gateway. It exposes the handful of
//! lookups the explorer needs (chain head, block by height, transaction and receipt by hash) behind
//! the `ChainRpc` trait so sync jobs can be exercised against an in-process fake.

use super::types::*;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Lookups the explorer performs against the chain node.
#[async_trait::async_trait]
pub trait ChainRpc: Send + Sync {
	async fn get_chain_info(&self) -> Result<RpcChainInfo, ChainError>;

	async fn get_block_by_height(&self, height: i64) -> Result<RpcBlock, ChainError>;

	async fn get_transaction_by_hash(&self, hash: &str) -> Result<RpcTransaction, ChainError>;

	async fn get_receipt_by_hash(&self, hash: &str) -> Result<RpcTxReceipt, ChainError>;
}

/// Node gateway client
#[derive(Clone)]
pub struct HttpChainClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// Base URL of the node gateway, without a trailing slash.
	base_url: String,
}

impl HttpChainClient {
	/// Create a new gateway client.
	///
	/// # Arguments
	/// * `base_url` - The HTTP endpoint of the node gateway.
	/// * `timeout` - Per-request timeout.
	pub fn new(base_url: String, timeout: Duration) -> Result<Self, ChainError> {
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	/// Issue a GET against the gateway and decode the JSON body.
	///
	/// `envelope` names the field the payload is wrapped in, if any. A 404 or a body whose
	/// message reports a missing object is surfaced as `ChainError::NotFound`.
	async fn get_json<T: DeserializeOwned>(
		&self,
		path: &str,
		envelope: Option<&str>,
	) -> Result<T, ChainError> {
		let url = format!("{}/{}", self.base_url, path);
		debug!("GET {}", url);

		let response = self.http_client.get(&url).send().await?;
		let status = response.status();

		if status == StatusCode::NOT_FOUND {
			return Err(ChainError::NotFound(path.to_string()));
		}

		let body = response.text().await?;

		if !status.is_success() {
			if body.to_ascii_lowercase().contains("not found") {
				return Err(ChainError::NotFound(path.to_string()));
			}
			return Err(ChainError::Status(status.as_u16(), body));
		}

		let value: Value = serde_json::from_str(&body)?;
		let payload = match envelope {
			Some(field) => value
				.get(field)
				.cloned()
				.ok_or_else(|| ChainError::Decode(format!("Response missing `{}` field", field)))?,
			None => value,
		};

		if payload.is_null() {
			return Err(ChainError::NotFound(path.to_string()));
		}

		Ok(serde_json::from_value(payload)?)
	}
}

#[async_trait::async_trait]
impl ChainRpc for HttpChainClient {
	async fn get_chain_info(&self) -> Result<RpcChainInfo, ChainError> {
		self.get_json("getChainInfo", None).await
	}

	async fn get_block_by_height(&self, height: i64) -> Result<RpcBlock, ChainError> {
		self.get_json(&format!("getBlockByNumber/{}/false", height), Some("block"))
			.await
	}

	async fn get_transaction_by_hash(&self, hash: &str) -> Result<RpcTransaction, ChainError> {
		self.get_json(&format!("getTxByHash/{}", hash), Some("transaction"))
			.await
	}

	async fn get_receipt_by_hash(&self, hash: &str) -> Result<RpcTxReceipt, ChainError> {
		self.get_json(&format!("getTxReceiptByTxHash/{}", hash), None)
			.await
	}
}
