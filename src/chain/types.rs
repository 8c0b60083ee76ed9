//! Wire types for the node's HTTP gateway

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serialize};

/// Chain head information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcChainInfo {
	/// Height of the newest block known to the node.
	#[serde(deserialize_with = "i64_from_str_or_num")]
	pub head_block: i64,
	/// Height of the last irreversible block.
	#[serde(deserialize_with = "i64_from_str_or_num")]
	pub lib_block: i64,
}

/// A block as returned by `getBlockByNumber` without full transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcBlock {
	pub hash: String,
	pub parent_hash: String,
	#[serde(deserialize_with = "i64_from_str_or_num")]
	pub number: i64,
	pub witness: String,
	#[serde(deserialize_with = "i64_from_str_or_num")]
	pub time: i64,
	/// Hashes of the transactions included in the block, in block order.
	#[serde(default)]
	pub tx_hashes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcAction {
	pub contract: String,
	pub action_name: String,
	pub data: String,
}

/// Signature with its binary fields decoded from the gateway's base64 framing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSignature {
	pub algorithm: i32,
	#[serde(deserialize_with = "bytes_from_base64")]
	pub signature: Vec<u8>,
	#[serde(deserialize_with = "bytes_from_base64")]
	pub public_key: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcTransaction {
	pub hash: String,
	/// Height of the including block, zero when the node does not report it.
	#[serde(default, deserialize_with = "i64_from_str_or_num")]
	pub block_number: i64,
	#[serde(deserialize_with = "i64_from_str_or_num")]
	pub time: i64,
	#[serde(deserialize_with = "i64_from_str_or_num")]
	pub expiration: i64,
	#[serde(deserialize_with = "i64_from_str_or_num")]
	pub gas_price: i64,
	#[serde(deserialize_with = "i64_from_str_or_num")]
	pub gas_limit: i64,
	#[serde(default)]
	pub actions: Vec<RpcAction>,
	#[serde(default, deserialize_with = "vec_bytes_from_base64")]
	pub signers: Vec<Vec<u8>>,
	#[serde(default)]
	pub signatures: Vec<RpcSignature>,
	pub publisher: RpcSignature,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReceiptEntry {
	#[serde(rename = "type")]
	pub type_: i32,
	pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReceiptStatus {
	pub code: i32,
	#[serde(default)]
	pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcTxReceipt {
	#[serde(deserialize_with = "i64_from_str_or_num")]
	pub gas_usage: i64,
	#[serde(default)]
	pub succ_action_num: i32,
	#[serde(default)]
	pub receipts: Vec<RpcReceiptEntry>,
	pub status: RpcReceiptStatus,
}

/// Error types for node RPC calls
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
	#[error("Not found: {0}")]
	NotFound(String),

	#[error("HTTP error: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("Unexpected status {0}: {1}")]
	Status(u16, String),

	#[error("Decode error: {0}")]
	Decode(String),

	#[error("JSON parse error: {0}")]
	Json(#[from] serde_json::Error),
}

impl ChainError {
	/// The node answered, and the object does not exist.
	pub fn is_not_found(&self) -> bool {
		matches!(self, ChainError::NotFound(_))
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StrOrNum {
	Num(i64),
	Str(String),
}

fn i64_from_str_or_num<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
	D: Deserializer<'de>,
{
	match StrOrNum::deserialize(deserializer)? {
		StrOrNum::Num(n) => Ok(n),
		StrOrNum::Str(s) => s.trim().parse::<i64>().map_err(serde::de::Error::custom),
	}
}

fn bytes_from_base64<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
	D: Deserializer<'de>,
{
	let encoded = String::deserialize(deserializer)?;
	STANDARD
		.decode(encoded.as_bytes())
		.map_err(serde::de::Error::custom)
}

fn vec_bytes_from_base64<'de, D>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error>
where
	D: Deserializer<'de>,
{
	Vec::<String>::deserialize(deserializer)?
		.into_iter()
		.map(|encoded| {
			STANDARD
				.decode(encoded.as_bytes())
				.map_err(serde::de::Error::custom)
		})
		.collect()
}
