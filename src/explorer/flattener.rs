//! Transaction flattening.
//!
//! A transaction bundling N actions becomes N `FlatTransactionRecord`s, one per action, in the
//! order the actions execute on chain. Transfer payloads are decoded into sender, recipient and
//! amount; the publisher's public key is resolved to an account identifier.

use crate::explorer::account::AccountIdResolver;
use crate::explorer::types::*;

use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

/// Action name whose payload carries `[from, to, amount]`.
pub const TRANSFER_ACTION: &str = "Transfer";

/// Decoded action payload
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPayload {
	Transfer { from: String, to: String, amount: f64 },
	/// Any action the explorer does not interpret.
	Opaque,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TransferAmount {
	Number(f64),
	Text(String),
}

impl TransferAmount {
	fn into_f64(self) -> Result<f64, String> {
		match self {
			TransferAmount::Number(value) => Ok(value),
			TransferAmount::Text(text) => text
				.trim()
				.parse::<f64>()
				.map_err(|e| format!("invalid amount {:?}: {}", text, e)),
		}
	}
}

/// Decode the payload of a single action.
pub fn decode_action(action: &RawAction) -> Result<ActionPayload, ExplorerError> {
	if action.action_name != TRANSFER_ACTION {
		return Ok(ActionPayload::Opaque);
	}

	let (from, to, amount): (String, String, TransferAmount) =
		serde_json::from_str(&action.data).map_err(|e| {
			ExplorerError::MalformedPayload(format!(
				"Transfer data {:?} is not [from, to, amount]: {}",
				action.data, e
			))
		})?;

	let amount = amount.into_f64().map_err(ExplorerError::MalformedPayload)?;

	Ok(ActionPayload::Transfer { from, to, amount })
}

#[derive(Clone)]
pub struct TransactionFlattener {
	resolver: Arc<dyn AccountIdResolver>,
}

impl TransactionFlattener {
	pub fn new(resolver: Arc<dyn AccountIdResolver>) -> Self {
		Self { resolver }
	}

	/// Resolve the publisher's account from its base58 public key.
	///
	/// An undecodable key resolves to an empty identifier.
	pub fn publisher_account_id(&self, tx: &RawTransaction) -> String {
		match bs58::decode(&tx.publisher_signature.public_key).into_vec() {
			Ok(public_key) => self.resolver.derive_account_id(&public_key),
			Err(e) => {
				warn!(
					"Transaction {} has an undecodable publisher key: {}",
					tx.hash, e
				);
				String::new()
			}
		}
	}

	/// Project a transaction into one record per action.
	pub fn flatten(&self, tx: &RawTransaction) -> Vec<FlatTransactionRecord> {
		let publisher_account_id = self.publisher_account_id(tx);

		tx.actions
			.iter()
			.enumerate()
			.map(|(action_index, action)| {
				let (from, to, amount) = match decode_action(action) {
					Ok(ActionPayload::Transfer { from, to, amount }) => (from, to, amount),
					Ok(ActionPayload::Opaque) => (String::new(), String::new(), 0.0),
					Err(e) => {
						warn!(
							"Action {} of transaction {}: {}",
							action_index, tx.hash, e
						);
						(String::new(), String::new(), 0.0)
					}
				};

				FlatTransactionRecord {
					block_number: tx.block_number,
					time: tx.time,
					hash: tx.hash.clone(),
					expiration: tx.expiration,
					gas_price: tx.gas_price,
					gas_limit: tx.gas_limit,
					action: action.clone(),
					action_index,
					action_name: action.action_name.clone(),
					signer_addresses: tx.signer_addresses.clone(),
					signatures: tx.signatures.clone(),
					publisher_account_id: publisher_account_id.clone(),
					from,
					to,
					amount,
				}
			})
			.collect()
	}
}
