//! Public key to account identifier derivation

use crc::{Algorithm, Crc};

/// Derives a stable account identifier from raw public key bytes.
pub trait AccountIdResolver: Send + Sync {
	fn derive_account_id(&self, public_key: &[u8]) -> String;
}

/// CRC-32/Koopman parameters (reflected, ones-complemented).
const CRC_32_KOOPMAN_REFLECTED: Algorithm<u32> = Algorithm {
	width: 32,
	poly: 0x741b_8cd7,
	init: 0xffff_ffff,
	refin: true,
	refout: true,
	xorout: 0xffff_ffff,
	check: 0x2d3d_d0ae,
	residue: 0x0000_0000,
};

const PARITY: Crc<u32> = Crc::<u32>::new(&CRC_32_KOOPMAN_REFLECTED);

/// `prefix + base58(public_key ++ crc32_le(public_key))`
#[derive(Debug, Clone)]
pub struct ChecksumAccountIdResolver {
	prefix: String,
}

impl ChecksumAccountIdResolver {
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
		}
	}
}

impl AccountIdResolver for ChecksumAccountIdResolver {
	fn derive_account_id(&self, public_key: &[u8]) -> String {
		let mut payload = Vec::with_capacity(public_key.len() + 4);
		payload.extend_from_slice(public_key);
		payload.extend_from_slice(&PARITY.checksum(public_key).to_le_bytes());

		format!("{}{}", self.prefix, bs58::encode(payload).into_string())
	}
}
