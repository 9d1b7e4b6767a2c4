//! Pluggable encryption for token cache entries.
//!
//! The token manager only ever writes ciphertext produced by a [`TokenCipher`] into a
//! [`TokenCache`](crate::store::TokenCache). [`ChaChaTokenCipher`] is the built-in
//! implementation: ChaCha20-Poly1305 over a process-held 256-bit key, with a fresh random nonce
//! per encryption and the `nonce || ciphertext` pair encoded as standard base64.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use chacha20poly1305::{
	ChaCha20Poly1305, Nonce,
	aead::{Aead, KeyInit},
};
use rand::Rng;
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Encrypt/decrypt capability over a fixed process-held key.
pub trait TokenCipher
where
	Self: Send + Sync,
{
	/// Encrypts `plaintext` into an opaque, storage-safe string.
	fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;

	/// Decrypts a string previously produced by [`TokenCipher::encrypt`].
	fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}

/// Errors produced by [`TokenCipher`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CipherError {
	/// Ciphertext is not valid base64 or is too short to hold a nonce and tag.
	#[error("Ciphertext encoding is invalid: {message}.")]
	Encoding {
		/// Human-readable error payload.
		message: String,
	},
	/// Encryption failed.
	#[error("Encryption failed.")]
	Encrypt,
	/// Authentication failed (tampered blob or different key).
	#[error("Decryption failed.")]
	Decrypt,
	/// Decrypted bytes are not a valid token envelope.
	#[error("Decrypted payload is invalid: {message}.")]
	Envelope {
		/// Human-readable error payload.
		message: String,
	},
}

/// ChaCha20-Poly1305 cipher over a 256-bit key.
#[derive(Clone)]
pub struct ChaChaTokenCipher {
	cipher: ChaCha20Poly1305,
}
impl ChaChaTokenCipher {
	/// Builds a cipher from raw key bytes.
	pub fn from_key(key: [u8; 32]) -> Self {
		Self { cipher: ChaCha20Poly1305::new(&key.into()) }
	}

	/// Derives the key from an application passphrase with SHA-256.
	pub fn derive(passphrase: &str) -> Self {
		let digest: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();

		Self::from_key(digest)
	}

	/// Generates a random process-local key; entries sealed with it do not survive a restart.
	pub fn generate() -> Self {
		let mut key = [0_u8; 32];

		rand::rng().fill(&mut key);

		Self::from_key(key)
	}
}
impl TokenCipher for ChaChaTokenCipher {
	fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
		let mut nonce = [0_u8; NONCE_LEN];

		rand::rng().fill(&mut nonce);

		let sealed = self
			.cipher
			.encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
			.map_err(|_| CipherError::Encrypt)?;
		let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());

		blob.extend_from_slice(&nonce);
		blob.extend_from_slice(&sealed);

		Ok(STANDARD.encode(blob))
	}

	fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
		let blob = STANDARD
			.decode(ciphertext.trim())
			.map_err(|e| CipherError::Encoding { message: e.to_string() })?;

		if blob.len() < NONCE_LEN + TAG_LEN {
			return Err(CipherError::Encoding {
				message: format!("blob holds {} bytes", blob.len()),
			});
		}

		let (nonce, sealed) = blob.split_at(NONCE_LEN);
		let plain =
			self.cipher.decrypt(Nonce::from_slice(nonce), sealed).map_err(|_| CipherError::Decrypt)?;

		String::from_utf8(plain).map_err(|e| CipherError::Envelope { message: e.to_string() })
	}
}
impl Debug for ChaChaTokenCipher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ChaChaTokenCipher(<redacted>)")
	}
}
