/// ECDSA signature implementation for protocol messages
///
/// Uses the NIST P-256 curve with SHA-256 bound in as the digest.
/// All signed protocol messages are plain UTF-8 strings; signer and
/// verifier must construct them byte-for-byte identically.

use p256::ecdsa::{
    signature::{Signer, Verifier},
    Signature as P256Signature, SigningKey, VerifyingKey,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid key")]
    InvalidKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid hex encoding")]
    InvalidHex,
}

/// ECDSA secret key (P-256)
#[derive(Clone)]
pub struct SecretKey {
    inner: SigningKey,
}

impl SecretKey {
    /// Generate a new random secret key
    pub fn generate() -> Self {
        let inner = SigningKey::random(&mut rand::thread_rng());
        Self { inner }
    }

    /// Create from raw scalar bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let inner = SigningKey::from_slice(bytes).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self { inner })
    }

    /// Create from a hex string
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: self.inner.verifying_key().clone(),
        }
    }

    /// Serialize to raw scalar bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.to_bytes().to_vec()
    }

    /// Serialize to a hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Sign a protocol message
    pub fn sign(&self, message: &str) -> Signature {
        let signature: P256Signature = self.inner.sign(message.as_bytes());
        Signature { inner: signature }
    }
}

/// ECDSA public key (P-256)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Create from SEC1-encoded bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let inner = VerifyingKey::from_sec1_bytes(bytes).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self { inner })
    }

    /// Create from a hex string
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }

    /// Serialize to SEC1 bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.to_sec1_bytes().to_vec()
    }

    /// Serialize to a hex string (the registry wire form)
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Verify a signature over a protocol message
    ///
    /// Verification is a pure predicate: any failure yields `false`.
    pub fn verify(&self, message: &str, signature: &Signature) -> bool {
        self.inner.verify(message.as_bytes(), &signature.inner).is_ok()
    }
}

/// ECDSA signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    inner: P256Signature,
}

impl Signature {
    /// Create from raw fixed-width bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let inner = P256Signature::from_slice(bytes).map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self { inner })
    }

    /// Create from a hex string
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }

    /// Serialize to raw fixed-width bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.to_bytes().to_vec()
    }

    /// Serialize to a hex string (the message wire form)
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// Verify a hex-encoded signature against a hex-encoded public key.
///
/// This is the boundary every inbound protocol message passes through.
/// Malformed hex, wrong-length bytes, or a structurally invalid signature
/// all fail closed: the result is `false`, never an error or panic.
pub fn verify_hex(public_key_hex: &str, message: &str, signature_hex: &str) -> bool {
    let Ok(public_key) = PublicKey::from_hex(public_key_hex) else {
        return false;
    };
    let Ok(signature) = Signature::from_hex(signature_hex) else {
        return false;
    };
    public_key.verify(message, &signature)
}
