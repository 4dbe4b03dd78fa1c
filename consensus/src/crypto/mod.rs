/// Cryptography module for the consensus protocol
///
/// Implements:
/// - ECDSA signatures over NIST P-256 with SHA-256 (node authentication)
/// - Hex wire encoding for keys and signatures
/// - On-disk keystore for per-node signing keys

pub mod ecdsa;
pub mod keystore;

pub use ecdsa::{verify_hex, CryptoError, PublicKey, SecretKey, Signature};
pub use keystore::{Keystore, KeystoreError};
