//! Thin wrapper over the cryptographic primitives the engine consumes as a library:
//! content hashing, signature verification, and address derivation. Kept deliberately
//! small — the engine never rolls its own crypto, it only calls through here.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

/// 32-byte content hash used for block ids, transaction ids, and the broadhash.
pub fn hash(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

pub fn hash_hex(bytes: &[u8]) -> String {
    hex::encode(hash(bytes))
}

/// Derives the sidechain address for a public key: the hex-lowercase hash, truncated
/// to 20 bytes, matching the common "hash-of-pubkey" address scheme used by
/// delegate-committee chains.
pub fn derive_address(public_key_hex: &str) -> Result<String, hex::FromHexError> {
    let key_bytes = hex::decode(public_key_hex)?;
    let digest = hash(&key_bytes);
    Ok(hex::encode(&digest[..20]))
}

/// Verifies an ed25519 signature over `message` from the holder of `public_key_hex`.
pub fn verify_signature(
    public_key_hex: &str,
    message: &[u8],
    signature_hex: &str,
) -> bool {
    let Ok(key_bytes) = hex::decode(public_key_hex) else { return false };
    let Ok(sig_bytes) = hex::decode(signature_hex) else { return false };
    let Ok(key_arr): Result<[u8; 32], _> = key_bytes.try_into() else { return false };
    let Ok(sig_arr): Result<[u8; 64], _> = sig_bytes.try_into() else { return false };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_arr) else { return false };
    let signature = Signature::from_bytes(&sig_arr);
    verifying_key.verify(message, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_hex(b"abc"), hash_hex(b"abc"));
        assert_ne!(hash_hex(b"abc"), hash_hex(b"abd"));
    }

    #[test]
    fn address_is_20_bytes_hex() {
        let key = SigningKey::generate(&mut OsRng);
        let pk_hex = hex::encode(key.verifying_key().to_bytes());
        let address = derive_address(&pk_hex).unwrap();
        assert_eq!(address.len(), 40);
    }

    #[test]
    fn verify_signature_roundtrip() {
        let key = SigningKey::generate(&mut OsRng);
        let pk_hex = hex::encode(key.verifying_key().to_bytes());
        let msg = b"hello sidechain";
        let sig = key.sign(msg);
        let sig_hex = hex::encode(sig.to_bytes());
        assert!(verify_signature(&pk_hex, msg, &sig_hex));
        assert!(!verify_signature(&pk_hex, b"tampered", &sig_hex));
    }
}
