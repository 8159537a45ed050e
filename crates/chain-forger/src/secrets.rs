//! AES-256-GCM encryption of delegate passphrases (the raw ed25519 signing-key
//! seed), keyed by a PBKDF2-HMAC-SHA256 key derived from the unlock password.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use chain_types::ConfigError;
use ed25519_dalek::SigningKey;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const PBKDF2_ROUNDS: u32 = 100_000;

fn derive_key(password: &str, salt: &[u8]) -> Key<Aes256Gcm> {
    let mut key_bytes = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key_bytes);
    key_bytes.into()
}

/// Encrypts a signing key's 32-byte seed under `password`; the hex string this
/// returns is what `ForgingConfig.delegates[].encrypted_passphrase` stores.
pub fn encrypt_passphrase(password: &str, signing_key: &SigningKey) -> String {
    let salt: [u8; SALT_LEN] = rand::random();
    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new(&key);
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, signing_key.to_bytes().as_slice())
        .expect("fixed-size plaintext never exceeds AES-GCM's length limit");

    let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    hex::encode(out)
}

/// Decrypts an `encrypted_passphrase` hex string with `password`, returning the
/// recovered signing key. A wrong password and a corrupted ciphertext are
/// indistinguishable by design; both surface as `ConfigError::WrongPassword`.
pub fn decrypt_passphrase(
    encrypted_hex: &str,
    password: &str,
    public_key_hex: &str,
) -> Result<SigningKey, ConfigError> {
    let bad = || ConfigError::WrongPassword(public_key_hex.to_string());
    let bytes = hex::decode(encrypted_hex).map_err(|_| bad())?;
    if bytes.len() < SALT_LEN + NONCE_LEN {
        return Err(bad());
    }
    let (salt, rest) = bytes.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_key(password, salt);
    let cipher = Aes256Gcm::new(&key);
    let nonce = Nonce::from_slice(nonce_bytes);
    let plaintext = cipher.decrypt(nonce, ciphertext).map_err(|_| bad())?;

    let seed: [u8; 32] = plaintext.try_into().map_err(|_| bad())?;
    let signing_key = SigningKey::from_bytes(&seed);
    if hex::encode(signing_key.verifying_key().to_bytes()) != public_key_hex {
        return Err(bad());
    }
    Ok(signing_key)
}
