//! AES-256-GCM encrypting adapter.
//!
//! The key is derived once per adapter with Argon2id from `username:password`
//! and a fixed application salt. The salt only separates this key space from
//! other uses of the same credentials, so it does not need to be per-file.
//! Every serialize call draws a fresh 96-bit IV; output is `ivHex:ciphertextHex`.

use super::{Adapter, JsonAdapter};
use crate::document::Document;
use crate::error::{Result, VaultDbError};
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::Argon2;
use std::fmt;

/// IV size in bytes.
pub const IV_SIZE: usize = 12;

const KEY_SIZE: usize = 32;
const KEY_SALT: &[u8] = b"vaultdb.collection.v1";

/// Username/password pair used to derive the collection key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Pair two optional parts. Both must be present and non-empty.
    pub fn from_parts(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some(Self::new(u, p)),
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// JSON codec that encrypts the whole collection when credentials are given.
pub struct EncryptedAdapter {
    cipher: Option<Aes256Gcm>,
}

impl EncryptedAdapter {
    /// Without credentials (or with an empty part) this is a plain JSON codec.
    pub fn new(credentials: Option<Credentials>) -> Result<Self> {
        let cipher = match credentials {
            Some(c) if !c.username.is_empty() && !c.password.is_empty() => {
                let key = derive_key(&c)?;
                Some(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)))
            }
            Some(_) => {
                log::warn!("Incomplete credentials supplied, collection will not be encrypted");
                None
            }
            None => None,
        };
        Ok(EncryptedAdapter { cipher })
    }

    /// Shorthand for `new(None)`.
    pub fn plain() -> Self {
        EncryptedAdapter { cipher: None }
    }

    pub fn is_encrypting(&self) -> bool {
        self.cipher.is_some()
    }
}

impl fmt::Debug for EncryptedAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedAdapter")
            .field("algorithm", &"AES-256-GCM")
            .field("encrypting", &self.is_encrypting())
            .finish()
    }
}

impl Adapter for EncryptedAdapter {
    fn serialize(&self, documents: &[Document]) -> Result<String> {
        let cipher = match &self.cipher {
            Some(cipher) => cipher,
            None => return JsonAdapter.serialize(documents),
        };

        let plaintext = serde_json::to_vec(documents)?;

        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut iv);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_slice())
            .map_err(|e| VaultDbError::Serialization(format!("encryption failed: {e}")))?;

        Ok(format!("{}:{}", encode_hex(&iv), encode_hex(&ciphertext)))
    }

    fn deserialize(&self, text: &str) -> Result<Vec<Document>> {
        let cipher = match &self.cipher {
            Some(cipher) => cipher,
            None => return JsonAdapter.deserialize(text),
        };

        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let (iv_hex, ciphertext_hex) = text.split_once(':').ok_or_else(|| {
            VaultDbError::Serialization("expected 'iv:ciphertext' framing".into())
        })?;
        let iv = decode_hex(iv_hex)?;
        if iv.len() != IV_SIZE {
            return Err(VaultDbError::Serialization(format!(
                "IV must be {IV_SIZE} bytes, got {}",
                iv.len()
            )));
        }
        let ciphertext = decode_hex(ciphertext_hex)?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|e| {
                VaultDbError::Serialization(format!(
                    "decryption failed (wrong key or corrupted data): {e}"
                ))
            })?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| VaultDbError::Serialization(format!("decrypted payload is not valid JSON: {e}")))
    }
}

fn derive_key(credentials: &Credentials) -> Result<[u8; KEY_SIZE]> {
    let secret = format!("{}:{}", credentials.username, credentials.password);
    let mut key = [0u8; KEY_SIZE];
    Argon2::default()
        .hash_password_into(secret.as_bytes(), KEY_SALT, &mut key)
        .map_err(|e| VaultDbError::Serialization(format!("key derivation failed: {e}")))?;
    Ok(key)
}

fn encode_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

fn decode_hex(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return Err(VaultDbError::Serialization(format!(
            "hex string has odd length {}",
            hex.len()
        )));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| {
                    VaultDbError::Serialization(format!("invalid hex at position {i}"))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<Document> {
        let mut first = doc! { "name" => "Alice", "age" => 30 };
        first.insert("_id", "65a1b2c3d4e5f6a7b8c9d0e1");
        first.insert("createdAt", Utc::now());
        first.insert("updatedAt", Utc::now());
        vec![first, doc! { "name" => "Bob", "age" => 41.5 }]
    }

    fn adapter(user: &str, pass: &str) -> EncryptedAdapter {
        EncryptedAdapter::new(Some(Credentials::new(user, pass))).unwrap()
    }

    #[test]
    fn test_encrypted_round_trip() {
        let adapter = adapter("admin", "hunter2");
        assert!(adapter.is_encrypting());

        let docs = sample();
        let text = adapter.serialize(&docs).unwrap();
        let (iv, body) = text.split_once(':').unwrap();
        assert_eq!(iv.len(), IV_SIZE * 2);
        assert!(body.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!text.contains("Alice"));

        assert_eq!(adapter.deserialize(&text).unwrap(), docs);
    }

    #[test]
    fn test_fresh_iv_per_write() {
        let adapter = adapter("admin", "hunter2");
        let docs = sample();
        let a = adapter.serialize(&docs).unwrap();
        let b = adapter.serialize(&docs).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_credentials_derive_same_key() {
        let text = adapter("admin", "hunter2").serialize(&sample()).unwrap();
        let other = adapter("admin", "hunter2");
        assert_eq!(other.deserialize(&text).unwrap().len(), 2);
    }

    #[test]
    fn test_wrong_key_fails() {
        let text = adapter("admin", "hunter2").serialize(&sample()).unwrap();
        let err = adapter("admin", "wrong").deserialize(&text).unwrap_err();
        assert!(matches!(err, VaultDbError::Serialization(ref m) if m.contains("decryption failed")));
    }

    #[test]
    fn test_corrupted_ciphertext_fails() {
        let adapter = adapter("admin", "hunter2");
        let mut text = adapter.serialize(&sample()).unwrap();
        let last = text.pop().unwrap();
        text.push(if last == '0' { '1' } else { '0' });
        let err = adapter.deserialize(&text).unwrap_err();
        assert!(matches!(err, VaultDbError::Serialization(_)));
    }

    #[test]
    fn test_malformed_framing_fails() {
        let adapter = adapter("admin", "hunter2");
        for bad in ["no-colon-here", "zz:00", "abc:00", "00:0g"] {
            let err = adapter.deserialize(bad).unwrap_err();
            assert!(matches!(err, VaultDbError::Serialization(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn test_plain_mode_without_credentials() {
        for adapter in [
            EncryptedAdapter::new(None).unwrap(),
            EncryptedAdapter::new(Some(Credentials::new("admin", ""))).unwrap(),
        ] {
            assert!(!adapter.is_encrypting());
            let docs = sample();
            let text = adapter.serialize(&docs).unwrap();
            assert!(text.starts_with('['));
            assert_eq!(adapter.deserialize(&text).unwrap(), docs);
        }

        let err = EncryptedAdapter::plain().deserialize("not json").unwrap_err();
        assert!(matches!(err, VaultDbError::Json(_)));
    }

    #[test]
    fn test_credentials_from_parts() {
        assert!(Credentials::from_parts(Some("u"), Some("p")).is_some());
        assert!(Credentials::from_parts(Some("u"), None).is_none());
        assert!(Credentials::from_parts(None, Some("p")).is_none());
        assert!(Credentials::from_parts(Some(""), Some("p")).is_none());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::new("admin", "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
        let adapter = adapter("admin", "hunter2");
        assert!(format!("{adapter:?}").contains("encrypting: true"));
    }

    #[test]
    fn test_hex_round_trip() {
        let bytes = [0u8, 1, 0xab, 0xff];
        assert_eq!(encode_hex(&bytes), "0001abff");
        assert_eq!(decode_hex("0001abff").unwrap(), bytes.to_vec());
    }
}
