//! Encryption of the sensitive partition
//!
//! Keys are derived from a passphrase and a per-record salt with Argon2id;
//! field maps are sealed with AES-256-GCM. The salt is not secret but must
//! travel with the blob it protects.

use crate::error::{AnonIdError, Result};
use crate::types::FieldMap;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256 key length in bytes
pub const KEY_LENGTH: usize = 32;
/// GCM nonce length in bytes (96-bit)
pub const NONCE_LENGTH: usize = 12;
/// GCM authentication tag length in bytes
pub const TAG_LENGTH: usize = 16;
/// KDF salt length in bytes
pub const SALT_LENGTH: usize = 16;

/// Opaque output of sealing a field map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedBlob {
    /// Base64-encoded nonce
    #[serde(with = "base64_bytes")]
    pub nonce: Vec<u8>,

    /// Base64-encoded ciphertext, tag excluded
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,

    /// Base64-encoded GCM tag
    #[serde(with = "base64_bytes")]
    pub auth_tag: Vec<u8>,
}

/// A derived AES-256 key, wiped on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LENGTH]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// OWASP minimum for Argon2id: 19 MiB, 2 passes, 1 lane
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Trait for deriving keys and sealing/opening field maps
pub trait FieldEncryptor: Send + Sync {
    /// Derive a key from a passphrase; a fresh salt is generated when `salt` is `None`
    fn derive_key(&self, passphrase: &str, salt: Option<&[u8]>) -> Result<(DerivedKey, Vec<u8>)>;

    /// Seal a field map under a derived key
    fn encrypt(&self, fields: &FieldMap, key: &DerivedKey) -> Result<EncryptedBlob>;

    /// Open a blob; tag mismatch is reported as [`AnonIdError::Decryption`]
    fn decrypt(&self, blob: &EncryptedBlob, key: &DerivedKey) -> Result<FieldMap>;
}

/// Argon2id + AES-256-GCM field encryptor
#[derive(Debug, Clone, Default)]
pub struct Aes256GcmFieldEncryptor {
    params: KdfParams,
}

impl Aes256GcmFieldEncryptor {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> KdfParams {
        self.params
    }

    fn cipher(key: &DerivedKey) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| AnonIdError::Crypto(format!("Failed to create cipher: {}", e)))
    }
}

impl FieldEncryptor for Aes256GcmFieldEncryptor {
    fn derive_key(&self, passphrase: &str, salt: Option<&[u8]>) -> Result<(DerivedKey, Vec<u8>)> {
        let salt = match salt {
            Some(salt) => salt.to_vec(),
            None => random_bytes(SALT_LENGTH),
        };

        let params = Params::new(
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            Some(KEY_LENGTH),
        )
        .map_err(|e| AnonIdError::Crypto(format!("Invalid Argon2 params: {}", e)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut output = [0u8; KEY_LENGTH];
        argon2
            .hash_password_into(passphrase.as_bytes(), &salt, &mut output)
            .map_err(|e| AnonIdError::Crypto(format!("Argon2id failed: {}", e)))?;

        let key = DerivedKey::from_bytes(output);
        output.zeroize();
        Ok((key, salt))
    }

    fn encrypt(&self, fields: &FieldMap, key: &DerivedKey) -> Result<EncryptedBlob> {
        let plaintext = serde_json::to_vec(fields)?;
        let cipher = Self::cipher(key)?;

        let nonce_bytes = random_bytes(NONCE_LENGTH);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let mut sealed = cipher
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|e| AnonIdError::Crypto(format!("Encryption failed: {}", e)))?;

        // aes-gcm appends the tag to the ciphertext
        let auth_tag = sealed.split_off(sealed.len() - TAG_LENGTH);

        Ok(EncryptedBlob {
            nonce: nonce_bytes,
            ciphertext: sealed,
            auth_tag,
        })
    }

    fn decrypt(&self, blob: &EncryptedBlob, key: &DerivedKey) -> Result<FieldMap> {
        if blob.nonce.len() != NONCE_LENGTH {
            return Err(AnonIdError::Decryption(format!(
                "Invalid nonce length {}",
                blob.nonce.len()
            )));
        }
        if blob.auth_tag.len() != TAG_LENGTH {
            return Err(AnonIdError::Decryption(format!(
                "Invalid tag length {}",
                blob.auth_tag.len()
            )));
        }

        let cipher = Self::cipher(key)?;
        let nonce = Nonce::from_slice(&blob.nonce);

        let mut sealed = Vec::with_capacity(blob.ciphertext.len() + TAG_LENGTH);
        sealed.extend_from_slice(&blob.ciphertext);
        sealed.extend_from_slice(&blob.auth_tag);

        let plaintext = cipher
            .decrypt(nonce, sealed.as_ref())
            .map_err(|_| AnonIdError::Decryption("Authentication tag mismatch".to_string()))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| AnonIdError::Decryption(format!("Corrupt plaintext: {}", e)))
    }
}

/// Fill a buffer from the OS CSPRNG
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cheap parameters so tests stay fast
    fn encryptor() -> Aes256GcmFieldEncryptor {
        Aes256GcmFieldEncryptor::new(KdfParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
    }

    fn fields() -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("full name".into(), "Chidi Okafor".into());
        fields.insert("date of birth".into(), "1995-09-23".into());
        fields
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let enc = encryptor();
        let (key, _salt) = enc.derive_key("passphrase", None).unwrap();

        let blob = enc.encrypt(&fields(), &key).unwrap();
        assert_eq!(blob.nonce.len(), NONCE_LENGTH);
        assert_eq!(blob.auth_tag.len(), TAG_LENGTH);

        assert_eq!(enc.decrypt(&blob, &key).unwrap(), fields());
    }

    #[test]
    fn test_derive_key_with_salt_is_deterministic() {
        let enc = encryptor();
        let (key1, salt) = enc.derive_key("passphrase", None).unwrap();
        assert_eq!(salt.len(), SALT_LENGTH);
        let (key2, salt2) = enc.derive_key("passphrase", Some(&salt)).unwrap();
        assert_eq!(salt, salt2);
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_fresh_salt_per_derivation() {
        let enc = encryptor();
        let (_, salt1) = enc.derive_key("passphrase", None).unwrap();
        let (_, salt2) = enc.derive_key("passphrase", None).unwrap();
        assert_ne!(salt1, salt2);
    }

    #[test]
    fn test_wrong_passphrase_fails_decryption() {
        let enc = encryptor();
        let (key, salt) = enc.derive_key("right", None).unwrap();
        let blob = enc.encrypt(&fields(), &key).unwrap();

        let (wrong, _) = enc.derive_key("wrong", Some(&salt)).unwrap();
        let err = enc.decrypt(&blob, &wrong).unwrap_err();
        assert!(matches!(err, AnonIdError::Decryption(_)));
    }

    #[test]
    fn test_wrong_salt_fails_decryption() {
        let enc = encryptor();
        let (key, _) = enc.derive_key("passphrase", None).unwrap();
        let blob = enc.encrypt(&fields(), &key).unwrap();

        let (other, _) = enc.derive_key("passphrase", None).unwrap();
        assert!(matches!(
            enc.decrypt(&blob, &other),
            Err(AnonIdError::Decryption(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let enc = encryptor();
        let (key, _) = enc.derive_key("passphrase", None).unwrap();
        let mut blob = enc.encrypt(&fields(), &key).unwrap();
        blob.ciphertext[0] ^= 0xFF;
        assert!(matches!(
            enc.decrypt(&blob, &key),
            Err(AnonIdError::Decryption(_))
        ));
    }

    #[test]
    fn test_truncated_tag_fails() {
        let enc = encryptor();
        let (key, _) = enc.derive_key("passphrase", None).unwrap();
        let mut blob = enc.encrypt(&fields(), &key).unwrap();
        blob.auth_tag.pop();
        assert!(matches!(
            enc.decrypt(&blob, &key),
            Err(AnonIdError::Decryption(_))
        ));
    }

    #[test]
    fn test_each_encryption_unique_nonce() {
        let enc = encryptor();
        let (key, _) = enc.derive_key("passphrase", None).unwrap();
        let b1 = enc.encrypt(&fields(), &key).unwrap();
        let b2 = enc.encrypt(&fields(), &key).unwrap();
        assert_ne!(b1.nonce, b2.nonce);
        assert_ne!(b1.ciphertext, b2.ciphertext);
    }

    #[test]
    fn test_blob_serializes_as_base64() {
        let enc = encryptor();
        let (key, _) = enc.derive_key("passphrase", None).unwrap();
        let blob = enc.encrypt(&fields(), &key).unwrap();

        let json = serde_json::to_value(&blob).unwrap();
        assert!(json["nonce"].is_string());
        assert!(json["authTag"].is_string());

        let back: EncryptedBlob = serde_json::from_value(json).unwrap();
        assert_eq!(back, blob);
    }

    #[test]
    fn test_invalid_kdf_params_rejected() {
        let enc = Aes256GcmFieldEncryptor::new(KdfParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(
            enc.derive_key("passphrase", None),
            Err(AnonIdError::Crypto(_))
        ));
    }

    #[test]
    fn test_derived_key_debug_is_redacted() {
        let key = DerivedKey::from_bytes([0x42; KEY_LENGTH]);
        assert_eq!(format!("{:?}", key), "DerivedKey([REDACTED])");
    }
}
