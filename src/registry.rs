//! Building stored identities from raw registry records

use crate::crypto::{EncryptedBlob, FieldEncryptor};
use crate::error::{AnonIdError, Result};
use crate::privacy::KeywordClassifier;
use crate::types::{FieldMap, IdentityRecord, EMPTY_SENSITIVE_NOTE};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Hex characters kept from the digest (48 bits).
///
/// Sized for a demo population; widen before using at scale.
pub const ANONYMIZED_ID_LENGTH: usize = 12;

const ID_NONCE_BYTES: usize = 8;

/// Output of [`IdentityRecordBuilder::build`]
#[derive(Debug, Clone)]
pub struct BuiltIdentity {
    /// Classified record; `sensitive_fields` is still plaintext here
    pub record: IdentityRecord,
    /// Encrypted sensitive partition
    pub blob: EncryptedBlob,
    /// Salt the blob's key was derived with
    pub salt: Vec<u8>,
}

/// Classifies, anonymizes and encrypts raw identity records
pub struct IdentityRecordBuilder {
    classifier: Arc<KeywordClassifier>,
    encryptor: Arc<dyn FieldEncryptor>,
    passphrase: Zeroizing<String>,
}

impl IdentityRecordBuilder {
    pub fn new(
        classifier: Arc<KeywordClassifier>,
        encryptor: Arc<dyn FieldEncryptor>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            encryptor,
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }

    /// Split a raw record into public/sensitive partitions
    pub fn partition(&self, raw: &FieldMap) -> (FieldMap, FieldMap) {
        raw.iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .partition(|(k, _)| !self.classifier.classify(k).is_sensitive())
    }

    /// Build a fresh identity for `natural_key`.
    ///
    /// Every call draws a new id nonce and a new KDF salt.
    pub fn build(&self, raw: &FieldMap, natural_key: &str) -> Result<BuiltIdentity> {
        if natural_key.trim().is_empty() {
            return Err(AnonIdError::Validation(
                "Natural key cannot be empty".to_string(),
            ));
        }

        let (public_fields, mut sensitive_fields) = self.partition(raw);
        if sensitive_fields.is_empty() {
            let (key, value) = EMPTY_SENSITIVE_NOTE;
            sensitive_fields.insert(key.to_string(), value.to_string());
        }

        let (key, salt) = self.encryptor.derive_key(&self.passphrase, None)?;
        let blob = self.encryptor.encrypt(&sensitive_fields, &key)?;
        let anonymized_id = generate_anonymized_id(natural_key);

        tracing::debug!(
            anon_id = %anonymized_id,
            public = public_fields.len(),
            sensitive = sensitive_fields.len(),
            "Identity record built"
        );

        Ok(BuiltIdentity {
            record: IdentityRecord {
                anonymized_id,
                public_fields,
                sensitive_fields,
            },
            blob,
            salt,
        })
    }

    /// Decrypt a stored sensitive partition using its salt
    pub fn open(&self, blob: &EncryptedBlob, salt: &[u8]) -> Result<FieldMap> {
        if salt.is_empty() {
            return Err(AnonIdError::Decryption(
                "Missing salt; cannot derive key".to_string(),
            ));
        }
        let (key, _) = self
            .encryptor
            .derive_key(&self.passphrase, Some(salt))
            .map_err(|e| AnonIdError::Decryption(format!("Key re-derivation failed: {}", e)))?;
        self.encryptor.decrypt(blob, &key)
    }
}

/// Short id: SHA-256 of `natural_key:nonce`, truncated
pub fn generate_anonymized_id(natural_key: &str) -> String {
    let nonce = hex::encode(crate::crypto::random_bytes(ID_NONCE_BYTES));
    let digest = Sha256::digest(format!("{}:{}", natural_key, nonce).as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(ANONYMIZED_ID_LENGTH);
    id
}
