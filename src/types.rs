//! Core identity types for the anonid system
//!
//! All types use camelCase JSON serialization for wire compatibility.

use crate::crypto::EncryptedBlob;
use crate::privacy::RiskTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered mapping of field name to value
pub type FieldMap = BTreeMap<String, String>;

/// Marker stored in place of an empty sensitive partition
pub const EMPTY_SENSITIVE_NOTE: (&str, &str) = ("note", "no high-risk fields present");

/// An identity split into its public and sensitive partitions
///
/// `sensitive_fields` only holds plaintext transiently: right after a build,
/// or after a granted disclosure decrypted the stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    /// Short non-reversible identifier used in public-facing output
    pub anonymized_id: String,

    /// Fields that may be shown without decryption
    pub public_fields: FieldMap,

    /// High-risk fields, encrypted at rest
    pub sensitive_fields: FieldMap,
}

impl IdentityRecord {
    /// Public view of a stored identity, without its sensitive partition
    pub fn public_only(anonymized_id: impl Into<String>, public_fields: FieldMap) -> Self {
        Self {
            anonymized_id: anonymized_id.into(),
            public_fields,
            sensitive_fields: FieldMap::new(),
        }
    }
}

/// An identity as persisted by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredIdentity {
    /// The natural key (NIN)
    pub natural_key: String,

    /// Anonymized id (unique secondary key)
    pub anonymized_id: String,

    /// Public partition in plaintext
    pub public_fields: FieldMap,

    /// Encrypted sensitive partition
    pub blob: EncryptedBlob,

    /// KDF salt needed to re-derive the blob's key
    pub salt: Vec<u8>,

    /// Unix timestamp in milliseconds of the first registration
    pub created_at: i64,

    /// Unix timestamp in milliseconds of the latest (re-)registration
    pub updated_at: i64,
}

/// Append-only audit record of a single disclosure attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
    /// Unique entry id
    pub id: String,

    /// Natural key the attempt targeted
    pub natural_key_ref: String,

    /// Endpoint or use case that produced the attempt
    pub endpoint: String,

    /// Fields named by the requester
    pub requested_fields: Vec<String>,

    /// Whether any data was released
    pub granted: bool,

    /// Risk tier of the request, when one was scored
    pub tier: Option<RiskTier>,

    /// Risk score of the request, when one was scored
    pub score: Option<u8>,

    /// Unix timestamp in milliseconds
    pub timestamp: i64,
}

impl AccessLogEntry {
    /// Create a new entry with generated id and timestamp
    pub fn new(
        natural_key_ref: impl Into<String>,
        endpoint: impl Into<String>,
        requested_fields: Vec<String>,
        granted: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            natural_key_ref: natural_key_ref.into(),
            endpoint: endpoint.into(),
            requested_fields,
            granted,
            tier: None,
            score: None,
            timestamp: now_millis(),
        }
    }

    /// Attach the risk outcome of the request
    pub fn with_risk(mut self, tier: RiskTier, score: u8) -> Self {
        self.tier = Some(tier);
        self.score = Some(score);
        self
    }
}

/// Aggregate counters over registrations and access attempts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_users: u64,
    pub total_accesses: u64,
    pub access_granted: u64,
    pub access_denied: u64,
}

impl StoreStats {
    /// Share of granted accesses, formatted as a percentage
    pub fn grant_rate(&self) -> String {
        if self.total_accesses == 0 {
            return "0%".to_string();
        }
        let rate = self.access_granted as f64 / self.total_accesses as f64 * 100.0;
        format!("{:.1}%", rate)
    }
}

/// Mask a natural key for display, keeping the first and last two characters
pub fn mask_natural_key(natural_key: &str) -> String {
    let chars: Vec<char> = natural_key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 4), tail)
}

/// Current time in milliseconds since the Unix epoch
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_natural_key() {
        assert_eq!(mask_natural_key("12345678901"), "12*******01");
        assert_eq!(mask_natural_key("12345"), "12*45");
    }

    #[test]
    fn test_mask_short_key_fully() {
        assert_eq!(mask_natural_key("1234"), "****");
        assert_eq!(mask_natural_key(""), "");
    }

    #[test]
    fn test_grant_rate() {
        let stats = StoreStats {
            total_users: 1,
            total_accesses: 3,
            access_granted: 2,
            access_denied: 1,
        };
        assert_eq!(stats.grant_rate(), "66.7%");
        assert_eq!(StoreStats::default().grant_rate(), "0%");
    }

    #[test]
    fn test_access_log_entry_with_risk() {
        let entry = AccessLogEntry::new("12345678901", "access", vec!["gender".into()], true)
            .with_risk(RiskTier::Safe, 15);
        assert_eq!(entry.tier, Some(RiskTier::Safe));
        assert_eq!(entry.score, Some(15));
        assert!(!entry.id.is_empty());
    }

    #[test]
    fn test_identity_record_serde_camel_case() {
        let record = IdentityRecord::public_only("a1b2c3d4e5f6", FieldMap::new());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["anonymizedId"], "a1b2c3d4e5f6");
        assert!(json["publicFields"].is_object());
        assert!(json["sensitiveFields"].is_object());
    }
}
