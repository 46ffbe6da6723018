//! AnonID use cases
//!
//! [`AnonIdService`] wires the record source, the record builder, the
//! disclosure gate and the store together. Every verify/access attempt
//! appends exactly one access-log entry, whatever its outcome.

use crate::config::AnonIdConfig;
use crate::crypto::{Aes256GcmFieldEncryptor, EncryptedBlob, FieldEncryptor};
use crate::error::{AnonIdError, Result};
use crate::privacy::{
    Disclosure, DisclosureGate, DisclosureRequest, KeywordClassifier, KeywordTable,
    RiskAssessment, RiskScorer, RiskTier, ScoringMethodology,
};
use crate::registry::IdentityRecordBuilder;
use crate::source::{MockNimcSource, RecordSource};
use crate::store::{IdentityStore, SqliteStore};
use crate::types::{
    mask_natural_key, now_millis, AccessLogEntry, FieldMap, IdentityRecord, StoreStats,
    StoredIdentity,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

const VERIFY_ENDPOINT: &str = "verify";
const ACCESS_ENDPOINT: &str = "access";

/// How a registration call was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistrationStatus {
    /// First registration of this identity
    New,
    /// Already registered; the stored record was returned unchanged
    Existing,
    /// Re-registered with a fresh id, salt and ciphertext
    Refreshed,
}

/// Result of [`AnonIdService::register`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub anonymized_id: String,
    pub status: RegistrationStatus,
    pub masked_nin: String,
    pub public_fields: FieldMap,
    pub created_at: i64,
}

/// Result of [`AnonIdService::verify`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub verified: bool,
    pub anonymized_id: String,
    pub public_fields: FieldMap,
    /// Present when the caller supplied a verification request text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAssessment>,
}

/// Public profile of a registered identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub anonymized_id: String,
    pub masked_nin: String,
    pub public_fields: FieldMap,
    pub created_at: i64,
}

/// One scored request of a batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub request: String,
    pub assessment: RiskAssessment,
}

/// Tier counts over a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub high_risk: usize,
    pub medium_risk: usize,
    pub safe: usize,
}

/// Result of [`AnonIdService::batch_check`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub results: Vec<BatchItem>,
    pub summary: BatchSummary,
}

/// Counters plus the derived grant rate
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    #[serde(flatten)]
    pub counts: StoreStats,
    pub grant_rate: String,
}

/// The identity registration and disclosure service
pub struct AnonIdService {
    source: Arc<dyn RecordSource>,
    store: Arc<dyn IdentityStore>,
    builder: Arc<IdentityRecordBuilder>,
    scorer: Arc<RiskScorer>,
    gate: DisclosureGate,
    /// Held from lookup to upsert so registrations of one NIN cannot race
    registrations: Mutex<()>,
}

impl AnonIdService {
    pub fn new(
        source: Arc<dyn RecordSource>,
        store: Arc<dyn IdentityStore>,
        encryptor: Arc<dyn FieldEncryptor>,
        keywords: KeywordTable,
        passphrase: impl Into<String>,
    ) -> Self {
        let classifier = Arc::new(KeywordClassifier::new(keywords.clone()));
        let scorer = Arc::new(RiskScorer::new(keywords));
        Self {
            source,
            store,
            builder: Arc::new(IdentityRecordBuilder::new(classifier, encryptor, passphrase)),
            gate: DisclosureGate::new(scorer.clone()),
            scorer,
            registrations: Mutex::new(()),
        }
    }

    /// Build the service from configuration: SQLite store, mock registry,
    /// Argon2id/AES-256-GCM encryption
    pub fn from_config(config: &AnonIdConfig) -> Result<Self> {
        let store = SqliteStore::open(&config.storage.database_path)?;
        let source = MockNimcSource::default();
        tracing::info!(source = source.name(), records = source.len(), "Record source ready");
        Ok(Self::new(
            Arc::new(source),
            Arc::new(store),
            Arc::new(Aes256GcmFieldEncryptor::new(config.crypto.kdf_params())),
            config.privacy.clone(),
            config.crypto.resolve_passphrase(),
        ))
    }

    /// Register an identity by natural key.
    ///
    /// An existing registration is returned as-is unless `refresh` is set.
    pub async fn register(&self, nin: &str, refresh: bool) -> Result<Registration> {
        let nin = validate_nin(nin)?;
        let masked = mask_natural_key(&nin);
        let _guard = self.registrations.lock().await;

        let existing = self.store.get_by_natural_key(&nin).await?;
        if let Some(stored) = &existing {
            if !refresh {
                tracing::debug!(anon_id = %stored.anonymized_id, "Identity already registered");
                return Ok(Registration {
                    anonymized_id: stored.anonymized_id.clone(),
                    status: RegistrationStatus::Existing,
                    masked_nin: masked,
                    public_fields: stored.public_fields.clone(),
                    created_at: stored.created_at,
                });
            }
        }

        let raw = self.source.lookup(&nin).ok_or_else(|| {
            AnonIdError::NotFound(format!("NIN {} not found in {}", masked, self.source.name()))
        })?;

        let builder = self.builder.clone();
        let key = nin.clone();
        let built = tokio::task::spawn_blocking(move || builder.build(&raw, &key))
            .await
            .map_err(|e| AnonIdError::Internal(format!("Record build task failed: {}", e)))??;

        let now = now_millis();
        let created_at = existing.as_ref().map_or(now, |s| s.created_at);
        let stored = StoredIdentity {
            natural_key: nin,
            anonymized_id: built.record.anonymized_id.clone(),
            public_fields: built.record.public_fields.clone(),
            blob: built.blob,
            salt: built.salt,
            created_at,
            updated_at: now,
        };
        self.store.upsert(&stored).await?;

        let status = if existing.is_some() {
            RegistrationStatus::Refreshed
        } else {
            RegistrationStatus::New
        };
        tracing::info!(
            anon_id = %stored.anonymized_id,
            nin = %masked,
            status = ?status,
            "Identity registered"
        );

        Ok(Registration {
            anonymized_id: stored.anonymized_id,
            status,
            masked_nin: masked,
            public_fields: stored.public_fields,
            created_at,
        })
    }

    /// Confirm a registration and return its public view.
    ///
    /// When `request_text` is given it is scored and the assessment is
    /// attached; the public view is returned either way.
    pub async fn verify(&self, nin: &str, request_text: Option<&str>) -> Result<Verification> {
        let stored = self.require(nin).await?;

        let risk = request_text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| self.scorer.score(t));

        let mut entry = AccessLogEntry::new(&stored.natural_key, VERIFY_ENDPOINT, Vec::new(), true);
        if let Some(assessment) = &risk {
            entry = entry.with_risk(assessment.tier, assessment.score);
        }
        self.store.append_access_log(&entry).await?;

        tracing::info!(
            anon_id = %stored.anonymized_id,
            endpoint = VERIFY_ENDPOINT,
            tier = ?risk.as_ref().map(|r| r.tier),
            "Identity verified"
        );

        Ok(Verification {
            verified: true,
            anonymized_id: stored.anonymized_id,
            public_fields: stored.public_fields,
            risk,
        })
    }

    /// Risk-gated disclosure of an identity's fields.
    ///
    /// A denial is a normal result with `granted == false`. The sensitive
    /// partition is only decrypted after a grant that names fields.
    pub async fn access(&self, nin: &str, request: &DisclosureRequest) -> Result<Disclosure> {
        let stored = self.require(nin).await?;
        let decision = self.gate.assess(request);
        let assessment = decision.assessment.clone();
        let entry = |granted: bool| {
            AccessLogEntry::new(
                &stored.natural_key,
                ACCESS_ENDPOINT,
                request.requested_fields.clone(),
                granted,
            )
            .with_risk(assessment.tier, assessment.score)
        };

        if !decision.granted() {
            self.store.append_access_log(&entry(false)).await?;
            tracing::warn!(
                anon_id = %stored.anonymized_id,
                endpoint = ACCESS_ENDPOINT,
                tier = %assessment.tier,
                score = assessment.score,
                granted = false,
                "Disclosure denied"
            );
            return Ok(Disclosure {
                granted: false,
                data: FieldMap::new(),
                assessment,
            });
        }

        let sensitive_fields = if decision.needs_sensitive() {
            match self.open(stored.blob.clone(), stored.salt.clone()).await {
                Ok(fields) => fields,
                Err(e) => {
                    self.store.append_access_log(&entry(false)).await?;
                    tracing::error!(
                        anon_id = %stored.anonymized_id,
                        endpoint = ACCESS_ENDPOINT,
                        granted = false,
                        "Failed to decrypt sensitive fields: {}",
                        e
                    );
                    return Err(e);
                }
            }
        } else {
            FieldMap::new()
        };

        let mut record =
            IdentityRecord::public_only(stored.anonymized_id.clone(), stored.public_fields.clone());
        record.sensitive_fields = sensitive_fields;
        let data = self.gate.release(&decision, &record);
        self.store.append_access_log(&entry(true)).await?;

        tracing::info!(
            anon_id = %stored.anonymized_id,
            endpoint = ACCESS_ENDPOINT,
            tier = %assessment.tier,
            score = assessment.score,
            granted = true,
            released = data.len(),
            "Disclosure granted"
        );

        Ok(Disclosure {
            granted: true,
            data,
            assessment,
        })
    }

    /// Public profile by anonymized id
    pub async fn profile(&self, anonymized_id: &str) -> Result<Profile> {
        let stored = self
            .store
            .get_by_anonymized_id(anonymized_id)
            .await?
            .ok_or_else(|| AnonIdError::NotFound(format!("User {} not found", anonymized_id)))?;

        Ok(Profile {
            anonymized_id: stored.anonymized_id,
            masked_nin: mask_natural_key(&stored.natural_key),
            public_fields: stored.public_fields,
            created_at: stored.created_at,
        })
    }

    /// Score one request text
    pub fn check_risk(&self, text: &str) -> Result<RiskAssessment> {
        self.scorer.check(text)
    }

    /// Score several request texts and summarize the tiers
    pub fn batch_check(&self, texts: &[String]) -> Result<BatchReport> {
        if texts.is_empty() {
            return Err(AnonIdError::Validation(
                "At least one request is required".to_string(),
            ));
        }

        let mut summary = BatchSummary {
            total: texts.len(),
            ..Default::default()
        };
        let results = texts
            .iter()
            .map(|text| {
                let assessment = self.scorer.score(text);
                match assessment.tier {
                    RiskTier::High => summary.high_risk += 1,
                    RiskTier::Medium => summary.medium_risk += 1,
                    RiskTier::Safe => summary.safe += 1,
                }
                BatchItem {
                    request: text.clone(),
                    assessment,
                }
            })
            .collect();

        Ok(BatchReport { results, summary })
    }

    /// Registration and access counters
    pub async fn stats(&self) -> Result<ServiceStats> {
        let counts = self.store.stats().await?;
        Ok(ServiceStats {
            grant_rate: counts.grant_rate(),
            counts,
        })
    }

    /// Access log of one identity, oldest first
    pub async fn access_log(&self, nin: &str) -> Result<Vec<AccessLogEntry>> {
        let stored = self.require(nin).await?;
        self.store.access_log(&stored.natural_key).await
    }

    /// Weights, thresholds and table sizes used for scoring
    pub fn methodology(&self) -> ScoringMethodology {
        self.scorer.methodology()
    }

    async fn require(&self, nin: &str) -> Result<StoredIdentity> {
        let nin = validate_nin(nin)?;
        self.store.get_by_natural_key(&nin).await?.ok_or_else(|| {
            AnonIdError::NotFound(format!(
                "NIN {} is not registered",
                mask_natural_key(&nin)
            ))
        })
    }

    async fn open(&self, blob: EncryptedBlob, salt: Vec<u8>) -> Result<FieldMap> {
        let builder = self.builder.clone();
        tokio::task::spawn_blocking(move || builder.open(&blob, &salt))
            .await
            .map_err(|e| AnonIdError::Internal(format!("Decryption task failed: {}", e)))?
    }
}

fn validate_nin(nin: &str) -> Result<String> {
    let nin = nin.trim();
    if nin.is_empty() {
        return Err(AnonIdError::Validation("NIN is required".to_string()));
    }
    Ok(nin.to_string())
}
