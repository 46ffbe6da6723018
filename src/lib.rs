//! # a3s-anonid
//!
//! Privacy-first identity registration with risk-gated selective disclosure.
//!
//! ## Overview
//!
//! Given a national identification number (NIN), `a3s-anonid` fetches the
//! raw record from a registry source, splits its fields into a public and a
//! sensitive partition by keyword, encrypts the sensitive partition and
//! stores the result under a short anonymized id. Requests for data are
//! scored for privacy risk; High-risk requests are denied outright.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use a3s_anonid::{AnonIdConfig, AnonIdService, DisclosureRequest};
//!
//! # async fn example() -> a3s_anonid::Result<()> {
//! let service = AnonIdService::from_config(&AnonIdConfig::default())?;
//!
//! let registration = service.register("12345678901", false).await?;
//! println!("Registered as {}", registration.anonymized_id);
//!
//! let request = DisclosureRequest::new(vec!["gender".into()], None);
//! let disclosure = service.access("12345678901", &request).await?;
//! println!("granted={} tier={}", disclosure.granted, disclosure.assessment.tier);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **KeywordClassifier**: field name to High / Medium / Unclassified
//! - **RiskScorer**: request text to score, tier and flags
//! - **DisclosureGate**: risk decision plus field resolution
//! - **IdentityRecordBuilder**: partition, anonymize, encrypt
//! - **FieldEncryptor** / **RecordSource** / **IdentityStore**: pluggable collaborators
//! - **AnonIdService**: the use cases, served over HTTP by [`api::build_app`]

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod privacy;
pub mod registry;
pub mod service;
pub mod source;
pub mod store;
pub mod types;

// Re-export core types
pub use config::{load_config, AnonIdConfig};
pub use crypto::{Aes256GcmFieldEncryptor, EncryptedBlob, FieldEncryptor, KdfParams};
pub use error::{AnonIdError, Result};
pub use privacy::{
    Disclosure, DisclosureGate, DisclosureRequest, FieldTier, KeywordClassifier, KeywordTable,
    RiskAssessment, RiskScorer, RiskTier,
};
pub use registry::{generate_anonymized_id, IdentityRecordBuilder};
pub use service::{AnonIdService, RegistrationStatus};
pub use source::{MockNimcSource, RecordSource};
pub use store::{IdentityStore, SqliteStore};
pub use types::{mask_natural_key, AccessLogEntry, FieldMap, IdentityRecord, StoredIdentity};
