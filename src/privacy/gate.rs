//! Field-disclosure gate
//!
//! Decides whether a disclosure request may proceed and which fields it
//! receives. The decision is all-or-nothing at the tier level: a High-risk
//! request is denied outright, with no per-field partial release.

use super::scorer::{RiskAssessment, RiskScorer};
use crate::types::{FieldMap, IdentityRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A request to disclose fields of one identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureRequest {
    /// Field names the requester wants
    #[serde(default)]
    pub requested_fields: Vec<String>,

    /// Free-text purpose of the request, scored when present
    #[serde(default)]
    pub request_text: Option<String>,
}

impl DisclosureRequest {
    pub fn new(requested_fields: Vec<String>, request_text: Option<String>) -> Self {
        Self {
            requested_fields,
            request_text,
        }
    }

    fn text(&self) -> Option<&str> {
        self.request_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Whether the request names neither fields nor a purpose
    pub fn is_public_view(&self) -> bool {
        self.text().is_none() && self.requested_fields.is_empty()
    }
}

/// What a granted request is entitled to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisclosureScope {
    /// The full public partition
    PublicView,
    /// The listed fields, resolved sensitive-first
    Fields(Vec<String>),
    /// Nothing
    Denied,
}

/// Outcome of [`DisclosureGate::assess`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub assessment: RiskAssessment,
    pub scope: DisclosureScope,
}

impl GateDecision {
    pub fn granted(&self) -> bool {
        self.scope != DisclosureScope::Denied
    }

    /// Whether releasing this scope needs the decrypted sensitive partition
    pub fn needs_sensitive(&self) -> bool {
        matches!(&self.scope, DisclosureScope::Fields(fields) if !fields.is_empty())
    }
}

/// Result of a full gate evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Disclosure {
    pub granted: bool,
    pub data: FieldMap,
    pub assessment: RiskAssessment,
}

/// Risk-gated field disclosure
#[derive(Debug, Clone)]
pub struct DisclosureGate {
    scorer: Arc<RiskScorer>,
}

impl DisclosureGate {
    pub fn new(scorer: Arc<RiskScorer>) -> Self {
        Self { scorer }
    }

    /// Score the request and decide its scope, without touching any record
    pub fn assess(&self, request: &DisclosureRequest) -> GateDecision {
        if request.is_public_view() {
            return GateDecision {
                assessment: RiskAssessment::unscored(),
                scope: DisclosureScope::PublicView,
            };
        }

        let assessment = match request.text() {
            Some(text) => self.scorer.score(text),
            None => self.scorer.score(&synthesize_request_text(&request.requested_fields)),
        };

        let scope = if assessment.permits_disclosure() {
            DisclosureScope::Fields(request.requested_fields.clone())
        } else {
            DisclosureScope::Denied
        };

        GateDecision { assessment, scope }
    }

    /// Resolve a decision's scope against a record.
    ///
    /// Sensitive values win over public ones; unknown fields are omitted.
    pub fn release(&self, decision: &GateDecision, record: &IdentityRecord) -> FieldMap {
        match &decision.scope {
            DisclosureScope::Denied => FieldMap::new(),
            DisclosureScope::PublicView => record.public_fields.clone(),
            DisclosureScope::Fields(fields) => fields
                .iter()
                .filter_map(|field| {
                    record
                        .sensitive_fields
                        .get(field)
                        .or_else(|| record.public_fields.get(field))
                        .map(|value| (field.clone(), value.clone()))
                })
                .collect(),
        }
    }

    /// Assess and release in one step.
    ///
    /// `record.sensitive_fields` must already hold the decrypted partition.
    pub fn evaluate(&self, request: &DisclosureRequest, record: &IdentityRecord) -> Disclosure {
        let decision = self.assess(request);
        let data = self.release(&decision, record);
        Disclosure {
            granted: decision.granted(),
            data,
            assessment: decision.assessment,
        }
    }
}

/// Request text used when only a field list was given
pub fn synthesize_request_text(fields: &[String]) -> String {
    format!("Provide {}", fields.join(" and "))
}
