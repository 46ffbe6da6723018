//! Privacy classification, risk scoring and the disclosure gate
//!
//! - [`KeywordClassifier`]: field name → High / Medium / Unclassified
//! - [`RiskScorer`]: request text → score, tier, flags
//! - [`DisclosureGate`]: risk decision + field resolution against a record
//!
//! All three are immutable once built and shared behind `Arc`.

pub mod gate;
pub mod keywords;
pub mod scorer;

pub use gate::{
    synthesize_request_text, Disclosure, DisclosureGate, DisclosureRequest, DisclosureScope,
    GateDecision,
};
pub use keywords::{FieldTier, KeywordClassifier, KeywordTable};
pub use scorer::{RiskAssessment, RiskScorer, RiskTier, ScoringMethodology};
