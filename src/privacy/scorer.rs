//! Privacy-risk scoring of access requests
//!
//! Scores free text by substring membership against the keyword tiers.
//! Weights and thresholds are fixed so the tiering stays predictable:
//! one high-risk phrase alone lands in Medium, two reach High.

use super::keywords::KeywordTable;
use crate::error::{AnonIdError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Points added per matched high-risk phrase
pub const HIGH_RISK_WEIGHT: i32 = 30;
/// Points added per matched medium-risk phrase
pub const MEDIUM_RISK_WEIGHT: i32 = 15;
/// Points removed when safe phrases match and no high-risk phrase does
pub const SAFE_PATTERN_DISCOUNT: i32 = 20;
/// Lowest score assigned the High tier
pub const HIGH_THRESHOLD: u8 = 60;
/// Lowest score assigned the Medium tier
pub const MEDIUM_THRESHOLD: u8 = 30;
/// Upper bound of the score
pub const MAX_SCORE: u8 = 100;

const NO_CONCERNS_FLAG: &str = "No privacy concerns detected";

/// Tier of an aggregate disclosure request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Safe,
    Medium,
    High,
}

impl RiskTier {
    /// Tier for a clamped score
    pub fn from_score(score: u8) -> Self {
        if score >= HIGH_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Safe
        }
    }

    /// Recommendation shown to the requester
    pub fn recommendation(self) -> &'static str {
        match self {
            Self::High => "DENY - This request is highly intrusive and compromises user privacy.",
            Self::Medium => {
                "CAUTION - Review carefully. Consider if this data is truly necessary."
            }
            Self::Safe => "APPROVED - This verification respects user privacy.",
        }
    }

    /// Parse a tier name, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "safe" => Some(Self::Safe),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => write!(f, "Safe"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Result of scoring one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Clamped score in `0..=100`
    pub score: u8,
    pub tier: RiskTier,
    pub matched_high_risk: Vec<String>,
    pub matched_medium_risk: Vec<String>,
    pub matched_safe: Vec<String>,
    /// One entry per high/medium match, or a single no-concerns marker
    pub flags: Vec<String>,
    pub recommendation: String,
}

impl RiskAssessment {
    /// Assessment for a request that names nothing at all
    pub fn unscored() -> Self {
        Self {
            score: 0,
            tier: RiskTier::Safe,
            matched_high_risk: Vec::new(),
            matched_medium_risk: Vec::new(),
            matched_safe: Vec::new(),
            flags: vec![NO_CONCERNS_FLAG.to_string()],
            recommendation: RiskTier::Safe.recommendation().to_string(),
        }
    }

    /// Whether the request may proceed (Safe or Medium)
    pub fn permits_disclosure(&self) -> bool {
        self.tier != RiskTier::High
    }
}

/// Static description of the scoring method
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringMethodology {
    pub methodology: &'static str,
    pub high_risk_keywords: usize,
    pub medium_risk_keywords: usize,
    pub safe_patterns: usize,
    pub high_risk_weight: i32,
    pub medium_risk_weight: i32,
    pub safe_pattern_discount: i32,
    pub high_threshold: u8,
    pub medium_threshold: u8,
}

/// Scores request text against a shared keyword table
#[derive(Debug, Clone)]
pub struct RiskScorer {
    table: Arc<KeywordTable>,
}

impl RiskScorer {
    /// Create a scorer over a table (normalized on the way in)
    pub fn new(table: KeywordTable) -> Self {
        Self {
            table: Arc::new(table.normalized()),
        }
    }

    /// Score a request
    pub fn score(&self, text: &str) -> RiskAssessment {
        let text = text.to_lowercase();
        let high = matches_in(&text, &self.table.high_risk);
        let medium = matches_in(&text, &self.table.medium_risk);
        let safe = matches_in(&text, &self.table.safe);

        let mut raw = HIGH_RISK_WEIGHT * high.len() as i32 + MEDIUM_RISK_WEIGHT * medium.len() as i32;
        if !safe.is_empty() && high.is_empty() {
            raw = (raw - SAFE_PATTERN_DISCOUNT).max(0);
        }
        let score = raw.clamp(0, MAX_SCORE as i32) as u8;
        let tier = RiskTier::from_score(score);

        let mut flags: Vec<String> = high
            .iter()
            .map(|m| format!("High-risk request: {}", m))
            .chain(medium.iter().map(|m| format!("Medium-risk request: {}", m)))
            .collect();
        if flags.is_empty() {
            flags.push(NO_CONCERNS_FLAG.to_string());
        }

        RiskAssessment {
            score,
            tier,
            matched_high_risk: high,
            matched_medium_risk: medium,
            matched_safe: safe,
            flags,
            recommendation: tier.recommendation().to_string(),
        }
    }

    /// Score a caller-supplied request, rejecting blank text
    pub fn check(&self, text: &str) -> Result<RiskAssessment> {
        if text.trim().is_empty() {
            return Err(AnonIdError::Validation(
                "Request text cannot be empty".to_string(),
            ));
        }
        Ok(self.score(text))
    }

    /// Describe the phrase counts, weights and thresholds in use
    pub fn methodology(&self) -> ScoringMethodology {
        ScoringMethodology {
            methodology: "Heuristic keyword-based scoring",
            high_risk_keywords: self.table.high_risk.len(),
            medium_risk_keywords: self.table.medium_risk.len(),
            safe_patterns: self.table.safe.len(),
            high_risk_weight: HIGH_RISK_WEIGHT,
            medium_risk_weight: MEDIUM_RISK_WEIGHT,
            safe_pattern_discount: -SAFE_PATTERN_DISCOUNT,
            high_threshold: HIGH_THRESHOLD,
            medium_threshold: MEDIUM_THRESHOLD,
        }
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(KeywordTable::default())
    }
}

fn matches_in(text: &str, phrases: &[String]) -> Vec<String> {
    phrases
        .iter()
        .filter(|p| text.contains(p.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> RiskScorer {
        RiskScorer::default()
    }

    #[test]
    fn test_safe_request_scores_zero() {
        let result = scorer().score("Verify age over 18");
        assert_eq!(result.score, 0);
        assert_eq!(result.tier, RiskTier::Safe);
        assert_eq!(result.matched_safe, vec!["over 18".to_string()]);
        assert_eq!(result.flags, vec![NO_CONCERNS_FLAG.to_string()]);
    }

    #[test]
    fn test_three_high_matches() {
        let result = scorer().score("Share your home address, email, and date of birth");
        assert_eq!(result.matched_high_risk.len(), 3);
        assert_eq!(result.score, 90);
        assert_eq!(result.tier, RiskTier::High);
    }

    #[test]
    fn test_two_high_matches_hit_inclusive_boundary() {
        let result = scorer().score("Please provide your full name and phone number");
        assert_eq!(
            result.matched_high_risk,
            vec!["full name".to_string(), "phone number".to_string()]
        );
        assert_eq!(result.score, 60);
        assert_eq!(result.tier, RiskTier::High);
    }

    #[test]
    fn test_score_clamped_at_100() {
        let result = scorer().score(
            "Request: Full name, NIN, phone number, bank account number, and residential address",
        );
        assert!(result.matched_high_risk.len() >= 5);
        assert_eq!(result.score, 100);
        assert_eq!(result.tier, RiskTier::High);
    }

    #[test]
    fn test_single_high_match_is_medium() {
        let result = scorer().score("What is your passport number?");
        assert_eq!(result.score, 30);
        assert_eq!(result.tier, RiskTier::Medium);
        assert!(result.permits_disclosure());
    }

    #[test]
    fn test_safe_discount_requires_no_high_match() {
        // gender (15) + country (15) - 20 = 10
        let discounted = scorer().score("Confirm eligible by gender and country");
        assert_eq!(discounted.score, 10);
        assert_eq!(discounted.tier, RiskTier::Safe);

        // a high match cancels the discount
        let not_discounted = scorer().score("Confirm eligible, share your email");
        assert_eq!(not_discounted.score, 30);
    }

    #[test]
    fn test_flags_list_high_before_medium() {
        let result = scorer().score("gender and phone number");
        assert_eq!(
            result.flags,
            vec![
                "High-risk request: phone number".to_string(),
                "Medium-risk request: gender".to_string()
            ]
        );
    }

    #[test]
    fn test_monotonic_in_matches() {
        let s = scorer();
        let one = s.score("gender").score;
        let two = s.score("gender and salary").score;
        let three = s.score("gender and salary and full name").score;
        assert!(one <= two && two <= three);
    }

    #[test]
    fn test_deterministic() {
        let s = scorer();
        let text = "Provide full name and gender";
        assert_eq!(s.score(text), s.score(text));
    }

    #[test]
    fn test_check_rejects_blank_text() {
        assert!(matches!(
            scorer().check("  \n"),
            Err(AnonIdError::Validation(_))
        ));
        assert_eq!(scorer().check("Verify age over 18").unwrap().score, 0);
    }

    #[test]
    fn test_otp_phrase_matches_inside_words() {
        // the default "otp" phrase is a plain substring, so it also hits "hotpot"
        let result = scorer().score("Do you like hotpot?");
        assert_eq!(result.matched_high_risk, vec!["otp".to_string()]);
        assert_eq!(result.score, 30);
        assert_eq!(result.tier, RiskTier::Medium);

        let result = scorer().score("Send the OTP you received");
        assert_eq!(result.matched_high_risk, vec!["otp".to_string()]);
    }

    #[test]
    fn test_tier_from_score_boundaries() {
        assert_eq!(RiskTier::from_score(0), RiskTier::Safe);
        assert_eq!(RiskTier::from_score(29), RiskTier::Safe);
        assert_eq!(RiskTier::from_score(30), RiskTier::Medium);
        assert_eq!(RiskTier::from_score(59), RiskTier::Medium);
        assert_eq!(RiskTier::from_score(60), RiskTier::High);
        assert_eq!(RiskTier::from_score(100), RiskTier::High);
    }

    #[test]
    fn test_tier_parse_and_display() {
        assert_eq!(RiskTier::parse("HIGH"), Some(RiskTier::High));
        assert_eq!(RiskTier::parse("unknown"), None);
        assert_eq!(RiskTier::Medium.to_string(), "Medium");
    }

    #[test]
    fn test_methodology_reports_table() {
        let m = scorer().methodology();
        assert_eq!(m.high_risk_keywords, 37);
        assert_eq!(m.high_risk_weight, 30);
        assert_eq!(m.safe_pattern_discount, -20);
        assert_eq!(m.high_threshold, 60);
    }
}
