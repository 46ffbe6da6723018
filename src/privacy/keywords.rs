//! Keyword tables and field-name classification
//!
//! The phrase lists are configuration, not code: a [`KeywordTable`] is built
//! once (from defaults or config) and shared read-only by the classifier and
//! the risk scorer.

use serde::{Deserialize, Serialize};

/// Phrase lists for the three risk tiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTable {
    /// Identity numbers, contact details, biometric/financial identifiers,
    /// dates of birth, exact location
    pub high_risk: Vec<String>,

    /// Demographic, workplace and education attributes
    pub medium_risk: Vec<String>,

    /// Non-sensitive verification phrases (request text only)
    pub safe: Vec<String>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            high_risk: to_owned(&DEFAULT_HIGH_RISK),
            medium_risk: to_owned(&DEFAULT_MEDIUM_RISK),
            safe: to_owned(&DEFAULT_SAFE),
        }
    }
}

impl KeywordTable {
    /// Lowercase, trim and de-duplicate every list, dropping empty phrases.
    ///
    /// Matching is done against lowercased text, so a phrase carrying upper
    /// case would otherwise never match.
    pub fn normalized(self) -> Self {
        Self {
            high_risk: normalize(self.high_risk),
            medium_risk: normalize(self.medium_risk),
            safe: normalize(self.safe),
        }
    }
}

const DEFAULT_HIGH_RISK: [&str; 37] = [
    "full name",
    "complete name",
    "real name",
    "home address",
    "residential address",
    "street address",
    "physical address",
    "phone number",
    "mobile number",
    "telephone",
    "email address",
    "email",
    "nin",
    "national identification number",
    "bvn number",
    "bank verification number",
    "passport number",
    "driver license",
    "social security",
    "tax id",
    "bank account",
    "account number",
    "credit card",
    "debit card",
    "date of birth",
    "dob",
    "birthday",
    "exact location",
    "gps coordinates",
    "fingerprint",
    "biometric",
    "facial recognition",
    "medical record",
    "health information",
    "cvv",
    "pin code",
    "otp",
];

const DEFAULT_MEDIUM_RISK: [&str; 18] = [
    "first name",
    "last name",
    "surname",
    "city",
    "state",
    "country",
    "workplace",
    "employer",
    "company name",
    "education",
    "school attended",
    "marital status",
    "gender",
    "income level",
    "salary",
    "religion",
    "tribe",
    "ethnicity",
];

const DEFAULT_SAFE: [&str; 13] = [
    "age verification",
    "over 18",
    "over 21",
    "adult verification",
    "nigerian citizen",
    "citizenship status",
    "bvn verified",
    "nin verified",
    "identity verified",
    "is registered",
    "account exists",
    "eligible",
    "qualified",
];

fn to_owned(phrases: &[&str]) -> Vec<String> {
    phrases.iter().map(|p| p.to_string()).collect()
}

fn normalize(phrases: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(phrases.len());
    for phrase in phrases {
        let phrase = phrase.trim().to_lowercase();
        if !phrase.is_empty() && !out.contains(&phrase) {
            out.push(phrase);
        }
    }
    out
}

/// Tier assigned to a field name
///
/// No `Safe` variant: the safe tier only applies to
/// request text, never to fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTier {
    High,
    Medium,
    Unclassified,
}

impl FieldTier {
    /// Whether a field of this tier belongs in the encrypted partition
    pub fn is_sensitive(self) -> bool {
        self == Self::High
    }
}

/// Classifies field names by keyword containment
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    table: KeywordTable,
}

impl KeywordClassifier {
    /// Create a classifier over a table (normalized on the way in)
    pub fn new(table: KeywordTable) -> Self {
        Self {
            table: table.normalized(),
        }
    }

    /// The normalized table in use
    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    /// Classify a field name. High is checked before Medium.
    pub fn classify(&self, field_name: &str) -> FieldTier {
        let name = field_name.to_lowercase();
        if contains_any(&name, &self.table.high_risk) {
            FieldTier::High
        } else if contains_any(&name, &self.table.medium_risk) {
            FieldTier::Medium
        } else {
            FieldTier::Unclassified
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(KeywordTable::default())
    }
}

fn contains_any(text: &str, phrases: &[String]) -> bool {
    phrases.iter().any(|p| text.contains(p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_high_risk_fields() {
        let classifier = KeywordClassifier::default();
        assert_eq!(classifier.classify("full name"), FieldTier::High);
        assert_eq!(classifier.classify("Date of Birth"), FieldTier::High);
        assert_eq!(
            classifier.classify("national identification number"),
            FieldTier::High
        );
        assert_eq!(classifier.classify("primary_email"), FieldTier::High);
    }

    #[test]
    fn test_classify_medium_and_unclassified() {
        let classifier = KeywordClassifier::default();
        assert_eq!(classifier.classify("gender"), FieldTier::Medium);
        assert_eq!(classifier.classify("Country"), FieldTier::Medium);
        assert_eq!(classifier.classify("favourite colour"), FieldTier::Unclassified);
    }

    #[test]
    fn test_high_takes_precedence_over_medium() {
        let classifier = KeywordClassifier::default();
        // "country" is medium, "phone number" is high
        assert_eq!(
            classifier.classify("country phone number"),
            FieldTier::High
        );
        // "employer" is medium, "email" is high
        assert_eq!(classifier.classify("employer email"), FieldTier::High);
    }

    #[test]
    fn test_normalized_lowercases_and_dedupes() {
        let table = KeywordTable {
            high_risk: vec!["OTP".into(), "otp".into(), "  ".into()],
            medium_risk: vec![],
            safe: vec![],
        }
        .normalized();
        assert_eq!(table.high_risk, vec!["otp".to_string()]);
    }

    #[test]
    fn test_uppercase_config_phrase_still_matches() {
        let classifier = KeywordClassifier::new(KeywordTable {
            high_risk: vec!["Secret Code".into()],
            medium_risk: vec![],
            safe: vec![],
        });
        assert_eq!(classifier.classify("user secret code"), FieldTier::High);
    }

    #[test]
    fn test_custom_table_swaps_strategy() {
        let classifier = KeywordClassifier::new(KeywordTable {
            high_risk: vec![],
            medium_risk: vec!["full name".into()],
            safe: vec![],
        });
        assert_eq!(classifier.classify("full name"), FieldTier::Medium);
    }

    #[test]
    fn test_default_table_sizes() {
        let table = KeywordTable::default();
        assert_eq!(table.high_risk.len(), 37);
        assert_eq!(table.medium_risk.len(), 18);
        assert_eq!(table.safe.len(), 13);
    }
}
