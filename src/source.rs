//! Source-of-truth identity records
//!
//! [`MockNimcSource`] stands in for the national identity registry with a
//! handful of fixed demo records.

use crate::types::FieldMap;

/// Looks up the raw identity record for a natural key
pub trait RecordSource: Send + Sync {
    /// Source name for logs
    fn name(&self) -> &str;

    /// Return the raw record, or `None` for an unknown natural key
    fn lookup(&self, natural_key: &str) -> Option<FieldMap>;
}

/// Fields exposed from a registry entry
const EXPOSED_FIELDS: [&str; 5] = [
    "full name",
    "date of birth",
    "country",
    "gender",
    "national identification number",
];

/// In-process mock of the NIMC registry
#[derive(Debug, Clone)]
pub struct MockNimcSource {
    records: Vec<FieldMap>,
}

impl MockNimcSource {
    /// Build a source over custom records; each must carry a `nin` field
    pub fn with_records(records: Vec<FieldMap>) -> Self {
        Self { records }
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MockNimcSource {
    fn default() -> Self {
        Self::with_records(vec![
            demo_record(&[
                ("nin", "12345678901"),
                ("full name", "Fatima Adeleke"),
                ("date of birth", "2000-04-12"),
                ("home address", "12 Adeola Street, Surulere, Lagos"),
                ("phone number", "+2348012345678"),
                ("email address", "fatima.adeleke@example.com"),
                ("national identification number", "12345678901"),
                ("bvn number", "2244668899"),
                ("passport number", "A00987654"),
                ("gender", "Female"),
                ("marital status", "Single"),
                ("country", "Nigeria"),
            ]),
            demo_record(&[
                ("nin", "98765432109"),
                ("full name", "Chidi Okafor"),
                ("date of birth", "1995-09-23"),
                ("home address", "45 Ogui Road, Enugu"),
                ("phone number", "+2348098765432"),
                ("email address", "chidi.okafor@example.com"),
                ("national identification number", "98765432109"),
                ("bvn number", "1122334455"),
                ("passport number", "B00654321"),
                ("gender", "Male"),
                ("marital status", "Married"),
                ("country", "Nigeria"),
            ]),
            demo_record(&[
                ("nin", "11122233344"),
                ("full name", "Zainab Musa"),
                ("date of birth", "2003-01-10"),
                ("home address", "8 Aliyu Close, Kaduna"),
                ("phone number", "+2348055555555"),
                ("email address", "zainab.musa@example.com"),
                ("national identification number", "11122233344"),
                ("bvn number", "5566778899"),
                ("passport number", "C00321456"),
                ("gender", "Female"),
                ("marital status", "Single"),
                ("country", "Nigeria"),
            ]),
        ])
    }
}

impl RecordSource for MockNimcSource {
    fn name(&self) -> &str {
        "mock-nimc"
    }

    fn lookup(&self, natural_key: &str) -> Option<FieldMap> {
        let entry = self
            .records
            .iter()
            .find(|r| r.get("nin").map(String::as_str) == Some(natural_key))?;

        Some(
            EXPOSED_FIELDS
                .iter()
                .filter_map(|field| entry.get(*field).map(|v| (field.to_string(), v.clone())))
                .collect(),
        )
    }
}

fn demo_record(pairs: &[(&str, &str)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
