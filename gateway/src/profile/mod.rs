// ============================================================================
// Profile Model
// ============================================================================
//
// Domain type for user profiles plus the single normalization point at the
// store boundary. The store keeps profiles as string hashes, and older
// writers stored the onboarding flag as the strings "true"/"false" while
// newer ones stored a native boolean; whatever arrives on the wire, the
// rest of the pipeline only ever sees a bool.
//
// ============================================================================

pub mod store;

pub use store::{ProfileStore, RedisProfileStore};

use std::collections::HashMap;

use chrono::{DateTime, Utc};

const ONBOARDING_COMPLETED_FIELD: &str = "onboardingCompleted";
const LAST_UPDATED_AT_FIELD: &str = "lastUpdatedAt";

#[derive(Debug, Clone)]
pub struct Profile {
    pub user_id: String,
    pub onboarding_completed: bool,
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Remaining profile fields, opaque to the gate
    pub fields: HashMap<String, String>,
}

impl Profile {
    /// Build a Profile from the raw store hash.
    ///
    /// An empty hash means the key does not exist (hash-map store
    /// semantics), so this returns None rather than an empty profile.
    pub fn from_wire(user_id: &str, mut raw: HashMap<String, String>) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }

        let onboarding_completed = normalize_flag(raw.remove(ONBOARDING_COMPLETED_FIELD));
        let last_updated_at = raw
            .remove(LAST_UPDATED_AT_FIELD)
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Some(Self {
            user_id: user_id.to_string(),
            onboarding_completed,
            last_updated_at,
            fields: raw,
        })
    }
}

/// Normalize the onboarding flag's wire representation to a bool.
///
/// Accepts the string forms "true"/"false" (any case) and "1"/"0" as well
/// as a missing field; anything unrecognized counts as incomplete.
fn normalize_flag(raw: Option<String>) -> bool {
    match raw.as_deref() {
        Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_hash_is_not_found() {
        assert!(Profile::from_wire("u1", HashMap::new()).is_none());
    }

    #[test]
    fn boolean_string_true_normalizes() {
        let profile = Profile::from_wire("u1", wire(&[("onboardingCompleted", "true")])).unwrap();
        assert!(profile.onboarding_completed);
    }

    #[test]
    fn boolean_string_false_normalizes() {
        let profile = Profile::from_wire("u1", wire(&[("onboardingCompleted", "false")])).unwrap();
        assert!(!profile.onboarding_completed);
    }

    #[test]
    fn mixed_case_and_numeric_forms() {
        for v in ["TRUE", "True", "1"] {
            let profile = Profile::from_wire("u1", wire(&[("onboardingCompleted", v)])).unwrap();
            assert!(profile.onboarding_completed, "value {:?}", v);
        }
        for v in ["FALSE", "0", "yes", ""] {
            let profile = Profile::from_wire("u1", wire(&[("onboardingCompleted", v)])).unwrap();
            assert!(!profile.onboarding_completed, "value {:?}", v);
        }
    }

    #[test]
    fn missing_flag_means_incomplete() {
        let profile = Profile::from_wire("u1", wire(&[("name", "Ada")])).unwrap();
        assert!(!profile.onboarding_completed);
    }

    #[test]
    fn opaque_fields_survive() {
        let profile = Profile::from_wire(
            "u1",
            wire(&[
                ("onboardingCompleted", "true"),
                ("name", "Ada"),
                ("lastUpdatedAt", "2026-01-15T10:00:00Z"),
            ]),
        )
        .unwrap();
        assert_eq!(profile.fields.get("name").map(String::as_str), Some("Ada"));
        assert!(profile.last_updated_at.is_some());
        // Normalized fields are lifted out of the opaque map
        assert!(!profile.fields.contains_key("onboardingCompleted"));
    }
}
