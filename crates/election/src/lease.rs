//! The lease record held by the current leader of an election.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A time-bounded claim on a named election, identifying its current
/// leader.
///
/// Serialized field names are stable (`ParticipantId`, `AcquiredAt`,
/// `ExpiresAt`, `Metadata`) since they're read by every process
/// participating in the election, not just the one that wrote them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LeaderInfo {
    pub participant_id: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl LeaderInfo {
    pub fn new(
        participant_id: impl Into<String>,
        acquired_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        metadata: Option<HashMap<String, String>>,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            acquired_at,
            expires_at,
            metadata,
        }
    }

    /// `true` if this lease's expiry is still in the future.
    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now()
    }

    /// Remaining time until expiry. Negative if already expired.
    pub fn time_to_expiry(&self) -> chrono::Duration {
        self.expires_at - Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_valid_reflects_expiry() {
        let now = Utc::now();
        let live = LeaderInfo::new("p1", now, now + chrono::Duration::minutes(5), None);
        assert!(live.is_valid());

        let expired = LeaderInfo::new("p1", now - chrono::Duration::minutes(10), now - chrono::Duration::minutes(5), None);
        assert!(!expired.is_valid());
    }

    #[test]
    fn serializes_with_stable_pascal_case_field_names() {
        let now = Utc::now();
        let info = LeaderInfo::new("p1", now, now + chrono::Duration::minutes(5), None);
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"ParticipantId\":\"p1\""));
        assert!(json.contains("\"AcquiredAt\""));
        assert!(json.contains("\"ExpiresAt\""));
    }

    #[test]
    fn round_trips_through_json() {
        let now = Utc::now();
        let mut metadata = HashMap::new();
        metadata.insert("region".to_string(), "us-east".to_string());
        let info = LeaderInfo::new("p1", now, now + chrono::Duration::minutes(5), Some(metadata));

        let json = serde_json::to_string(&info).unwrap();
        let back: LeaderInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, back);
    }
}
