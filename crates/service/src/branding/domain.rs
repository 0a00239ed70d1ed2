use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::access::{normalize_email, Identity};
use crate::errors::ServiceError;

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    /// pending -> approved | rejected, plus re-applying the current status.
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        self == next || (self == SubmissionStatus::Pending && next != SubmissionStatus::Pending)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Like,
    Dislike,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Like => "like",
            VoteDirection::Dislike => "dislike",
        }
    }
}

/// What a cast did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteOutcome {
    /// First vote from this user.
    Recorded,
    /// The user's standing vote flipped direction.
    Switched,
    /// Same direction as the standing vote; nothing changed.
    Unchanged,
}

/// Like/dislike counters with at most one standing vote per user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteLedger {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub dislikes: u64,
    #[serde(default, deserialize_with = "normalized_actions")]
    pub user_actions: BTreeMap<String, VoteDirection>,
}

/// Older documents key votes by the raw email; fold them onto the normalized key.
fn normalized_actions<'de, D>(deserializer: D) -> Result<BTreeMap<String, VoteDirection>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, VoteDirection>::deserialize(deserializer)?;
    let mut actions = BTreeMap::new();
    for (email, direction) in raw {
        actions.entry(normalize_email(&email)).or_insert(direction);
    }
    Ok(actions)
}

impl VoteLedger {
    /// Record `voter`'s vote. Switching direction moves one count from the old
    /// counter (floored at zero) to the new one.
    pub fn cast(&mut self, voter: &str, direction: VoteDirection) -> VoteOutcome {
        let voter = normalize_email(voter);
        let outcome = match self.user_actions.get(&voter).copied() {
            Some(prev) if prev == direction => return VoteOutcome::Unchanged,
            Some(prev) => {
                let old = self.counter_mut(prev);
                *old = old.saturating_sub(1);
                VoteOutcome::Switched
            }
            None => VoteOutcome::Recorded,
        };
        *self.counter_mut(direction) += 1;
        self.user_actions.insert(voter, direction);
        outcome
    }

    pub fn action_of(&self, voter: &str) -> Option<VoteDirection> {
        self.user_actions.get(&normalize_email(voter)).copied()
    }

    /// Counters plus the viewer's own standing vote, without other voters' keys.
    pub fn summary_for(&self, viewer: Option<&str>) -> LedgerSummary {
        LedgerSummary {
            likes: self.likes,
            dislikes: self.dislikes,
            viewer_action: viewer.and_then(|v| self.action_of(v)),
        }
    }

    fn counter_mut(&mut self, direction: VoteDirection) -> &mut u64 {
        match direction {
            VoteDirection::Like => &mut self.likes,
            VoteDirection::Dislike => &mut self.dislikes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub likes: u64,
    pub dislikes: u64,
    pub viewer_action: Option<VoteDirection>,
}

/// A user-proposed name/logo/description awaiting or past admin review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub logo_url: String,
    pub user_email: String,
    pub user_name: String,
    #[serde(default)]
    pub user_image: Option<String>,
    pub status: SubmissionStatus,
    #[serde(flatten)]
    pub votes: VoteLedger,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// Build a pending record, snapshotting the submitter's identity.
    pub fn new(input: NewSubmission, submitter: &Identity, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            logo_url: input.logo_url.trim().to_string(),
            user_email: submitter.email.trim().to_string(),
            user_name: submitter.name.clone(),
            user_image: submitter.avatar_url.clone(),
            status: SubmissionStatus::Pending,
            votes: VoteLedger::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this record blocks `email` from submitting again.
    pub fn blocks_resubmission_by(&self, email_key: &str) -> bool {
        self.status != SubmissionStatus::Rejected && self.user_email.trim().eq_ignore_ascii_case(email_key)
    }

    pub fn transition(&mut self, next: SubmissionStatus, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if !self.status.can_transition_to(next) {
            return Err(ServiceError::InvalidTransition { from: self.status, to: next });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn cast_vote(&mut self, voter: &str, direction: VoteDirection, now: DateTime<Utc>) -> VoteOutcome {
        let outcome = self.votes.cast(voter, direction);
        if outcome != VoteOutcome::Unchanged {
            self.updated_at = now;
        }
        outcome
    }
}

/// Caller-supplied fields of a new submission; the submitter comes from the
/// verified identity, never from the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    pub name: String,
    pub description: String,
    pub logo_url: String,
}

impl NewSubmission {
    pub fn validate(&self) -> Result<(), ServiceError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation("name is required".into()));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(ServiceError::Validation(format!("name must be at most {MAX_NAME_CHARS} characters")));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(ServiceError::Validation("description is required".into()));
        }
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(ServiceError::Validation(format!(
                "description must be at most {MAX_DESCRIPTION_CHARS} characters"
            )));
        }
        if self.logo_url.trim().is_empty() {
            return Err(ServiceError::Validation("logoUrl is required".into()));
        }
        Ok(())
    }
}

/// Singleton ledger for the organization's existing logo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentLogoStats {
    #[serde(flatten)]
    pub votes: VoteLedger,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_vote_is_a_no_op() {
        let mut ledger = VoteLedger::default();
        assert_eq!(ledger.cast("a@x.com", VoteDirection::Like), VoteOutcome::Recorded);
        assert_eq!(ledger.cast("a@x.com", VoteDirection::Like), VoteOutcome::Unchanged);
        assert_eq!(ledger.likes, 1);
        assert_eq!(ledger.dislikes, 0);
    }

    #[test]
    fn switching_moves_the_count() {
        let mut ledger = VoteLedger::default();
        ledger.cast("a@x.com", VoteDirection::Like);
        ledger.cast("b@x.com", VoteDirection::Like);
        assert_eq!(ledger.cast("a@x.com", VoteDirection::Dislike), VoteOutcome::Switched);
        assert_eq!(ledger.likes, 1);
        assert_eq!(ledger.dislikes, 1);
        assert_eq!(ledger.action_of("a@x.com"), Some(VoteDirection::Dislike));
        assert_eq!(ledger.user_actions.len(), 2);
    }

    #[test]
    fn switching_floors_previous_counter_at_zero() {
        // hand-edited document where the counter disagrees with the actions map
        let mut ledger = VoteLedger { likes: 0, dislikes: 0, user_actions: BTreeMap::new() };
        ledger.user_actions.insert("a@x.com".into(), VoteDirection::Like);
        ledger.cast("a@x.com", VoteDirection::Dislike);
        assert_eq!(ledger.likes, 0);
        assert_eq!(ledger.dislikes, 1);
    }

    #[test]
    fn summary_hides_other_voters() {
        let mut ledger = VoteLedger::default();
        ledger.cast("a@x.com", VoteDirection::Dislike);
        let s = ledger.summary_for(Some("b@x.com"));
        assert_eq!(s.viewer_action, None);
        assert_eq!(s.dislikes, 1);
        assert_eq!(ledger.summary_for(Some("a@x.com")).viewer_action, Some(VoteDirection::Dislike));
    }

    #[test]
    fn status_transitions() {
        use SubmissionStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Pending));
    }

    #[test]
    fn new_submission_validation() {
        let ok = NewSubmission { name: "Sadak".into(), description: "roads".into(), logo_url: "/uploads/a.png".into() };
        assert!(ok.validate().is_ok());

        let blank = NewSubmission { name: "  ".into(), ..ok.clone() };
        assert!(matches!(blank.validate(), Err(ServiceError::Validation(_))));

        let long = NewSubmission { description: "x".repeat(MAX_DESCRIPTION_CHARS + 1), ..ok.clone() };
        assert!(matches!(long.validate(), Err(ServiceError::Validation(_))));

        let no_logo = NewSubmission { logo_url: String::new(), ..ok };
        assert!(matches!(no_logo.validate(), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn reads_documents_without_user_actions() {
        let raw = r#"[{
            "id": "3f1c2a4e-8b7d-4c1e-9f00-1a2b3c4d5e6f",
            "name": "Sadak",
            "description": "...",
            "logoUrl": "/uploads/a.png",
            "userEmail": "a@x.com",
            "userName": "A",
            "userImage": null,
            "status": "approved",
            "likes": 3,
            "dislikes": 1,
            "createdAt": "2024-05-01T10:00:00.000Z",
            "updatedAt": "2024-05-02T10:00:00.000Z"
        }]"#;
        let parsed: Vec<Submission> = serde_json::from_str(raw).expect("legacy document");
        assert_eq!(parsed[0].status, SubmissionStatus::Approved);
        assert_eq!(parsed[0].votes.likes, 3);
        assert!(parsed[0].votes.user_actions.is_empty());

        let stats: CurrentLogoStats =
            serde_json::from_str(r#"{"likes":2,"dislikes":0,"userActions":{"a@x.com":"like"}}"#).expect("stats");
        assert_eq!(stats.votes.action_of("a@x.com"), Some(VoteDirection::Like));
    }

    #[test]
    fn mixed_case_voter_keys_keep_one_standing_vote() {
        let mut stats: CurrentLogoStats =
            serde_json::from_str(r#"{"likes":1,"userActions":{"Foo@X.com":"like"}}"#).expect("stats");
        assert_eq!(stats.votes.user_actions.keys().collect::<Vec<_>>(), vec!["foo@x.com"]);
        assert_eq!(stats.votes.action_of("Foo@X.com"), Some(VoteDirection::Like));

        assert_eq!(stats.votes.cast("foo@x.com", VoteDirection::Like), VoteOutcome::Unchanged);
        assert_eq!(stats.votes.likes, 1);
        assert_eq!(stats.votes.cast("FOO@x.com", VoteDirection::Dislike), VoteOutcome::Switched);
        assert_eq!((stats.votes.likes, stats.votes.dislikes), (0, 1));
        assert_eq!(stats.votes.user_actions.len(), 1);
    }

    #[test]
    fn persisted_field_names_are_camel_case() {
        let id = Identity::new("a@x.com", "A", None);
        let input = NewSubmission { name: "n".into(), description: "d".into(), logo_url: "/u.png".into() };
        let s = Submission::new(input, &id, Utc::now());
        let v = serde_json::to_value(&s).expect("json");
        for key in ["logoUrl", "userEmail", "userName", "userImage", "likes", "dislikes", "userActions", "createdAt", "updatedAt"] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert_eq!(v["status"], "pending");
    }
}
