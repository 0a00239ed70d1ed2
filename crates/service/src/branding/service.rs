use std::{path::PathBuf, sync::Arc};

use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::domain::{
    CurrentLogoStats, LedgerSummary, NewSubmission, Submission, SubmissionStatus, VoteDirection, VoteOutcome,
};
use crate::access::{AccessGate, Identity, Role};
use crate::errors::ServiceError;
use crate::metrics;
use crate::storage::JsonDocumentStore;

pub type SubmissionsDocument = JsonDocumentStore<Vec<Submission>>;
pub type CurrentLogoDocument = JsonDocumentStore<CurrentLogoStats>;

/// Submission lifecycle and vote ledgers over two JSON documents.
///
/// Every operation takes the caller's verified identity (or `None` for an
/// anonymous caller) and checks it against the gate before touching storage.
#[derive(Clone)]
pub struct BrandingService {
    submissions: Arc<SubmissionsDocument>,
    current_logo: Arc<CurrentLogoDocument>,
    gate: AccessGate,
}

impl BrandingService {
    pub fn new(submissions: Arc<SubmissionsDocument>, current_logo: Arc<CurrentLogoDocument>, gate: AccessGate) -> Self {
        Self { submissions, current_logo, gate }
    }

    /// Open (and create if missing) both documents.
    pub async fn open<P, Q>(submissions_path: P, current_logo_path: Q, gate: AccessGate) -> Result<Self, ServiceError>
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
    {
        let submissions = JsonDocumentStore::new(submissions_path).await?;
        let current_logo = JsonDocumentStore::new(current_logo_path).await?;
        Ok(Self::new(submissions, current_logo, gate))
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn role_of(&self, caller: Option<&Identity>) -> Role {
        self.gate.role_of(caller)
    }

    /// Append a pending submission for the caller.
    ///
    /// The duplicate check and the append run inside one document update, so
    /// two racing requests from the same user cannot both succeed.
    #[instrument(skip(self, caller, input), fields(name = %input.name))]
    pub async fn create_submission(
        &self,
        caller: Option<&Identity>,
        input: NewSubmission,
    ) -> Result<Submission, ServiceError> {
        let submitter = self.gate.require_user(caller)?;
        input.validate()?;
        let email_key = submitter.key();

        let created = self
            .submissions
            .update(|docs| {
                if docs.iter().any(|s| s.blocks_resubmission_by(&email_key)) {
                    return Err(ServiceError::AlreadySubmitted);
                }
                let record = Submission::new(input, submitter, Utc::now());
                docs.push(record.clone());
                Ok(record)
            })
            .await?;

        metrics::SUBMISSIONS_CREATED_TOTAL.inc();
        info!(submission_id = %created.id, "submission_created");
        Ok(created)
    }

    /// Approved submissions, newest first. Open to everyone.
    pub async fn list_approved(&self) -> Result<Vec<Submission>, ServiceError> {
        self.list_with_status(SubmissionStatus::Approved).await
    }

    /// Pending submissions, newest first. Admin only.
    pub async fn list_pending(&self, caller: Option<&Identity>) -> Result<Vec<Submission>, ServiceError> {
        self.admin_list(caller, SubmissionStatus::Pending).await
    }

    /// Full records (submitter email and voter keys included) in one status,
    /// newest first. Admin only.
    pub async fn admin_list(
        &self,
        caller: Option<&Identity>,
        status: SubmissionStatus,
    ) -> Result<Vec<Submission>, ServiceError> {
        self.gate.require_admin(caller)?;
        self.list_with_status(status).await
    }

    async fn list_with_status(&self, status: SubmissionStatus) -> Result<Vec<Submission>, ServiceError> {
        let mut items: Vec<Submission> = self
            .submissions
            .load()
            .await?
            .into_iter()
            .filter(|s| s.status == status)
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(%status, count = items.len(), "listed submissions");
        Ok(items)
    }

    /// A single approved submission. Pending and rejected records are not
    /// visible here and read as `NotFound`.
    pub async fn get_submission(&self, id: Uuid) -> Result<Submission, ServiceError> {
        self.submissions
            .load()
            .await?
            .into_iter()
            .find(|s| s.id == id && s.status == SubmissionStatus::Approved)
            .ok_or_else(|| ServiceError::not_found("submission"))
    }

    /// Whether the caller already holds a submission that is not rejected.
    pub async fn has_submitted(&self, caller: Option<&Identity>) -> Result<bool, ServiceError> {
        let id = self.gate.require_user(caller)?;
        let email_key = id.key();
        let docs = self.submissions.load().await?;
        Ok(docs.iter().any(|s| s.blocks_resubmission_by(&email_key)))
    }

    /// Admin transition of a submission's status. Re-applying the current
    /// status succeeds and only advances `updatedAt`.
    #[instrument(skip(self, caller))]
    pub async fn set_status(
        &self,
        caller: Option<&Identity>,
        id: Uuid,
        status: SubmissionStatus,
    ) -> Result<Submission, ServiceError> {
        let admin = self.gate.require_admin(caller)?;

        let updated = self
            .submissions
            .update(|docs| {
                let record = docs
                    .iter_mut()
                    .find(|s| s.id == id)
                    .ok_or_else(|| ServiceError::not_found("submission"))?;
                record.transition(status, Utc::now())?;
                Ok(record.clone())
            })
            .await?;

        metrics::STATUS_CHANGES_TOTAL.with_label_values(&[status.as_str()]).inc();
        info!(submission_id = %id, %status, admin = %admin.email, "submission_status_changed");
        Ok(updated)
    }

    pub async fn approve(&self, caller: Option<&Identity>, id: Uuid) -> Result<Submission, ServiceError> {
        self.set_status(caller, id, SubmissionStatus::Approved).await
    }

    pub async fn reject(&self, caller: Option<&Identity>, id: Uuid) -> Result<Submission, ServiceError> {
        self.set_status(caller, id, SubmissionStatus::Rejected).await
    }

    /// Like or dislike an approved submission. Each user holds at most one
    /// standing vote per submission, same rule as the current logo.
    #[instrument(skip(self, caller))]
    pub async fn vote(
        &self,
        caller: Option<&Identity>,
        id: Uuid,
        direction: VoteDirection,
    ) -> Result<(Submission, VoteOutcome), ServiceError> {
        let voter = self.gate.require_user(caller)?.key();

        let (record, outcome) = self
            .submissions
            .update(|docs| {
                let record = docs
                    .iter_mut()
                    .find(|s| s.id == id && s.status == SubmissionStatus::Approved)
                    .ok_or_else(|| ServiceError::not_found("submission"))?;
                let outcome = record.cast_vote(&voter, direction, Utc::now());
                Ok((record.clone(), outcome))
            })
            .await?;

        metrics::VOTES_TOTAL
            .with_label_values(&["submission", direction.as_str(), outcome_label(outcome)])
            .inc();
        info!(submission_id = %id, direction = direction.as_str(), ?outcome, "submission_vote");
        Ok((record, outcome))
    }

    /// Like or dislike the current logo under the single-standing-vote rule.
    #[instrument(skip(self, caller))]
    pub async fn vote_current_logo(
        &self,
        caller: Option<&Identity>,
        direction: VoteDirection,
    ) -> Result<(LedgerSummary, VoteOutcome), ServiceError> {
        let voter = self.gate.require_user(caller)?.key();

        let (summary, outcome) = self
            .current_logo
            .update(|stats| {
                let outcome = stats.votes.cast(&voter, direction);
                Ok((stats.votes.summary_for(Some(&voter)), outcome))
            })
            .await?;

        metrics::VOTES_TOTAL
            .with_label_values(&["current_logo", direction.as_str(), outcome_label(outcome)])
            .inc();
        info!(direction = direction.as_str(), ?outcome, "current_logo_vote");
        Ok((summary, outcome))
    }

    /// Current-logo counters plus the caller's own standing vote.
    pub async fn current_logo(&self, caller: Option<&Identity>) -> Result<LedgerSummary, ServiceError> {
        let stats = self.current_logo.load().await?;
        let viewer = caller.map(Identity::key);
        Ok(stats.votes.summary_for(viewer.as_deref()))
    }
}

fn outcome_label(outcome: VoteOutcome) -> &'static str {
    match outcome {
        VoteOutcome::Recorded => "recorded",
        VoteOutcome::Switched => "switched",
        VoteOutcome::Unchanged => "unchanged",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const ADMIN: &str = "admin@example.com";

    struct Fixture {
        svc: BrandingService,
        dir: PathBuf,
    }

    impl Fixture {
        async fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("branding_svc_{}", Uuid::new_v4()));
            let svc = BrandingService::open(dir.join("submissions.json"), dir.join("current_logo.json"), AccessGate::new(ADMIN))
                .await
                .expect("open service");
            Self { svc, dir }
        }

        async fn cleanup(self) {
            let _ = tokio::fs::remove_dir_all(&self.dir).await;
        }
    }

    fn user(email: &str) -> Identity {
        Identity::new(email, email.split('@').next().unwrap_or("user"), None)
    }

    fn admin() -> Identity {
        Identity::new(ADMIN, "Admin", Some("https://img.example.com/admin.png".into()))
    }

    fn sadak() -> NewSubmission {
        NewSubmission { name: "Sadak".into(), description: "...".into(), logo_url: "/uploads/a.png".into() }
    }

    #[tokio::test]
    async fn create_then_approve_moves_between_lists() -> Result<(), anyhow::Error> {
        let fx = Fixture::new().await;
        let a = Identity::new("a@x.com", "A", None);

        let created = fx.svc.create_submission(Some(&a), sadak()).await?;
        assert_eq!(created.status, SubmissionStatus::Pending);
        assert_eq!(created.votes.likes, 0);
        assert_eq!(created.votes.dislikes, 0);
        assert_eq!(created.user_email, "a@x.com");
        assert_eq!(created.user_name, "A");
        assert_eq!(created.user_image, None);
        assert_eq!(created.created_at, created.updated_at);

        let pending = fx.svc.list_pending(Some(&admin())).await?;
        assert_eq!(pending, vec![created.clone()]);
        assert!(fx.svc.list_approved().await?.is_empty());

        let approved = fx.svc.set_status(Some(&admin()), created.id, SubmissionStatus::Approved).await?;
        assert_eq!(approved.status, SubmissionStatus::Approved);
        assert!(approved.updated_at >= created.updated_at);

        let listed = fx.svc.list_approved().await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert!(fx.svc.list_pending(Some(&admin())).await?.is_empty());
        assert_eq!(fx.svc.get_submission(created.id).await?.id, created.id);

        fx.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn create_requires_identity() -> Result<(), anyhow::Error> {
        let fx = Fixture::new().await;
        let res = fx.svc.create_submission(None, sadak()).await;
        assert!(matches!(res, Err(ServiceError::Unauthenticated)));
        fx.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn second_submission_is_rejected_until_first_is_rejected() -> Result<(), anyhow::Error> {
        let fx = Fixture::new().await;
        let a = user("a@x.com");

        let first = fx.svc.create_submission(Some(&a), sadak()).await?;
        assert!(fx.svc.has_submitted(Some(&a)).await?);

        // email comparison ignores case
        let shouting = user("A@X.COM");
        let dup = fx.svc.create_submission(Some(&shouting), sadak()).await;
        assert!(matches!(dup, Err(ServiceError::AlreadySubmitted)));

        fx.svc.reject(Some(&admin()), first.id).await?;
        assert!(!fx.svc.has_submitted(Some(&a)).await?);
        let again = fx.svc.create_submission(Some(&a), sadak()).await?;
        assert_eq!(again.status, SubmissionStatus::Pending);

        fx.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn approved_submission_still_blocks_resubmission() -> Result<(), anyhow::Error> {
        let fx = Fixture::new().await;
        let a = user("a@x.com");

        let first = fx.svc.create_submission(Some(&a), sadak()).await?;
        fx.svc.approve(Some(&admin()), first.id).await?;
        assert!(fx.svc.has_submitted(Some(&a)).await?);
        assert!(matches!(
            fx.svc.create_submission(Some(&a), sadak()).await,
            Err(ServiceError::AlreadySubmitted)
        ));
        assert_eq!(fx.svc.list_approved().await?.len(), 1);
        assert!(fx.svc.list_pending(Some(&admin())).await?.is_empty());

        fx.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn non_admin_cannot_change_status_and_document_is_unchanged() -> Result<(), anyhow::Error> {
        let fx = Fixture::new().await;
        let a = user("a@x.com");
        let created = fx.svc.create_submission(Some(&a), sadak()).await?;
        let before = tokio::fs::read(fx.dir.join("submissions.json")).await?;

        let res = fx.svc.set_status(Some(&a), created.id, SubmissionStatus::Approved).await;
        assert!(matches!(res, Err(ServiceError::Unauthorized)));
        let res = fx.svc.approve(None, created.id).await;
        assert!(matches!(res, Err(ServiceError::Unauthenticated)));
        assert!(matches!(fx.svc.list_pending(Some(&a)).await, Err(ServiceError::Unauthorized)));

        assert_eq!(tokio::fs::read(fx.dir.join("submissions.json")).await?, before);
        fx.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn set_status_unknown_id_and_invalid_transitions() -> Result<(), anyhow::Error> {
        let fx = Fixture::new().await;
        let res = fx.svc.approve(Some(&admin()), Uuid::new_v4()).await;
        assert!(matches!(res, Err(ServiceError::NotFound(_))));

        let created = fx.svc.create_submission(Some(&user("a@x.com")), sadak()).await?;
        let first = fx.svc.approve(Some(&admin()), created.id).await?;
        let second = fx.svc.approve(Some(&admin()), created.id).await?;
        assert_eq!(second.status, SubmissionStatus::Approved);
        assert!(second.updated_at >= first.updated_at);

        let res = fx.svc.reject(Some(&admin()), created.id).await;
        assert!(matches!(
            res,
            Err(ServiceError::InvalidTransition { from: SubmissionStatus::Approved, to: SubmissionStatus::Rejected })
        ));
        fx.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn approved_list_is_filtered_and_newest_first() -> Result<(), anyhow::Error> {
        let fx = Fixture::new().await;
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("timestamp");
        let mk = |email: &str, status: SubmissionStatus, offset_min: i64| {
            let mut s = Submission::new(sadak(), &user(email), base + Duration::minutes(offset_min));
            s.status = status;
            s
        };
        let docs = vec![
            mk("old@x.com", SubmissionStatus::Approved, 0),
            mk("pending@x.com", SubmissionStatus::Pending, 5),
            mk("new@x.com", SubmissionStatus::Approved, 10),
            mk("rejected@x.com", SubmissionStatus::Rejected, 20),
            mk("mid@x.com", SubmissionStatus::Approved, 3),
        ];
        tokio::fs::write(fx.dir.join("submissions.json"), serde_json::to_vec(&docs)?).await?;

        let listed = fx.svc.list_approved().await?;
        let emails: Vec<&str> = listed.iter().map(|s| s.user_email.as_str()).collect();
        assert_eq!(emails, vec!["new@x.com", "mid@x.com", "old@x.com"]);
        assert!(listed.iter().all(|s| s.status == SubmissionStatus::Approved));

        // pending and rejected records are not reachable by id either
        assert!(matches!(fx.svc.get_submission(docs[1].id).await, Err(ServiceError::NotFound(_))));
        fx.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn submission_votes_follow_single_standing_vote() -> Result<(), anyhow::Error> {
        let fx = Fixture::new().await;
        let created = fx.svc.create_submission(Some(&user("owner@x.com")), sadak()).await?;
        let voter = user("v@x.com");

        // only approved submissions take votes
        let res = fx.svc.vote(Some(&voter), created.id, VoteDirection::Like).await;
        assert!(matches!(res, Err(ServiceError::NotFound(_))));
        fx.svc.approve(Some(&admin()), created.id).await?;

        let (s, o) = fx.svc.vote(Some(&voter), created.id, VoteDirection::Like).await?;
        assert_eq!((s.votes.likes, s.votes.dislikes, o), (1, 0, VoteOutcome::Recorded));
        let (s, o) = fx.svc.vote(Some(&voter), created.id, VoteDirection::Like).await?;
        assert_eq!((s.votes.likes, s.votes.dislikes, o), (1, 0, VoteOutcome::Unchanged));
        let (s, o) = fx.svc.vote(Some(&voter), created.id, VoteDirection::Dislike).await?;
        assert_eq!((s.votes.likes, s.votes.dislikes, o), (0, 1, VoteOutcome::Switched));

        assert!(matches!(
            fx.svc.vote(None, created.id, VoteDirection::Like).await,
            Err(ServiceError::Unauthenticated)
        ));
        assert!(matches!(
            fx.svc.vote(Some(&voter), Uuid::new_v4(), VoteDirection::Like).await,
            Err(ServiceError::NotFound(_))
        ));
        fx.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn current_logo_like_then_dislike_flips_vote() -> Result<(), anyhow::Error> {
        let fx = Fixture::new().await;
        let a = user("a@x.com");
        fx.svc.vote_current_logo(Some(&user("b@x.com")), VoteDirection::Like).await?;

        let (after_like, o) = fx.svc.vote_current_logo(Some(&a), VoteDirection::Like).await?;
        assert_eq!(o, VoteOutcome::Recorded);
        assert_eq!(after_like.likes, 2);

        let (after_dislike, o) = fx.svc.vote_current_logo(Some(&a), VoteDirection::Dislike).await?;
        assert_eq!(o, VoteOutcome::Switched);
        assert_eq!(after_dislike.likes, after_like.likes - 1);
        assert_eq!(after_dislike.dislikes, after_like.dislikes + 1);
        assert_eq!(after_dislike.viewer_action, Some(VoteDirection::Dislike));

        let raw = tokio::fs::read(fx.dir.join("current_logo.json")).await?;
        let stats: CurrentLogoStats = serde_json::from_slice(&raw)?;
        assert_eq!(stats.votes.action_of("a@x.com"), Some(VoteDirection::Dislike));

        fx.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn current_logo_repeat_like_counts_once() -> Result<(), anyhow::Error> {
        let fx = Fixture::new().await;
        let a = user("a@x.com");
        fx.svc.vote_current_logo(Some(&a), VoteDirection::Like).await?;
        let (summary, outcome) = fx.svc.vote_current_logo(Some(&a), VoteDirection::Like).await?;
        assert_eq!(outcome, VoteOutcome::Unchanged);
        assert_eq!(summary.likes, 1);

        let anon = fx.svc.current_logo(None).await?;
        assert_eq!(anon.likes, 1);
        assert_eq!(anon.viewer_action, None);
        assert!(matches!(
            fx.svc.vote_current_logo(None, VoteDirection::Like).await,
            Err(ServiceError::Unauthenticated)
        ));
        fx.cleanup().await;
        Ok(())
    }

    #[tokio::test]
    async fn mixed_case_voter_in_older_document_votes_once() -> Result<(), anyhow::Error> {
        let fx = Fixture::new().await;
        tokio::fs::write(
            fx.dir.join("current_logo.json"),
            r#"{"likes":1,"dislikes":0,"userActions":{"Foo@X.com":"like"}}"#,
        )
        .await?;
        let foo = user("Foo@X.com");

        assert_eq!(fx.svc.current_logo(Some(&foo)).await?.viewer_action, Some(VoteDirection::Like));
        let (summary, outcome) = fx.svc.vote_current_logo(Some(&foo), VoteDirection::Like).await?;
        assert_eq!(outcome, VoteOutcome::Unchanged);
        assert_eq!(summary.likes, 1);

        let raw = tokio::fs::read(fx.dir.join("current_logo.json")).await?;
        let stats: CurrentLogoStats = serde_json::from_slice(&raw)?;
        assert_eq!(stats.votes.user_actions.len(), 1);

        fx.cleanup().await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_current_logo_votes_are_all_counted() -> Result<(), anyhow::Error> {
        let fx = Fixture::new().await;
        let svc = Arc::new(fx.svc.clone());
        let mut handles = Vec::new();
        for i in 0..24 {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move {
                let voter = user(&format!("voter{i}@x.com"));
                svc.vote_current_logo(Some(&voter), VoteDirection::Like).await.map(|_| ())
            }));
        }
        for h in handles {
            h.await??;
        }
        assert_eq!(svc.current_logo(None).await?.likes, 24);
        fx.cleanup().await;
        Ok(())
    }
}
