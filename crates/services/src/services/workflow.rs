//! The workflow engine: conference-phase transitions, phase- and role-gated
//! paper actions, and the finalization pass that reconciles every paper's
//! disposition when a conference closes out.
//!
//! Every operation authorizes first, then validates input, then checks the
//! state machines, and only then writes. Single-entity writes carry an
//! optimistic version check; finalization commits the conference phase and
//! all paper dispositions in one transaction.

use db::{
    DBService,
    models::{
        conference::{Conference, ConferenceError, ConferenceState, CreateConference},
        paper::{ContentType, CreatePaper, Paper, PaperError, PaperReview, PaperState},
        user::{Role, User, UserError},
    },
};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use super::policy::{Action, Principal, PolicyError, authorize};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Conference(#[from] ConferenceError),
    #[error(transparent)]
    Paper(#[from] PaperError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Conference must be in the {required} phase for this action, current phase is {actual}")]
    PhaseMismatch {
        required: ConferenceState,
        actual: ConferenceState,
    },
    #[error("Action {action} is not allowed for a paper in the {state} state")]
    IllegalPaperState {
        action: &'static str,
        state: PaperState,
    },
    #[error("Only an author of the paper may manage it")]
    NotPaperAuthor,
    #[error("{0}")]
    Validation(String),
}

pub type Result<T, E = WorkflowError> = std::result::Result<T, E>;

#[derive(Clone)]
pub struct WorkflowService {
    pool: SqlitePool,
}

impl WorkflowService {
    pub fn new(db: &DBService) -> Self {
        Self {
            pool: db.pool.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Conference lifecycle
    // ------------------------------------------------------------------

    pub async fn create_conference(
        &self,
        principal: &Principal,
        data: CreateConference,
    ) -> Result<Conference> {
        authorize(principal, Action::CreateConference)?;

        if data.name.trim().is_empty() || data.description.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "Name and description are required".into(),
            ));
        }
        if data.chair_ids.is_empty() {
            return Err(WorkflowError::Validation(
                "At least one PC chair is required".into(),
            ));
        }
        self.require_users_with_role(&data.chair_ids, Role::PcChair)
            .await?;
        self.require_users_with_role(&data.member_ids, Role::PcMember)
            .await?;

        let conference = Conference::create(&self.pool, &data).await?;
        tracing::info!(conference = %conference.name, "conference created");
        Ok(conference)
    }

    /// Strict one-step phase advance. Transitioning into FINAL additionally
    /// runs the finalization pass over the conference's papers; the phase
    /// change and the dispositions commit together or not at all.
    pub async fn transition_conference(
        &self,
        principal: &Principal,
        conference_id: Uuid,
        target: ConferenceState,
    ) -> Result<Conference> {
        authorize(principal, Action::TransitionConference)?;

        let conference = self.load_conference(conference_id).await?;
        conference.state.validate_transition(target)?;

        let mut tx = self.pool.begin().await?;
        if target == ConferenceState::Final {
            Paper::finalize_dispositions(&mut *tx, conference_id).await?;
        }
        Conference::advance_state(&mut *tx, conference_id, target, conference.version).await?;
        tx.commit().await?;

        if target == ConferenceState::Final {
            tracing::info!(conference = %conference.name, "conference finalized, paper dispositions settled");
        } else {
            tracing::info!(conference = %conference.name, from = %conference.state, to = %target, "conference phase advanced");
        }

        self.load_conference(conference_id).await
    }

    /// Deletion is only legal before the workflow graph has begun.
    pub async fn delete_conference(&self, principal: &Principal, conference_id: Uuid) -> Result<()> {
        authorize(principal, Action::DeleteConference)?;

        let conference = self.load_conference(conference_id).await?;
        if conference.state != ConferenceState::Created {
            return Err(ConferenceError::NotDeletable(conference.state).into());
        }
        Conference::delete(&self.pool, conference_id).await?;
        tracing::info!(conference = %conference.name, "conference deleted");
        Ok(())
    }

    pub async fn add_chairs(
        &self,
        principal: &Principal,
        conference_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Conference> {
        authorize(principal, Action::ManageMembership)?;
        self.load_conference(conference_id).await?;
        self.require_users_with_role(user_ids, Role::PcChair).await?;
        Conference::add_chairs(&self.pool, conference_id, user_ids).await?;
        self.load_conference(conference_id).await
    }

    pub async fn add_members(
        &self,
        principal: &Principal,
        conference_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Conference> {
        authorize(principal, Action::ManageMembership)?;
        self.load_conference(conference_id).await?;
        self.require_users_with_role(user_ids, Role::PcMember).await?;
        Conference::add_members(&self.pool, conference_id, user_ids).await?;
        self.load_conference(conference_id).await
    }

    // ------------------------------------------------------------------
    // Paper lifecycle
    // ------------------------------------------------------------------

    pub async fn create_paper(&self, principal: &Principal, mut data: CreatePaper) -> Result<Paper> {
        authorize(principal, Action::CreatePaper)?;

        if data.title.trim().is_empty() || data.abstract_text.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "Title and abstract are required".into(),
            ));
        }
        if !Paper::content_fields_consistent(&data.content, &data.content_type) {
            return Err(WorkflowError::Validation(
                "Content and content type must be provided together".into(),
            ));
        }
        self.load_conference(data.conference_id).await?;

        if data.authors.is_empty() {
            data.authors = vec![principal.username.clone()];
        }
        let paper = Paper::create(&self.pool, &data).await?;
        tracing::info!(paper = %paper.title, "paper created");
        Ok(paper)
    }

    /// Submit content while the conference accepts submissions. Resubmission
    /// during the window replaces the previous upload.
    pub async fn submit_paper(
        &self,
        principal: &Principal,
        paper_id: Uuid,
        content: Vec<u8>,
        content_type: ContentType,
    ) -> Result<Paper> {
        authorize(principal, Action::SubmitPaper)?;

        if content.is_empty() {
            return Err(WorkflowError::Validation(
                "Content is required for submission".into(),
            ));
        }

        let (paper, conference) = self.load_paper_and_conference(paper_id).await?;
        require_phase(&conference, ConferenceState::Submission)?;
        if !matches!(paper.state, PaperState::Created | PaperState::Submitted) {
            return Err(WorkflowError::IllegalPaperState {
                action: "submit",
                state: paper.state,
            });
        }

        Paper::record_submission(&self.pool, paper_id, &content, content_type, paper.version)
            .await?;
        self.load_paper(paper_id).await
    }

    /// Add a co-author to a paper the caller authors. The co-author must be a
    /// registered user and must not already be listed on the paper. No phase
    /// restriction: author lists may be corrected at any point.
    pub async fn add_co_author(
        &self,
        principal: &Principal,
        paper_id: Uuid,
        co_author: &str,
    ) -> Result<Paper> {
        authorize(principal, Action::ManageCoAuthors)?;

        if co_author.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "Co-author name is required".into(),
            ));
        }

        let paper = self.load_paper(paper_id).await?;
        let authors = paper.authors_parsed();
        let mut co_authors = paper.co_authors_parsed();
        if !authors.iter().chain(co_authors.iter()).any(|a| a == &principal.username) {
            return Err(WorkflowError::NotPaperAuthor);
        }

        if User::find_by_username(&self.pool, co_author)
            .await
            .map_err(UserError::from)?
            .is_none()
        {
            return Err(WorkflowError::Validation(format!(
                "User {} does not exist",
                co_author
            )));
        }
        if authors.iter().chain(co_authors.iter()).any(|a| a == co_author) {
            return Err(WorkflowError::Validation(format!(
                "User {} is already listed on the paper",
                co_author
            )));
        }

        co_authors.push(co_author.to_string());
        Paper::update_co_authors(&self.pool, paper_id, &co_authors, paper.version).await?;
        self.load_paper(paper_id).await
    }

    /// Assign a reviewer during the assignment phase. At most two reviewers
    /// per paper; the cap applies to assignment, not to review submission.
    pub async fn assign_reviewer(
        &self,
        principal: &Principal,
        paper_id: Uuid,
        reviewer: &str,
    ) -> Result<Paper> {
        authorize(principal, Action::AssignReviewer)?;

        if reviewer.trim().is_empty() {
            return Err(WorkflowError::Validation("Reviewer name is required".into()));
        }

        let (paper, conference) = self.load_paper_and_conference(paper_id).await?;
        require_phase(&conference, ConferenceState::Assignment)?;

        let mut reviewers = paper.reviewers_parsed();
        if reviewers.iter().any(|r| r == reviewer) {
            return Err(PaperError::ReviewerAlreadyAssigned.into());
        }
        if reviewers.len() >= 2 {
            return Err(PaperError::CapacityExceeded.into());
        }
        reviewers.push(reviewer.to_string());

        Paper::update_reviewers(&self.pool, paper_id, &reviewers, paper.version).await?;
        self.load_paper(paper_id).await
    }

    /// Append a score and/or comment during the review phase. Appends are
    /// unconditional: the same reviewer may file several records.
    pub async fn append_review(
        &self,
        principal: &Principal,
        paper_id: Uuid,
        score: Option<i64>,
        comment: Option<&str>,
    ) -> Result<PaperReview> {
        authorize(principal, Action::RecordReview)?;

        if let Some(score) = score {
            if !(0..=10).contains(&score) {
                return Err(WorkflowError::Validation(format!(
                    "Score must be between 0 and 10, got {}",
                    score
                )));
            }
        }
        if score.is_none() && comment.map_or(true, |c| c.trim().is_empty()) {
            return Err(WorkflowError::Validation(
                "A review needs a score or a comment".into(),
            ));
        }

        let (_, conference) = self.load_paper_and_conference(paper_id).await?;
        require_phase(&conference, ConferenceState::Review)?;

        let review = Paper::append_review(
            &self.pool,
            paper_id,
            &principal.username,
            score,
            comment,
        )
        .await?;
        Ok(review)
    }

    pub async fn approve_paper(&self, principal: &Principal, paper_id: Uuid) -> Result<Paper> {
        self.decide_paper(principal, paper_id, PaperState::Approved).await
    }

    pub async fn reject_paper(&self, principal: &Principal, paper_id: Uuid) -> Result<Paper> {
        self.decide_paper(principal, paper_id, PaperState::Rejected).await
    }

    async fn decide_paper(
        &self,
        principal: &Principal,
        paper_id: Uuid,
        decision: PaperState,
    ) -> Result<Paper> {
        authorize(principal, Action::DecidePaper)?;

        let (paper, conference) = self.load_paper_and_conference(paper_id).await?;
        require_phase(&conference, ConferenceState::Decision)?;

        Paper::set_state(&self.pool, paper_id, decision, paper.version).await?;
        tracing::info!(paper = %paper.title, decision = %decision, "decision recorded");
        self.load_paper(paper_id).await
    }

    /// Camera-ready submission for an approved paper, with the note
    /// describing how reviewer comments were addressed.
    pub async fn final_submit_paper(
        &self,
        principal: &Principal,
        paper_id: Uuid,
        content: Vec<u8>,
        content_type: ContentType,
        addressing_comments: &str,
    ) -> Result<Paper> {
        authorize(principal, Action::FinalSubmitPaper)?;

        if content.is_empty() || addressing_comments.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "Final content and addressing comments are required".into(),
            ));
        }

        let (paper, conference) = self.load_paper_and_conference(paper_id).await?;
        require_phase(&conference, ConferenceState::FinalSubmission)?;
        if paper.state != PaperState::Approved {
            return Err(WorkflowError::IllegalPaperState {
                action: "final-submit",
                state: paper.state,
            });
        }

        Paper::record_final_submission(
            &self.pool,
            paper_id,
            &content,
            content_type,
            addressing_comments,
            paper.version,
        )
        .await?;
        self.load_paper(paper_id).await
    }

    /// Explicit acceptance once the conference has closed.
    pub async fn accept_paper(&self, principal: &Principal, paper_id: Uuid) -> Result<Paper> {
        authorize(principal, Action::AcceptPaper)?;

        let (paper, conference) = self.load_paper_and_conference(paper_id).await?;
        require_phase(&conference, ConferenceState::Final)?;
        if !matches!(paper.state, PaperState::FinalSubmitted | PaperState::Approved) {
            return Err(WorkflowError::IllegalPaperState {
                action: "accept",
                state: paper.state,
            });
        }

        Paper::set_state(&self.pool, paper_id, PaperState::Accepted, paper.version).await?;
        self.load_paper(paper_id).await
    }

    /// Withdrawal deletes the paper outright.
    pub async fn withdraw_paper(&self, principal: &Principal, paper_id: Uuid) -> Result<()> {
        authorize(principal, Action::WithdrawPaper)?;

        let paper = self.load_paper(paper_id).await?;
        Paper::delete(&self.pool, paper_id).await?;
        tracing::info!(paper = %paper.title, "paper withdrawn");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn load_conference(&self, id: Uuid) -> Result<Conference> {
        Conference::find_by_id(&self.pool, id)
            .await
            .map_err(ConferenceError::from)?
            .ok_or_else(|| ConferenceError::NotFound.into())
    }

    async fn load_paper(&self, id: Uuid) -> Result<Paper> {
        Paper::find_by_id(&self.pool, id)
            .await
            .map_err(PaperError::from)?
            .ok_or_else(|| PaperError::NotFound.into())
    }

    async fn load_paper_and_conference(&self, paper_id: Uuid) -> Result<(Paper, Conference)> {
        let paper = self.load_paper(paper_id).await?;
        let conference = self.load_conference(paper.conference_id).await?;
        Ok((paper, conference))
    }

    async fn require_users_with_role(&self, ids: &[Uuid], role: Role) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();
        let users = User::find_by_ids(&self.pool, &unique)
            .await
            .map_err(UserError::from)?;
        if users.len() != unique.len() {
            return Err(WorkflowError::Validation(format!(
                "One or more {} users do not exist",
                role
            )));
        }
        if let Some(user) = users.iter().find(|u| !u.has_role(role)) {
            return Err(WorkflowError::Validation(format!(
                "User {} does not have the {} role",
                user.username, role
            )));
        }
        Ok(())
    }
}

fn require_phase(conference: &Conference, required: ConferenceState) -> Result<()> {
    if conference.state == required {
        Ok(())
    } else {
        Err(WorkflowError::PhaseMismatch {
            required,
            actual: conference.state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::models::user::CreateUser;
    use tempfile::TempDir;

    struct TestHarness {
        _dir: TempDir,
        db: DBService,
        workflow: WorkflowService,
        chair: Principal,
        author: Principal,
        member: Principal,
    }

    async fn setup() -> TestHarness {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}/test.sqlite", dir.path().display());
        let db = DBService::new_with_url(&url).await.expect("test db");
        let workflow = WorkflowService::new(&db);

        let chair = seed_user(&db, "chair", &[Role::PcChair]).await;
        let author = seed_user(&db, "alice", &[Role::Author]).await;
        let member = seed_user(&db, "rev1", &[Role::PcMember]).await;

        TestHarness {
            _dir: dir,
            db,
            workflow,
            chair,
            author,
            member,
        }
    }

    async fn seed_user(db: &DBService, username: &str, roles: &[Role]) -> Principal {
        let user = User::create(
            &db.pool,
            &CreateUser {
                username: username.to_string(),
                password: "secret123".to_string(),
                full_name: format!("{} Test", username),
                roles: roles.to_vec(),
            },
        )
        .await
        .expect("seed user");
        Principal {
            user_id: user.id,
            username: user.username,
            roles: roles.to_vec(),
        }
    }

    async fn seed_conference(h: &TestHarness, name: &str) -> Conference {
        h.workflow
            .create_conference(
                &h.chair,
                CreateConference {
                    name: name.to_string(),
                    description: "Test conference".to_string(),
                    chair_ids: vec![h.chair.user_id],
                    member_ids: vec![h.member.user_id],
                },
            )
            .await
            .expect("seed conference")
    }

    async fn advance_to(h: &TestHarness, id: Uuid, target: ConferenceState) {
        let order = [
            ConferenceState::Submission,
            ConferenceState::Assignment,
            ConferenceState::Review,
            ConferenceState::Decision,
            ConferenceState::FinalSubmission,
            ConferenceState::Final,
        ];
        let current = Conference::find_by_id(&h.db.pool, id)
            .await
            .expect("load conference")
            .expect("conference exists")
            .state;
        let start = order
            .iter()
            .position(|s| *s == current)
            .map_or(0, |i| i + 1);
        for state in order.into_iter().skip(start) {
            h.workflow
                .transition_conference(&h.chair, id, state)
                .await
                .expect("advance");
            if state == target {
                return;
            }
        }
        panic!("target state never reached");
    }

    async fn seed_paper(h: &TestHarness, conference_id: Uuid, title: &str) -> Paper {
        h.workflow
            .create_paper(
                &h.author,
                CreatePaper {
                    conference_id,
                    title: title.to_string(),
                    abstract_text: "An abstract".to_string(),
                    content: None,
                    content_type: None,
                    authors: vec![],
                    co_authors: vec![],
                },
            )
            .await
            .expect("seed paper")
    }

    #[tokio::test]
    async fn conference_advances_one_step_at_a_time() {
        let h = setup().await;
        let conf = seed_conference(&h, "SIGSTATE").await;

        // skipping a phase is rejected
        let err = h
            .workflow
            .transition_conference(&h.chair, conf.id, ConferenceState::Assignment)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Conference(ConferenceError::InvalidTransition { .. })
        ));

        // the full forward walk succeeds
        advance_to(&h, conf.id, ConferenceState::Final).await;

        // FINAL is terminal
        for target in [
            ConferenceState::Created,
            ConferenceState::Submission,
            ConferenceState::Final,
        ] {
            let err = h
                .workflow
                .transition_conference(&h.chair, conf.id, target)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                WorkflowError::Conference(ConferenceError::InvalidTransition { .. })
            ));
        }
    }

    #[tokio::test]
    async fn backward_transition_is_rejected() {
        let h = setup().await;
        let conf = seed_conference(&h, "BACK").await;
        advance_to(&h, conf.id, ConferenceState::Review).await;

        let err = h
            .workflow
            .transition_conference(&h.chair, conf.id, ConferenceState::Assignment)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Conference(ConferenceError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn submit_requires_submission_phase() {
        let h = setup().await;
        let conf = seed_conference(&h, "PHASES").await;
        let paper = seed_paper(&h, conf.id, "Early Bird").await;

        // conference still in CREATED
        let err = h
            .workflow
            .submit_paper(&h.author, paper.id, b"pdf bytes".to_vec(), ContentType::Pdf)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::PhaseMismatch {
                required: ConferenceState::Submission,
                actual: ConferenceState::Created,
            }
        ));

        advance_to(&h, conf.id, ConferenceState::Submission).await;
        let submitted = h
            .workflow
            .submit_paper(&h.author, paper.id, b"pdf bytes".to_vec(), ContentType::Pdf)
            .await
            .expect("submit");
        assert_eq!(submitted.state, PaperState::Submitted);

        // resubmission during the window is allowed
        let resubmitted = h
            .workflow
            .submit_paper(&h.author, paper.id, b"revised".to_vec(), ContentType::Latex)
            .await
            .expect("resubmit");
        assert_eq!(resubmitted.state, PaperState::Submitted);
        assert_eq!(
            resubmitted.content_type.as_deref(),
            Some("application/x-latex")
        );
    }

    #[tokio::test]
    async fn reviewer_assignment_caps_at_two() {
        let h = setup().await;
        let conf = seed_conference(&h, "CAPS").await;
        advance_to(&h, conf.id, ConferenceState::Submission).await;
        let paper = seed_paper(&h, conf.id, "Crowded").await;
        h.workflow
            .submit_paper(&h.author, paper.id, b"pdf".to_vec(), ContentType::Pdf)
            .await
            .expect("submit");
        advance_to(&h, conf.id, ConferenceState::Assignment).await;

        h.workflow
            .assign_reviewer(&h.chair, paper.id, "rev1")
            .await
            .expect("first reviewer");
        let updated = h
            .workflow
            .assign_reviewer(&h.chair, paper.id, "rev2")
            .await
            .expect("second reviewer");
        assert_eq!(updated.reviewers_parsed(), vec!["rev1", "rev2"]);

        let err = h
            .workflow
            .assign_reviewer(&h.chair, paper.id, "rev3")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Paper(PaperError::CapacityExceeded)
        ));

        let err = h
            .workflow
            .assign_reviewer(&h.chair, paper.id, "rev1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Paper(PaperError::ReviewerAlreadyAssigned)
        ));
    }

    #[tokio::test]
    async fn review_scores_are_bounded() {
        let h = setup().await;
        let conf = seed_conference(&h, "SCORES").await;
        advance_to(&h, conf.id, ConferenceState::Submission).await;
        let paper = seed_paper(&h, conf.id, "Scored").await;
        h.workflow
            .submit_paper(&h.author, paper.id, b"pdf".to_vec(), ContentType::Pdf)
            .await
            .expect("submit");
        advance_to(&h, conf.id, ConferenceState::Review).await;

        for bad in [-1, 11, 100] {
            let err = h
                .workflow
                .append_review(&h.member, paper.id, Some(bad), Some("out of range"))
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::Validation(_)));
        }
        for good in [0, 10] {
            h.workflow
                .append_review(&h.member, paper.id, Some(good), Some("boundary"))
                .await
                .expect("boundary score");
        }
        // a comment alone is a legal review record
        h.workflow
            .append_review(&h.member, paper.id, None, Some("prose only"))
            .await
            .expect("comment-only review");
        // an empty record is not
        let err = h
            .workflow
            .append_review(&h.member, paper.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let reviews = Paper::reviews(&h.db.pool, paper.id).await.expect("reviews");
        assert_eq!(reviews.len(), 3);
    }

    #[tokio::test]
    async fn finalization_settles_every_disposition() {
        let h = setup().await;
        let conf = seed_conference(&h, "ENDGAME").await;

        let cases = [
            ("p-created", PaperState::Created, PaperState::Created),
            ("p-submitted", PaperState::Submitted, PaperState::Submitted),
            ("p-reviewed", PaperState::Reviewed, PaperState::Reviewed),
            ("p-rejected", PaperState::Rejected, PaperState::Rejected),
            ("p-approved", PaperState::Approved, PaperState::Rejected),
            ("p-accepted", PaperState::Accepted, PaperState::Accepted),
            (
                "p-final",
                PaperState::FinalSubmitted,
                PaperState::Accepted,
            ),
        ];

        let mut ids = Vec::new();
        for (title, start, _) in &cases {
            let paper = seed_paper(&h, conf.id, title).await;
            Paper::set_state(&h.db.pool, paper.id, *start, paper.version)
                .await
                .expect("stage state");
            ids.push(paper.id);
        }

        advance_to(&h, conf.id, ConferenceState::Final).await;

        for (id, (title, _, expected)) in ids.iter().zip(&cases) {
            let paper = Paper::find_by_id(&h.db.pool, *id)
                .await
                .expect("load")
                .expect("exists");
            assert_eq!(paper.state, *expected, "disposition for {}", title);
        }
    }

    #[tokio::test]
    async fn full_acceptance_path() {
        let h = setup().await;
        let conf = seed_conference(&h, "HAPPY").await;
        advance_to(&h, conf.id, ConferenceState::Submission).await;

        let paper = seed_paper(&h, conf.id, "Happy Path").await;
        h.workflow
            .submit_paper(&h.author, paper.id, b"draft".to_vec(), ContentType::Pdf)
            .await
            .expect("submit");

        advance_to(&h, conf.id, ConferenceState::Assignment).await;
        h.workflow
            .assign_reviewer(&h.chair, paper.id, "rev1")
            .await
            .expect("assign");

        advance_to(&h, conf.id, ConferenceState::Review).await;
        h.workflow
            .append_review(&h.member, paper.id, Some(8), Some("solid work"))
            .await
            .expect("review");

        advance_to(&h, conf.id, ConferenceState::Decision).await;
        let approved = h
            .workflow
            .approve_paper(&h.chair, paper.id)
            .await
            .expect("approve");
        assert_eq!(approved.state, PaperState::Approved);

        advance_to(&h, conf.id, ConferenceState::FinalSubmission).await;
        let camera_ready = h
            .workflow
            .final_submit_paper(
                &h.author,
                paper.id,
                b"camera ready".to_vec(),
                ContentType::Pdf,
                "Addressed all reviewer concerns",
            )
            .await
            .expect("final submit");
        assert_eq!(camera_ready.state, PaperState::FinalSubmitted);

        advance_to(&h, conf.id, ConferenceState::Final).await;
        let done = Paper::find_by_id(&h.db.pool, paper.id)
            .await
            .expect("load")
            .expect("exists");
        assert_eq!(done.state, PaperState::Accepted);
    }

    #[tokio::test]
    async fn approved_without_final_submission_is_rejected_at_close() {
        let h = setup().await;
        let conf = seed_conference(&h, "SAD").await;
        advance_to(&h, conf.id, ConferenceState::Submission).await;

        let paper = seed_paper(&h, conf.id, "No Camera Ready").await;
        h.workflow
            .submit_paper(&h.author, paper.id, b"draft".to_vec(), ContentType::Pdf)
            .await
            .expect("submit");

        advance_to(&h, conf.id, ConferenceState::Decision).await;
        h.workflow
            .approve_paper(&h.chair, paper.id)
            .await
            .expect("approve");

        advance_to(&h, conf.id, ConferenceState::Final).await;
        let done = Paper::find_by_id(&h.db.pool, paper.id)
            .await
            .expect("load")
            .expect("exists");
        assert_eq!(done.state, PaperState::Rejected);
    }

    #[tokio::test]
    async fn final_submit_requires_approved_paper() {
        let h = setup().await;
        let conf = seed_conference(&h, "NOAPPR").await;
        advance_to(&h, conf.id, ConferenceState::Submission).await;
        let paper = seed_paper(&h, conf.id, "Unapproved").await;
        h.workflow
            .submit_paper(&h.author, paper.id, b"draft".to_vec(), ContentType::Pdf)
            .await
            .expect("submit");
        advance_to(&h, conf.id, ConferenceState::FinalSubmission).await;

        let err = h
            .workflow
            .final_submit_paper(
                &h.author,
                paper.id,
                b"camera ready".to_vec(),
                ContentType::Pdf,
                "notes",
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::IllegalPaperState {
                action: "final-submit",
                state: PaperState::Submitted,
            }
        ));
    }

    #[tokio::test]
    async fn deletion_only_before_submission_opens() {
        let h = setup().await;
        let conf = seed_conference(&h, "DELME").await;
        h.workflow
            .transition_conference(&h.chair, conf.id, ConferenceState::Submission)
            .await
            .expect("open submissions");

        let err = h
            .workflow
            .delete_conference(&h.chair, conf.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Conference(ConferenceError::NotDeletable(
                ConferenceState::Submission
            ))
        ));

        let fresh = seed_conference(&h, "DELME2").await;
        h.workflow
            .delete_conference(&h.chair, fresh.id)
            .await
            .expect("delete in CREATED");
        assert!(Conference::find_by_id(&h.db.pool, fresh.id)
            .await
            .expect("query")
            .is_none());
    }

    #[tokio::test]
    async fn role_checks_gate_every_mutation() {
        let h = setup().await;
        let conf = seed_conference(&h, "GUARD").await;
        advance_to(&h, conf.id, ConferenceState::Submission).await;
        let paper = seed_paper(&h, conf.id, "Guarded").await;

        // an author cannot drive the conference
        let err = h
            .workflow
            .transition_conference(&h.author, conf.id, ConferenceState::Assignment)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Policy(_)));

        // a chair cannot submit on the author's behalf
        let err = h
            .workflow
            .submit_paper(&h.chair, paper.id, b"pdf".to_vec(), ContentType::Pdf)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Policy(_)));

        // a PC member cannot decide
        let err = h.workflow.approve_paper(&h.member, paper.id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Policy(_)));
    }

    #[tokio::test]
    async fn conference_requires_properly_credentialed_chairs() {
        let h = setup().await;

        let err = h
            .workflow
            .create_conference(
                &h.chair,
                CreateConference {
                    name: "NOCHAIR".to_string(),
                    description: "desc".to_string(),
                    chair_ids: vec![],
                    member_ids: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        // the author lacks the PC_CHAIR role
        let err = h
            .workflow
            .create_conference(
                &h.chair,
                CreateConference {
                    name: "WRONGROLE".to_string(),
                    description: "desc".to_string(),
                    chair_ids: vec![h.author.user_id],
                    member_ids: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn accept_requires_final_phase() {
        let h = setup().await;
        let conf = seed_conference(&h, "EARLYACC").await;
        advance_to(&h, conf.id, ConferenceState::Submission).await;
        let paper = seed_paper(&h, conf.id, "Too Soon").await;

        let err = h
            .workflow
            .accept_paper(&h.chair, paper.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::PhaseMismatch {
                required: ConferenceState::Final,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn withdrawal_removes_the_paper() {
        let h = setup().await;
        let conf = seed_conference(&h, "GONE").await;
        let paper = seed_paper(&h, conf.id, "Withdrawn").await;

        h.workflow
            .withdraw_paper(&h.author, paper.id)
            .await
            .expect("withdraw");
        assert!(Paper::find_by_id(&h.db.pool, paper.id)
            .await
            .expect("query")
            .is_none());
    }

    #[tokio::test]
    async fn paper_content_requires_a_content_type() {
        let h = setup().await;
        let conf = seed_conference(&h, "HALFUP").await;

        let make = |content: Option<Vec<u8>>, content_type: Option<ContentType>| CreatePaper {
            conference_id: conf.id,
            title: "Half Uploaded".to_string(),
            abstract_text: "An abstract".to_string(),
            content,
            content_type,
            authors: vec![],
            co_authors: vec![],
        };

        let err = h
            .workflow
            .create_paper(&h.author, make(Some(b"pdf bytes".to_vec()), None))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let err = h
            .workflow
            .create_paper(&h.author, make(None, Some(ContentType::Pdf)))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        // both together is fine
        h.workflow
            .create_paper(&h.author, make(Some(b"pdf bytes".to_vec()), Some(ContentType::Pdf)))
            .await
            .expect("create with content");
    }

    #[tokio::test]
    async fn co_author_addition_checks_identity_and_duplicates() {
        let h = setup().await;
        let conf = seed_conference(&h, "COAUTH").await;
        let paper = seed_paper(&h, conf.id, "Joint Work").await;
        let bob = seed_user(&h.db, "bob", &[Role::Author]).await;
        let eve = seed_user(&h.db, "eve", &[Role::Author]).await;

        // unregistered names are rejected
        let err = h
            .workflow
            .add_co_author(&h.author, paper.id, "nobody")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        // only someone already on the paper may add names
        let err = h
            .workflow
            .add_co_author(&eve, paper.id, "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotPaperAuthor));

        let paper = h
            .workflow
            .add_co_author(&h.author, paper.id, "bob")
            .await
            .expect("add co-author");
        assert_eq!(paper.co_authors_parsed(), vec!["bob".to_string()]);

        // already listed, whether as author or co-author
        let err = h
            .workflow
            .add_co_author(&h.author, paper.id, "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        let err = h
            .workflow
            .add_co_author(&bob, paper.id, "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        // a co-author may manage the paper in turn
        let paper = h
            .workflow
            .add_co_author(&bob, paper.id, "eve")
            .await
            .expect("co-author adds another");
        assert_eq!(
            paper.co_authors_parsed(),
            vec!["bob".to_string(), "eve".to_string()]
        );
        let mine = Paper::find_by_author(&h.db.pool, "eve").await.expect("query");
        assert_eq!(mine.len(), 1);
    }
}
