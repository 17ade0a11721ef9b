//! Role authorization: a single predicate over the principal's role set,
//! keyed by action type, evaluated before any state mutation.

use db::models::user::Role;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Action {action} requires one of the roles {required:?}")]
    Forbidden {
        action: Action,
        required: &'static [Role],
    },
}

/// The authenticated caller as seen by the workflow engine.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub roles: Vec<Role>,
}

/// Every state-mutating operation the engine exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateConference,
    TransitionConference,
    DeleteConference,
    ManageMembership,
    CreatePaper,
    SubmitPaper,
    ManageCoAuthors,
    AssignReviewer,
    RecordReview,
    DecidePaper,
    FinalSubmitPaper,
    AcceptPaper,
    WithdrawPaper,
}

impl Action {
    pub fn required_roles(self) -> &'static [Role] {
        match self {
            Action::CreateConference
            | Action::TransitionConference
            | Action::DeleteConference
            | Action::ManageMembership
            | Action::AssignReviewer
            | Action::DecidePaper
            | Action::AcceptPaper => &[Role::PcChair],
            Action::CreatePaper
            | Action::SubmitPaper
            | Action::ManageCoAuthors
            | Action::FinalSubmitPaper
            | Action::WithdrawPaper => &[Role::Author],
            Action::RecordReview => &[Role::PcMember],
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::CreateConference => "create-conference",
            Action::TransitionConference => "transition-conference",
            Action::DeleteConference => "delete-conference",
            Action::ManageMembership => "manage-membership",
            Action::CreatePaper => "create-paper",
            Action::SubmitPaper => "submit-paper",
            Action::ManageCoAuthors => "manage-co-authors",
            Action::AssignReviewer => "assign-reviewer",
            Action::RecordReview => "record-review",
            Action::DecidePaper => "decide-paper",
            Action::FinalSubmitPaper => "final-submit-paper",
            Action::AcceptPaper => "accept-paper",
            Action::WithdrawPaper => "withdraw-paper",
        };
        write!(f, "{}", name)
    }
}

/// Permit iff the principal holds at least one of the roles the action
/// requires.
pub fn authorize(principal: &Principal, action: Action) -> Result<(), PolicyError> {
    let required = action.required_roles();
    if principal.roles.iter().any(|role| required.contains(role)) {
        Ok(())
    } else {
        Err(PolicyError::Forbidden { action, required })
    }
}
