//! Approval state machine for employee requests.
//!
//! `pending_approval` (chief) -> `pending_authorization` (manager) -> `approved`,
//! with `rejected` reachable from either pending stage. Managers may reject at
//! both stages; chiefs only at the first.

use thiserror::Error;

use crate::error::AppError;
use crate::model::request::RequestStatus;
use crate::model::role::Role;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Action {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum TransitionError {
    #[error("Request is {0} and can no longer be processed")]
    InvalidState(RequestStatus),

    #[error("Role {role} cannot act on a request that is {status}")]
    Forbidden { role: Role, status: RequestStatus },
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidState(_) => AppError::InvalidState(err.to_string()),
            TransitionError::Forbidden { .. } => AppError::Forbidden(err.to_string()),
        }
    }
}

/// Role whose approval the request is waiting for.
pub fn required_approver(status: RequestStatus) -> Option<Role> {
    match status {
        RequestStatus::PendingApproval => Some(Role::Chief),
        RequestStatus::PendingAuthorization => Some(Role::Manager),
        RequestStatus::PendingAdmin | RequestStatus::Approved | RequestStatus::Rejected => None,
    }
}

/// Status a successful `action` by `role` moves the request to.
///
/// Terminal states and `pending_admin` are checked before the role gate, so a
/// repeated call on a finished request reports `InvalidState` to every caller.
pub fn next_status(
    current: RequestStatus,
    role: Role,
    action: Action,
) -> Result<RequestStatus, TransitionError> {
    let Some(approver) = required_approver(current) else {
        return Err(TransitionError::InvalidState(current));
    };

    match action {
        Action::Approve if role == approver => Ok(match current {
            RequestStatus::PendingApproval => RequestStatus::PendingAuthorization,
            _ => RequestStatus::Approved,
        }),
        Action::Reject if role == approver || role == Role::Manager => Ok(RequestStatus::Rejected),
        _ => Err(TransitionError::Forbidden { role, status: current }),
    }
}
