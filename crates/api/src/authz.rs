//! API-side authorization guard.
//!
//! Every handler that touches a protected resource calls [`require`] with the
//! ownership fact it loaded; the decision itself lives in
//! `classifieds_auth::policy`.

use classifieds_auth::{enforce, Action};
use classifieds_core::UserId;

use crate::app::errors::ApiError;
use crate::context::CallerContext;

pub fn require(
    caller: &CallerContext,
    action: Action,
    owner: Option<&UserId>,
) -> Result<(), ApiError> {
    enforce(caller.actor(), action, owner).map_err(|e| {
        tracing::info!(
            subject_id = ?caller.actor().map(|a| *a.subject_id()),
            action = ?action,
            owner = ?owner,
            cause = e.kind(),
            "request denied by policy"
        );
        ApiError::from(e)
    })
}
