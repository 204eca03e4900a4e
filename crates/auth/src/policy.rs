//! Authorization policy.
//!
//! A single decision table over `(role, action, is_owner)`:
//!
//! | role  | action          | is_owner | decision |
//! |-------|-----------------|----------|----------|
//! | admin | any             | any      | allow    |
//! | user  | read / create   | any      | allow    |
//! | user  | update / delete | true     | allow    |
//! | user  | update / delete | false    | deny     |
//! | user  | elevate         | any      | deny     |
//!
//! - No IO
//! - No panics
//! - No state

use serde::Serialize;

use classifieds_core::UserId;

use crate::{Actor, AuthError, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    /// Grant the admin role (e.g. register an admin account).
    Elevate,
}

impl Action {
    /// Whether the action may be performed without any credentials.
    pub fn is_public(&self) -> bool {
        matches!(self, Action::Read)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decide whether `actor` may perform `action` on a resource owned by `owner`.
///
/// `owner` is the ownership fact from storage; `None` means there is none (e.g.
/// the resource is being created). Ownership is exact identifier equality.
pub fn decide(actor: &Actor, action: Action, owner: Option<&UserId>) -> Decision {
    explain(actor, action, owner).decision
}

/// Enforce the policy for a possibly-unauthenticated caller.
///
/// Public actions pass without an actor; anything else without an actor is
/// `Unauthenticated`. A deny for an authenticated actor is `Forbidden`.
pub fn enforce(actor: Option<&Actor>, action: Action, owner: Option<&UserId>) -> Result<(), AuthError> {
    let Some(actor) = actor else {
        return if action.is_public() {
            Ok(())
        } else {
            Err(AuthError::Unauthenticated)
        };
    };

    let explanation = explain(actor, action, owner);
    tracing::debug!(
        subject_id = %actor.subject_id(),
        role = %actor.role(),
        action = ?action,
        decision = ?explanation.decision,
        reason = explanation.reason,
        "authorization decision"
    );

    match explanation.decision {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(AuthError::Forbidden),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Why a decision was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionExplanation {
    pub action: Action,
    pub role: Role,
    pub is_owner: bool,
    pub decision: Decision,
    pub reason: &'static str,
}

/// Evaluate the decision table and record which row matched.
pub fn explain(actor: &Actor, action: Action, owner: Option<&UserId>) -> DecisionExplanation {
    let is_owner = owner == Some(actor.subject_id());

    let (decision, reason) = match (actor.role(), action) {
        (Role::Admin, _) => (Decision::Allow, "admin may perform any action"),
        (Role::User, Action::Read) => (Decision::Allow, "reads are open to any caller"),
        (Role::User, Action::Create) => (
            Decision::Allow,
            "any authenticated user may create; ownership goes to the creator",
        ),
        (Role::User, Action::Update | Action::Delete) if is_owner => {
            (Decision::Allow, "owner may modify their own resource")
        }
        (Role::User, Action::Update | Action::Delete) => {
            (Decision::Deny, "only the owner or an admin may modify this resource")
        }
        (Role::User, Action::Elevate) => (Decision::Deny, "only an admin may grant the admin role"),
    };

    DecisionExplanation {
        action,
        role: actor.role(),
        is_owner,
        decision,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor::new(UserId::new(), role)
    }

    #[test]
    fn admin_is_always_allowed() {
        let admin = actor(Role::Admin);
        let someone = UserId::new();

        for action in [
            Action::Read,
            Action::Create,
            Action::Update,
            Action::Delete,
            Action::Elevate,
        ] {
            assert_eq!(decide(&admin, action, Some(&someone)), Decision::Allow);
            assert_eq!(decide(&admin, action, None), Decision::Allow);
        }
    }

    #[test]
    fn user_may_read_and_create_anything() {
        let user = actor(Role::User);
        let other = UserId::new();

        assert_eq!(decide(&user, Action::Read, Some(&other)), Decision::Allow);
        assert_eq!(decide(&user, Action::Create, None), Decision::Allow);
    }

    #[test]
    fn user_modifies_only_own_resources() {
        let user = actor(Role::User);
        let own = *user.subject_id();
        let other = UserId::new();

        assert_eq!(decide(&user, Action::Delete, Some(&own)), Decision::Allow);
        assert_eq!(decide(&user, Action::Update, Some(&own)), Decision::Allow);
        assert_eq!(decide(&user, Action::Delete, Some(&other)), Decision::Deny);
        assert_eq!(decide(&user, Action::Update, Some(&other)), Decision::Deny);
    }

    #[test]
    fn user_may_not_elevate_even_themselves() {
        let user = actor(Role::User);
        assert_eq!(decide(&user, Action::Elevate, Some(user.subject_id())), Decision::Deny);
        assert_eq!(enforce(None, Action::Elevate, None), Err(AuthError::Unauthenticated));
    }

    #[test]
    fn user_without_ownership_fact_is_denied_modification() {
        let user = actor(Role::User);
        assert_eq!(decide(&user, Action::Delete, None), Decision::Deny);
    }

    #[test]
    fn enforce_distinguishes_unauthenticated_from_forbidden() {
        let user = actor(Role::User);
        let other = UserId::new();

        assert_eq!(enforce(None, Action::Read, Some(&other)), Ok(()));
        assert_eq!(
            enforce(None, Action::Create, None),
            Err(AuthError::Unauthenticated)
        );
        assert_eq!(
            enforce(None, Action::Delete, Some(&other)),
            Err(AuthError::Unauthenticated)
        );
        assert_eq!(
            enforce(Some(&user), Action::Delete, Some(&other)),
            Err(AuthError::Forbidden)
        );
        assert_eq!(
            enforce(Some(&user), Action::Delete, Some(user.subject_id())),
            Ok(())
        );
    }

    #[test]
    fn explanation_records_matched_row() {
        let user = actor(Role::User);
        let other = UserId::new();

        let e = explain(&user, Action::Update, Some(&other));
        assert_eq!(e.decision, Decision::Deny);
        assert!(!e.is_owner);
        assert_eq!(e.role, Role::User);

        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["decision"], "deny");
        assert_eq!(json["action"], "update");
    }
}
