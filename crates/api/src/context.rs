use classifieds_auth::Actor;

/// Caller identity for a request.
///
/// Present on every routed request. `actor` is `None` when no credential was
/// supplied; a supplied but invalid credential never reaches a handler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallerContext {
    actor: Option<Actor>,
}

impl CallerContext {
    pub fn anonymous() -> Self {
        Self { actor: None }
    }

    pub fn authenticated(actor: Actor) -> Self {
        Self { actor: Some(actor) }
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }
}
