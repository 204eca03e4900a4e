use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use classifieds_auth::AuthError;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::CallerContext;

#[derive(Clone)]
pub struct AuthState {
    pub services: Arc<AppServices>,
}

/// Resolve the bearer credential (if any) into a [`CallerContext`].
///
/// No `Authorization` header means an anonymous caller; whether that is enough
/// is decided per route by the policy. A header that is present but unusable is
/// rejected here.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    // Owned so no borrow of the request is held across the directory lookup.
    let bearer = match extract_bearer(req.headers()) {
        Ok(token) => token.map(str::to_owned),
        Err(e) => return ApiError::from(e).into_response(),
    };

    let caller = match resolve_caller(&state.services, bearer.as_deref()).await {
        Ok(caller) => caller,
        Err(e) => return e.into_response(),
    };

    req.extensions_mut().insert(caller);
    next.run(req).await
}

/// Turn an optional bearer token into a caller.
pub(crate) async fn resolve_caller(
    services: &AppServices,
    bearer: Option<&str>,
) -> Result<CallerContext, ApiError> {
    match bearer {
        None => Ok(CallerContext::anonymous()),
        Some(token) => Ok(CallerContext::authenticated(
            services.auth.authenticate(token).await?,
        )),
    }
}

pub(crate) fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| AuthError::Unauthenticated)?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(AuthError::Unauthenticated)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Unauthenticated);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Unauthenticated);
    }

    Ok(Some(token))
}

#[cfg(test)]
mod tests {
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn no_header_is_anonymous() {
        assert_eq!(extract_bearer(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(extract_bearer(&headers("Bearer abc")), Ok(Some("abc")));
        assert_eq!(extract_bearer(&headers("bearer abc ")), Ok(Some("abc")));
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_rejected() {
        assert_eq!(
            extract_bearer(&headers("Basic dXNlcjpwYXNz")),
            Err(AuthError::Unauthenticated)
        );
        assert_eq!(extract_bearer(&headers("Bearer ")), Err(AuthError::Unauthenticated));
        assert_eq!(extract_bearer(&headers("Bearer")), Err(AuthError::Unauthenticated));
    }
}
