//! Error taxonomy of the auth core.
//!
//! Every component reports the most specific cause it detected. Collapsing
//! causes into a generic "unauthorized" is the transport layer's job.

use thiserror::Error;

/// Token verification/issuance failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token issuance failed: {0}")]
    Issue(String),
}

/// Password hashing failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token carries no subject")]
    MissingSubject,

    #[error("token subject is not a valid user identifier")]
    MalformedSubject,

    #[error("token subject does not exist")]
    UnknownSubject,

    #[error("user is inactive")]
    Inactive,

    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("user directory failure: {0}")]
    Directory(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl AuthError {
    /// Authenticated, but the policy said no.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, AuthError::Forbidden)
    }

    /// Failures caused by the service itself rather than by the caller.
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            AuthError::Directory(_)
                | AuthError::Credential(_)
                | AuthError::Token(TokenError::Issue(_))
        )
    }

    /// Stable short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingSubject => "missing_subject",
            AuthError::MalformedSubject => "malformed_subject",
            AuthError::UnknownSubject => "unknown_subject",
            AuthError::Inactive => "inactive",
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Forbidden => "forbidden",
            AuthError::Token(TokenError::Malformed) => "token_malformed",
            AuthError::Token(TokenError::BadSignature) => "token_bad_signature",
            AuthError::Token(TokenError::Expired) => "token_expired",
            AuthError::Token(TokenError::Issue(_)) => "token_issue",
            AuthError::Directory(_) => "directory",
            AuthError::Credential(_) => "credential",
        }
    }
}
