//! `classifieds-auth`: authentication and authorization core.
//!
//! This crate is intentionally decoupled from HTTP and storage. Persistence is
//! reached only through [`UserDirectory`]; time only through [`Clock`].

pub mod actor;
pub mod clock;
pub mod error;
pub mod password;
pub mod policy;
pub mod resolver;
pub mod service;
pub mod token;

pub use actor::{Actor, Role};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, CredentialError, TokenError};
pub use password::{CredentialHasher, HashingParams};
pub use policy::{Action, Decision, DecisionExplanation, decide, enforce, explain};
pub use resolver::{DirectoryError, DirectoryUser, IdentityResolver, UserDirectory};
pub use service::{AuthConfig, AuthService};
pub use token::{Claims, Token, TokenService, validate_claims};
