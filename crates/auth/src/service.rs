//! Facade exposed to the transport layer: `login`, `authenticate`, `authorize`.

use std::sync::Arc;

use chrono::Duration;

use classifieds_core::UserId;

use crate::{
    policy, Action, Actor, AuthError, Clock, CredentialHasher, Decision, HashingParams,
    IdentityResolver, Token, TokenService, UserDirectory,
};

/// Process-wide auth configuration, loaded once at startup.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: Vec<u8>,
    pub token_ttl: Duration,
    pub hashing: HashingParams,
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("hashing", &self.hashing)
            .finish()
    }
}

pub struct AuthService<D> {
    hasher: CredentialHasher,
    tokens: TokenService,
    resolver: IdentityResolver<D>,
    token_ttl: Duration,
    // Verified against when the username is unknown, so both paths cost one hash.
    dummy_verifier: String,
}

impl<D> AuthService<D>
where
    D: UserDirectory,
{
    pub fn new(config: AuthConfig, clock: Arc<dyn Clock>, directory: D) -> Result<Self, AuthError> {
        let hasher = CredentialHasher::new(config.hashing)?;
        let dummy_verifier = hasher.hash(&uuid::Uuid::new_v4().to_string())?;

        Ok(Self {
            hasher,
            tokens: TokenService::new(&config.secret, clock),
            resolver: IdentityResolver::new(directory),
            token_ttl: config.token_ttl,
            dummy_verifier,
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub fn directory(&self) -> &D {
        self.resolver.directory()
    }

    /// Hash a plaintext password for storage.
    pub fn hash_password(&self, plaintext: &str) -> Result<String, AuthError> {
        Ok(self.hasher.hash(plaintext)?)
    }

    /// Exchange credentials for a token with the configured TTL.
    ///
    /// Unknown usernames, wrong passwords and inactive users are all
    /// `InvalidCredentials`.
    pub async fn login(&self, username: &str, password: &str) -> Result<Token, AuthError> {
        let Some(user) = self.directory().find_by_username(username).await? else {
            let _ = self.hasher.verify(password, &self.dummy_verifier);
            tracing::info!(username, "login rejected: unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_verifier) {
            tracing::info!(subject_id = %user.subject_id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.active {
            tracing::info!(subject_id = %user.subject_id, "login rejected: inactive user");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user.subject_id, self.token_ttl)?;
        tracing::info!(
            subject_id = %user.subject_id,
            expires_at = %token.expires_at,
            "token issued"
        );
        Ok(token)
    }

    /// Verify a bearer credential and resolve it to a live actor.
    pub async fn authenticate(&self, bearer: &str) -> Result<Actor, AuthError> {
        let bearer = bearer.trim();
        if bearer.is_empty() {
            return Err(AuthError::Unauthenticated);
        }

        let claims = self.tokens.verify(bearer)?;
        self.resolver.resolve(&claims).await
    }

    pub fn authorize(&self, actor: &Actor, action: Action, owner: Option<&UserId>) -> Decision {
        policy::decide(actor, action, owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::{user, MapDirectory};
    use crate::{ManualClock, Role, TokenError};

    fn config() -> AuthConfig {
        AuthConfig {
            secret: b"service-test-secret".to_vec(),
            token_ttl: Duration::hours(48),
            hashing: HashingParams {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
        }
    }

    fn setup() -> (AuthService<Arc<MapDirectory>>, Arc<MapDirectory>, Arc<ManualClock>) {
        let dir = Arc::new(MapDirectory::default());
        let clock = Arc::new(ManualClock::default());
        let svc = AuthService::new(config(), clock.clone(), dir.clone()).unwrap();
        (svc, dir, clock)
    }

    fn register(svc: &AuthService<Arc<MapDirectory>>, dir: &MapDirectory, name: &str, role: Role) -> UserId {
        let mut u = user(role, true);
        u.username = name.to_string();
        u.password_verifier = svc.hash_password("s3cret-pass").unwrap();
        let id = u.subject_id;
        dir.insert(u);
        id
    }

    #[tokio::test]
    async fn login_then_authenticate() {
        let (svc, dir, _) = setup();
        let id = register(&svc, &dir, "alice", Role::User);

        let token = svc.login("alice", "s3cret-pass").await.unwrap();
        assert_eq!(token.subject_id, id);
        assert_eq!(token.expires_at - token.issued_at, Duration::hours(48));

        let actor = svc.authenticate(&token.value).await.unwrap();
        assert_eq!(actor.subject_id(), &id);
        assert_eq!(actor.role(), Role::User);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (svc, dir, _) = setup();
        register(&svc, &dir, "alice", Role::User);

        let mut inactive = user(Role::User, false);
        inactive.username = "bob".to_string();
        inactive.password_verifier = svc.hash_password("s3cret-pass").unwrap();
        dir.insert(inactive);

        assert_eq!(
            svc.login("alice", "wrong").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            svc.login("nobody", "s3cret-pass").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            svc.login("bob", "s3cret-pass").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn expired_token_fails_authentication() {
        let (svc, dir, clock) = setup();
        register(&svc, &dir, "alice", Role::User);
        let token = svc.login("alice", "s3cret-pass").await.unwrap();

        clock.advance(Duration::hours(48));
        assert_eq!(
            svc.authenticate(&token.value).await,
            Err(AuthError::Token(TokenError::Expired))
        );
    }

    #[tokio::test]
    async fn deactivation_is_seen_on_next_request() {
        let (svc, dir, _) = setup();
        let id = register(&svc, &dir, "alice", Role::User);
        let token = svc.login("alice", "s3cret-pass").await.unwrap();

        dir.users.write().unwrap().get_mut(&id).unwrap().active = false;
        assert_eq!(svc.authenticate(&token.value).await, Err(AuthError::Inactive));
    }

    #[tokio::test]
    async fn empty_bearer_is_unauthenticated() {
        let (svc, _, _) = setup();
        assert_eq!(svc.authenticate("  ").await, Err(AuthError::Unauthenticated));
        assert_eq!(
            svc.authenticate("garbage").await,
            Err(AuthError::Token(TokenError::Malformed))
        );
    }

    #[tokio::test]
    async fn ownership_decisions_end_to_end() {
        let (svc, dir, _) = setup();
        let alice = register(&svc, &dir, "alice", Role::User);
        let bob = register(&svc, &dir, "bob", Role::User);
        register(&svc, &dir, "root", Role::Admin);

        let token = svc.login("alice", "s3cret-pass").await.unwrap();
        let actor = svc.authenticate(&token.value).await.unwrap();
        assert_eq!(svc.authorize(&actor, Action::Delete, Some(&bob)), Decision::Deny);
        assert_eq!(svc.authorize(&actor, Action::Delete, Some(&alice)), Decision::Allow);

        let token = svc.login("root", "s3cret-pass").await.unwrap();
        let admin = svc.authenticate(&token.value).await.unwrap();
        assert_eq!(svc.authorize(&admin, Action::Delete, Some(&bob)), Decision::Allow);
    }

    #[test]
    fn config_debug_redacts_secret() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("service-test-secret"));
    }
}
