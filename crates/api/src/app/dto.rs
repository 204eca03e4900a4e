use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use classifieds_auth::{Role, Token};
use classifieds_core::{DomainError, DomainResult};
use classifieds_infra::{Advertisement, AdvertisementFilter, UserRecord};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub group: Option<Role>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> DomainResult<()> {
        require_non_blank("username", &self.username)?;
        validate_email(&self.email)?;
        require_non_blank("password", &self.password)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(username) = &self.username {
            require_non_blank("username", username)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            require_non_blank("password", password)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAdvertisementRequest {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
}

impl CreateAdvertisementRequest {
    pub fn validate(&self) -> DomainResult<()> {
        require_non_blank("title", &self.title)?;
        validate_price(self.price)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateAdvertisementRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

impl UpdateAdvertisementRequest {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(title) = &self.title {
            require_non_blank("title", title)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub description: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl From<SearchQuery> for AdvertisementFilter {
    fn from(value: SearchQuery) -> Self {
        AdvertisementFilter {
            title: value.title,
            description: value.description,
            min_price: value.min_price,
            max_price: value.max_price,
        }
    }
}

fn require_non_blank(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_email(email: &str) -> DomainResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(DomainError::validation("email must look like name@domain")),
    }
}

fn validate_price(price: f64) -> DomainResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::validation("price must be a non-negative number"));
    }
    Ok(())
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

impl From<Token> for TokenResponse {
    fn from(value: Token) -> Self {
        Self {
            access_token: value.value,
            token_type: "bearer",
        }
    }
}

/// Public view of a user; the password verifier never leaves the store.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub group: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserResponse {
    fn from(value: UserRecord) -> Self {
        Self {
            id: value.id.to_string(),
            username: value.username,
            email: value.email,
            group: value.role,
            is_active: value.active,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdvertisementResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<Advertisement> for AdvertisementResponse {
    fn from(value: Advertisement) -> Self {
        Self {
            id: value.id.to_string(),
            title: value.title,
            description: value.description,
            price: value.price,
            author_id: value.author_id.to_string(),
            created_at: value.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_rejects_blank_fields() {
        let req = CreateUserRequest {
            username: "  ".to_string(),
            email: "a@b.c".to_string(),
            password: "pw".to_string(),
            group: None,
        };
        assert!(req.validate().is_err());

        let req = CreateUserRequest {
            username: "alice".to_string(),
            email: "not-an-email".to_string(),
            password: "pw".to_string(),
            group: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn advertisement_price_must_be_non_negative() {
        let req = CreateAdvertisementRequest {
            title: "bike".to_string(),
            description: None,
            price: -1.0,
        };
        assert!(req.validate().is_err());

        let req = UpdateAdvertisementRequest {
            title: None,
            description: None,
            price: Some(f64::NAN),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn group_defaults_to_none_and_parses_lowercase() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"username":"a","email":"a@b.c","password":"pw"}"#,
        )
        .unwrap();
        assert_eq!(req.group, None);

        let req: CreateUserRequest = serde_json::from_str(
            r#"{"username":"a","email":"a@b.c","password":"pw","group":"admin"}"#,
        )
        .unwrap();
        assert_eq!(req.group, Some(Role::Admin));
    }
}
