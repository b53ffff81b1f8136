use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user;
use crate::errors::ServiceError;
use crate::AppState;

/// JWT payload. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: i64,
}

/// Authenticated caller, extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == user::ROLE_ADMIN
    }

    pub fn is_staff(&self) -> bool {
        self.role == user::ROLE_STAFF || self.role == user::ROLE_ADMIN
    }
}

pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    email: &str,
    role: &str,
    expiration_secs: i64,
) -> Result<String, ServiceError> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        exp: chrono::Utc::now().timestamp() + expiration_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {}", e)))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, ServiceError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ServiceError::Unauthorized("Invalid or expired token".to_string()))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized("Missing authorization header".to_string())
            })?;

        let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
            ServiceError::Unauthorized("Authorization header must be a bearer token".to_string())
        })?;

        let claims = verify_token(&state.config.jwt_secret, token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Malformed token subject".to_string()))?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-test-secret-test-secret!";

    #[test]
    fn issued_token_round_trips() {
        let user_id = Uuid::new_v4();
        let token = issue_token(SECRET, user_id, "a@b.co", user::ROLE_CLIENT, 3600).unwrap();
        let claims = verify_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, user::ROLE_CLIENT);
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(SECRET, Uuid::new_v4(), "a@b.co", user::ROLE_CLIENT, -120).unwrap();
        assert!(verify_token(SECRET, &token).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(SECRET, Uuid::new_v4(), "a@b.co", user::ROLE_ADMIN, 3600).unwrap();
        assert!(verify_token("another-secret-another-secret-12", &token).is_err());
    }

    #[test]
    fn role_helpers() {
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            email: "x@y.z".into(),
            role: user::ROLE_ADMIN.into(),
        };
        assert!(admin.is_admin());
        assert!(admin.is_staff());

        let client = AuthUser {
            user_id: Uuid::new_v4(),
            email: "x@y.z".into(),
            role: user::ROLE_CLIENT.into(),
        };
        assert!(!client.is_admin());
        assert!(!client.is_staff());
    }
}
