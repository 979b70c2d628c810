//! Request-scoped authentication.
//!
//! The storefront holds a JWT; every request that touches orders extracts an
//! [`AuthUser`] from the `Authorization` header. The user id flows into the
//! services explicitly. There is no ambient session state in the core.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;

const ADMIN_ROLE: &str = "admin";

/// Claim structure for storefront JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    /// Admin-gated endpoints call this before touching any record.
    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "administrator role required".to_string(),
            ))
        }
    }
}

/// Validates storefront tokens; shared through request extensions.
#[derive(Clone)]
pub struct AuthVerifier {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
}

impl AuthVerifier {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[cfg.auth_audience.clone()]);
        validation.set_issuer(&[cfg.auth_issuer.clone()]);
        Self {
            decoding_key: DecodingKey::from_secret(cfg.jwt_secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
            validation,
            issuer: cfg.auth_issuer.clone(),
            audience: cfg.auth_audience.clone(),
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| ServiceError::AuthError(format!("invalid token: {}", e)))?;
        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| ServiceError::AuthError("invalid subject claim".to_string()))?;
        Ok(AuthUser {
            user_id,
            email: data.claims.email,
            roles: data.claims.roles,
        })
    }

    /// Issue a token for `user_id`. The login flow lives outside this core;
    /// this is used by operational tooling and the test harness.
    pub fn issue_token(
        &self,
        user_id: Uuid,
        roles: &[&str],
        ttl_secs: i64,
    ) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            email: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            iat: now,
            exp: now + ttl_secs,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("token encoding: {}", e)))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let verifier = parts
            .extensions
            .get::<Arc<AuthVerifier>>()
            .cloned()
            .ok_or_else(|| {
                ServiceError::InternalError("auth verifier not configured".to_string())
            })?;

        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized("missing authorization header".to_string())
            })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ServiceError::Unauthorized("authorization header must be a bearer token".to_string())
        })?;

        verifier.verify(token.trim())
    }
}
