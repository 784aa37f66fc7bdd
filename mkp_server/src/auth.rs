//! Access tokens
//!
//! Access tokens are HS256 JWTs signed with the server's `MKP_JWT_SECRET`. The claims carry the caller's user id, the
//! seller organization they act for (if any) and their roles. The [`crate::middleware::JwtMiddlewareFactory`] verifies
//! the token and stores the [`JwtClaims`] in the request extensions, where handlers pick them up as an extractor.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use mkp_engine::db_types::Role;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

const DEFAULT_TOKEN_LIFETIME: Duration = Duration::hours(24);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id. For customers this is the customer id that orders are placed under.
    pub sub: i64,
    /// The seller organization the user acts for
    #[serde(default)]
    pub org: Option<i64>,
    pub roles: Vec<Role>,
    /// Expiry, as a unix timestamp
    pub exp: i64,
}

impl JwtClaims {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_manager(&self) -> bool {
        self.has_role(Role::Manager)
    }

    /// The organization a seller acts for. Sellers without one cannot touch any seller resources.
    pub fn organization(&self) -> Result<i64, ServerError> {
        self.org.ok_or_else(|| {
            ServerError::InsufficientPermissions(format!("User {} is not associated with an organization", self.sub))
        })
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned();
        ready(claims.ok_or(ServerError::AuthenticationError(AuthError::MissingToken)))
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes()) }
    }

    /// Issue a new access token for the given user. The caller is responsible for having authenticated the user and
    /// for vetting the roles being granted.
    pub fn issue_token(
        &self,
        sub: i64,
        org: Option<i64>,
        roles: Vec<Role>,
        duration: Option<Duration>,
    ) -> Result<String, AuthError> {
        let exp = (Utc::now() + duration.unwrap_or(DEFAULT_TOKEN_LIFETIME)).timestamp();
        let claims = JwtClaims { sub, org, roles, exp };
        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AuthError::CouldNotIssueToken(e.to_string()))
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes()), validation: validation() }
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("💻️ Access token rejected. {e}");
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidToken |
                jsonwebtoken::errors::ErrorKind::Base64(_) |
                jsonwebtoken::errors::ErrorKind::Json(_) |
                jsonwebtoken::errors::ErrorKind::Utf8(_) => AuthError::PoorlyFormattedToken(e.to_string()),
                _ => AuthError::ValidationError(e.to_string()),
            }
        })?;
        Ok(data.claims)
    }
}
