// Lyceum
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Bearer token verification
//!
//! Tokens are issued by the account service; this crate only verifies them
//! and turns the claims into an actor and a scope.

use crate::error::{ApiError, ApiResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use lyceum_authz::{ActorId, Scope};
use serde::{Deserialize, Serialize};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (actor ID)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Institute the session is working in; absent for platform sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institute_id: Option<String>,
}

impl Claims {
    pub fn new(actor_id: &str, institute_id: Option<&str>, issuer: &str, audience: &str, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: actor_id.to_string(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            institute_id: institute_id.map(str::to_string),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    pub fn actor_id(&self) -> ActorId {
        ActorId::new(self.sub.clone())
    }

    /// Session scope; a blank `institute_id` is an invalid session, not a platform one
    pub fn scope(&self) -> ApiResult<Scope> {
        Scope::try_from(self.institute_id.clone()).map_err(|e| ApiError::Unauthorized {
            message: format!("Token scope is invalid: {}", e),
        })
    }
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
}

impl JwtManager {
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
            issuer: issuer.to_string(),
            audience: audience.to_string(),
        }
    }

    /// Mint a token for `actor_id`, used by tests and local tooling
    pub fn issue(&self, actor_id: &str, institute_id: Option<&str>, expires_in: Duration) -> ApiResult<String> {
        self.create_token(&Claims::new(actor_id, institute_id, &self.issuer, &self.audience, expires_in))
    }

    pub fn create_token(&self, claims: &Claims) -> ApiResult<String> {
        let header = Header::new(Algorithm::HS256);
        Ok(encode(&header, claims, &self.encoding_key)?)
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        let claims = token_data.claims;

        if claims.is_expired() {
            return Err(ApiError::Unauthorized {
                message: "Token has expired".to_string(),
            });
        }

        if claims.sub.trim().is_empty() {
            return Err(ApiError::Unauthorized {
                message: "Token has no subject".to_string(),
            });
        }

        claims.scope()?;

        Ok(claims)
    }
}

/// Extract JWT token from Authorization header
pub fn extract_token_from_header(auth_header: &str) -> ApiResult<&str> {
    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(ApiError::Unauthorized {
            message: "Invalid authorization header format".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret", "lyceum-auth", "lyceum")
    }

    #[test]
    fn test_token_round_trip() {
        let jwt = manager();
        let token = jwt.issue("a1", Some("s1"), Duration::minutes(5)).unwrap();
        let claims = jwt.validate_token(&token).unwrap();

        assert_eq!(claims.actor_id(), ActorId::from("a1"));
        assert_eq!(claims.scope().unwrap(), Scope::institute("s1"));
    }

    #[test]
    fn test_platform_session_has_platform_scope() {
        let jwt = manager();
        let token = jwt.issue("root", None, Duration::minutes(5)).unwrap();
        assert_eq!(jwt.validate_token(&token).unwrap().scope().unwrap(), Scope::Platform);
    }

    #[test]
    fn test_blank_institute_is_unauthorized() {
        let jwt = manager();
        let claims = Claims::new("a1", Some("   "), "lyceum-auth", "lyceum", Duration::minutes(5));
        assert!(matches!(claims.scope(), Err(ApiError::Unauthorized { .. })));

        let token = jwt.issue("a1", Some("   "), Duration::minutes(5)).unwrap();
        assert!(matches!(jwt.validate_token(&token), Err(ApiError::Unauthorized { .. })));

        let token = jwt.issue("a1", Some(""), Duration::minutes(5)).unwrap();
        assert!(matches!(jwt.validate_token(&token), Err(ApiError::Unauthorized { .. })));
    }

    #[test]
    fn test_foreign_tokens_rejected() {
        let other = JwtManager::new("other-secret", "lyceum-auth", "lyceum");
        let token = other.issue("a1", None, Duration::minutes(5)).unwrap();
        assert!(manager().validate_token(&token).is_err());

        let wrong_audience = JwtManager::new("test-secret", "lyceum-auth", "elsewhere");
        let token = wrong_audience.issue("a1", None, Duration::minutes(5)).unwrap();
        assert!(manager().validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = manager();
        let token = jwt.issue("a1", None, Duration::minutes(-10)).unwrap();
        assert!(jwt.validate_token(&token).is_err());
    }

    #[test]
    fn test_header_extraction() {
        assert_eq!(extract_token_from_header("Bearer abc").unwrap(), "abc");
        assert!(extract_token_from_header("Basic abc").is_err());
        assert!(extract_token_from_header("Bearer ").is_err());
    }
}
