//! JWT token handling
//!
//! HS256 access tokens whose subject is the relay's `UserId`.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use relay_core::{AuthError, Authenticator, ConnectContext, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Optional role, carried through but not interpreted by the relay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Claims {
    /// Get the user ID from the subject claim
    ///
    /// # Errors
    /// Returns an error if the subject is blank or the reserved anonymous id
    pub fn user_id(&self) -> Result<UserId, AppError> {
        let user = UserId::new(self.sub.trim());
        // "anonymous" is reserved for unauthenticated connections
        if user.is_blank() || user.is_anonymous() {
            return Err(AppError::InvalidToken);
        }
        Ok(user)
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// JWT service for issuing and validating tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry: i64,
}

impl JwtService {
    /// Create a new JWT service
    ///
    /// # Arguments
    /// * `secret` - The secret key for signing tokens
    /// * `token_expiry` - Token lifetime in seconds
    pub fn new(secret: &str, token_expiry: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry,
        }
    }

    /// Issue a token for a user
    ///
    /// # Errors
    /// Returns an error if token encoding fails
    pub fn issue_token(&self, user_id: &UserId) -> Result<String, AppError> {
        self.issue_token_with_role(user_id, None)
    }

    /// Issue a token for a user with an optional role claim
    ///
    /// # Errors
    /// Returns an error if token encoding fails
    pub fn issue_token_with_role(
        &self,
        user_id: &UserId,
        role: Option<String>,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.token_expiry)).timestamp(),
            role,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to encode JWT")))
    }

    /// Decode and validate a token
    ///
    /// # Errors
    /// Returns an error if the token is invalid or expired
    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            }
        })?;

        Ok(token_data.claims)
    }

    /// Validate a token and return the identity it carries
    ///
    /// # Errors
    /// Returns an error if the token is invalid, expired, or has a blank subject
    pub fn validate(&self, token: &str) -> Result<UserId, AppError> {
        self.decode_token(token)?.user_id()
    }

    pub fn token_expiry(&self) -> i64 {
        self.token_expiry
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("token_expiry", &self.token_expiry)
            .finish_non_exhaustive()
    }
}

/// `Authenticator` backed by bearer JWTs
///
/// No token resolves to an anonymous connection; a token that fails
/// validation rejects the connection.
#[derive(Debug, Clone)]
pub struct JwtAuthenticator {
    jwt: Arc<JwtService>,
}

impl JwtAuthenticator {
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn resolve(&self, ctx: &ConnectContext) -> Result<Option<UserId>, AuthError> {
        let Some(token) = ctx.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        match self.jwt.validate(token) {
            Ok(user) => Ok(Some(user)),
            Err(AppError::TokenExpired) => Err(AuthError::TokenExpired),
            Err(e) => {
                tracing::debug!(error = %e, "Token rejected");
                Err(AuthError::InvalidToken)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-that-is-long-enough";

    fn create_test_service() -> JwtService {
        JwtService::new(SECRET, 1800)
    }

    fn encode_raw(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_decode() {
        let service = create_test_service();
        let token = service.issue_token(&UserId::new("alice")).unwrap();

        let claims = service.decode_token(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(claims.role.is_none());
        assert!(!claims.is_expired());
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_role_claim_round_trip() {
        let service = create_test_service();
        let token = service
            .issue_token_with_role(&UserId::new("alice"), Some("admin".to_string()))
            .unwrap();

        let claims = service.decode_token(&token).unwrap();
        assert_eq!(claims.role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_invalid_token() {
        let service = create_test_service();
        let result = service.decode_token("invalid.token.here");
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = JwtService::new("a-completely-different-secret", 1800);
        let token = other.issue_token(&UserId::new("alice")).unwrap();

        let result = create_test_service().decode_token(&token);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now().timestamp();
        let token = encode_raw(&Claims {
            sub: "alice".to_string(),
            iat: now - 7200,
            exp: now - 3600,
            role: None,
        });

        let result = create_test_service().decode_token(&token);
        assert!(matches!(result, Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_blank_subject_rejected() {
        let now = Utc::now().timestamp();
        let token = encode_raw(&Claims {
            sub: "   ".to_string(),
            iat: now,
            exp: now + 600,
            role: None,
        });

        let result = create_test_service().validate(&token);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_anonymous_subject_rejected() {
        let service = create_test_service();
        let token = service.issue_token(&UserId::anonymous()).unwrap();

        assert!(matches!(service.validate(&token), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_authenticator_outcomes() {
        let service = Arc::new(create_test_service());
        let authenticator = JwtAuthenticator::new(service.clone());

        let anonymous = authenticator.resolve(&ConnectContext::anonymous()).await;
        assert_eq!(anonymous, Ok(None));

        let token = service.issue_token(&UserId::new("bob")).unwrap();
        let identified = authenticator
            .resolve(&ConnectContext::with_token(token))
            .await;
        assert_eq!(identified, Ok(Some(UserId::new("bob"))));

        let failed = authenticator
            .resolve(&ConnectContext::with_token("garbage"))
            .await;
        assert_eq!(failed, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_authenticator_treats_empty_token_as_anonymous() {
        let authenticator = JwtAuthenticator::new(Arc::new(create_test_service()));
        let outcome = authenticator
            .resolve(&ConnectContext::with_token("  "))
            .await;
        assert_eq!(outcome, Ok(None));
    }
}
