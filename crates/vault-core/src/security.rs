use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 8 * 60 * 60;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Viewer => "viewer",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("token expired")]
    Expired,
    #[error("admin role required")]
    Forbidden,
    #[error("token signing secret is not configured")]
    MissingSecret,
    #[error("admin identity is not configured")]
    MissingIdentity,
    #[error("token lifetime is out of range")]
    InvalidLifetime,
}

#[derive(Clone)]
pub struct AuthSettings {
    pub username: String,
    pub password: String,
    pub signing_secret: String,
    pub token_ttl: Duration,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("signing_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Admin gate: issues and checks `base64url(claims).base64url(hmac_sha256)`
/// tokens. There is no unsigned or non-expiring path.
pub struct AuthGate {
    username: String,
    password: String,
    secret: Vec<u8>,
    ttl: Duration,
}

impl AuthGate {
    /// Refuses to build without a secret and a complete admin identity.
    pub fn new(settings: AuthSettings) -> Result<Self, AuthError> {
        if settings.signing_secret.trim().is_empty() {
            return Err(AuthError::MissingSecret);
        }
        if settings.username.trim().is_empty() || settings.password.is_empty() {
            return Err(AuthError::MissingIdentity);
        }
        let ttl = if settings.token_ttl <= Duration::zero() {
            Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS)
        } else {
            settings.token_ttl
        };
        Ok(Self {
            username: settings.username,
            password: settings.password,
            secret: settings.signing_secret.into_bytes(),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        self.login_at(username, password, Utc::now())
    }

    pub fn login_at(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let user_ok = username.as_bytes().ct_eq(self.username.as_bytes());
        let pass_ok = password.as_bytes().ct_eq(self.password.as_bytes());
        if !bool::from(user_ok & pass_ok) {
            warn!(username = %username, "admin login rejected");
            return Err(AuthError::InvalidCredentials);
        }
        self.issue_at(username, Role::Admin, now)
    }

    pub fn issue_at(
        &self,
        subject: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or(AuthError::InvalidLifetime)?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        let json = serde_json::to_vec(&claims)
            .map_err(|err| AuthError::Unauthorized(err.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes())?);
        debug!(subject = %subject, role = role.as_str(), exp = claims.exp, "token issued");
        Ok(IssuedToken {
            token: format!("{payload}.{signature}"),
            claims,
        })
    }

    pub fn authorize(&self, token: Option<&str>) -> Result<TokenClaims, AuthError> {
        self.authorize_at(token, Utc::now())
    }

    /// Signature first, then expiry, then role.
    pub fn authorize_at(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::Unauthorized("missing token".to_string()))?;
        let claims = self.verify(token)?;
        if now.timestamp() >= claims.exp {
            return Err(AuthError::Expired);
        }
        if claims.role != Role::Admin {
            return Err(AuthError::Forbidden);
        }
        Ok(claims)
    }

    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| AuthError::Unauthorized("malformed token".to_string()))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::Unauthorized("malformed token signature".to_string()))?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::Unauthorized("invalid token signature".to_string()))?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::Unauthorized("malformed token payload".to_string()))?;
        serde_json::from_slice(&json)
            .map_err(|_| AuthError::Unauthorized("malformed token claims".to_string()))
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, AuthError> {
        let mut mac = self.mac()?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| AuthError::MissingSecret)
    }
}
