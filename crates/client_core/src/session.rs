use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use shared::domain::UserRole;

use crate::ConsoleClientError;

/// Source of the signed-in operator's role.
pub trait SessionRole: Send + Sync {
    fn session_role(&self) -> UserRole;
}

#[derive(Debug, Deserialize)]
struct ConsoleClaims {
    #[serde(default)]
    rol: i64,
    #[serde(default)]
    usn: Option<String>,
}

/// Console login session. The role is read from the token's `rol` claim; the signature
/// is the server's business and is not checked here.
#[derive(Debug, Clone)]
pub struct ConsoleSession {
    token: String,
    username: Option<String>,
    role: UserRole,
}

impl ConsoleSession {
    pub fn from_token(token: impl Into<String>) -> Result<Self, ConsoleClientError> {
        let token = token.into();

        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<ConsoleClaims>(&token, &DecodingKey::from_secret(&[]), &validation)?;
        Ok(Self {
            token,
            username: data.claims.usn,
            role: UserRole::from_code(data.claims.rol),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn role(&self) -> UserRole {
        self.role
    }
}

impl SessionRole for ConsoleSession {
    fn session_role(&self) -> UserRole {
        self.role
    }
}

/// Fixed role, for hosts that resolve the role out of band.
#[derive(Debug, Clone, Copy)]
pub struct StaticRole(pub UserRole);

impl SessionRole for StaticRole {
    fn session_role(&self) -> UserRole {
        self.0
    }
}
