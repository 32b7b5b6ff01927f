use anyhow::{anyhow, Result};
use async_trait::async_trait;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

const TOKEN_ISSUER: &str = "spotlight";
const TOKEN_AUDIENCE: &str = "spotlight";

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
}

/// Resolves an opaque session credential to the caller it belongs to.
///
/// `Ok(None)` means the credential is not valid for any caller; `Err` is
/// reserved for the provider itself failing.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve_caller(&self, credential: &str) -> Result<Option<AuthSession>>;
}

/// PASETO v4.local access tokens.
#[derive(Clone)]
pub struct AuthService {
    access_key: [u8; 32],
    access_ttl_minutes: u64,
}

impl AuthService {
    pub fn new(access_key: [u8; 32], access_ttl_minutes: u64) -> Self {
        Self {
            access_key,
            access_ttl_minutes,
        }
    }

    pub fn issue_access_token(&self, user_id: Uuid) -> Result<(String, OffsetDateTime)> {
        let (claims, expires_at) = self.build_access_claims(user_id)?;
        let key = SymmetricKey::<V4>::from(&self.access_key)?;
        let token = local::encrypt(&key, &claims, None, None)?;
        Ok((token, expires_at))
    }

    pub fn authenticate_access_token(&self, token: &str) -> Result<Option<AuthSession>> {
        let claims = match self.decrypt_claims(token)? {
            Some(claims) => claims,
            None => return Ok(None),
        };
        if !has_token_type(&claims, "access") {
            return Ok(None);
        }
        match claim_uuid(&claims, "sub") {
            Ok(user_id) => Ok(Some(AuthSession { user_id })),
            Err(_) => Ok(None),
        }
    }

    fn decrypt_claims(&self, token: &str) -> Result<Option<Claims>> {
        let key = SymmetricKey::<V4>::from(&self.access_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(TOKEN_ISSUER);
        rules.validate_audience_with(TOKEN_AUDIENCE);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        Ok(trusted.payload_claims().cloned())
    }

    fn build_access_claims(&self, user_id: Uuid) -> Result<(Claims, OffsetDateTime)> {
        let duration = std::time::Duration::from_secs(self.access_ttl_minutes * 60);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer(TOKEN_ISSUER)?;
        claims.audience(TOKEN_AUDIENCE)?;
        claims.subject(&user_id.to_string())?;
        claims.add_additional("typ", "access")?;
        let expires_at =
            OffsetDateTime::now_utc() + Duration::minutes(self.access_ttl_minutes as i64);
        Ok((claims, expires_at))
    }
}

#[async_trait]
impl IdentityProvider for AuthService {
    async fn resolve_caller(&self, credential: &str) -> Result<Option<AuthSession>> {
        self.authenticate_access_token(credential)
    }
}

fn claim_uuid(claims: &Claims, name: &str) -> Result<Uuid> {
    let value = claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing {} claim", name))?;
    Ok(Uuid::parse_str(value)?)
}

fn has_token_type(claims: &Claims, expected: &str) -> bool {
    claims
        .get_claim("typ")
        .and_then(|value| value.as_str())
        .map(|value| value == expected)
        .unwrap_or(false)
}
