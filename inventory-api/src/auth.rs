//! Authentication
//!
//! Verifies Entra ID tokens against the tenant JWKS. Signing keys are cached
//! by `kid` and refetched when a token names an unknown key or the cache is
//! older than [`JWKS_CACHE_TTL_SECS`].
//!
//! Time claims are checked here with an injected clock rather than by
//! `jsonwebtoken`, so tests can pin "now".

use dashmap::DashMap;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use crate::config::AzureConfig;
use crate::constants::{
    AZURE_LOGIN_BASE_URL, JWKS_CACHE_TTL_SECS, JWKS_MIN_REFRESH_SECS, JWT_CLOCK_SKEW_SECS,
};
use crate::error::{ApiError, ApiResult};

// ============================================================================
// CLOCK
// ============================================================================

/// Source of "now" for token time checks.
pub trait JwtClock: Send + Sync + std::fmt::Debug {
    fn now_epoch_secs(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        }
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// CLAIMS & CONTEXT
// ============================================================================

/// Claims read from an Entra ID token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Object id of the user in the directory.
    #[serde(default)]
    pub oid: Option<String>,
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
}

/// Authenticated caller, injected into request extensions by the middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Directory object id when present, otherwise the token subject.
    pub user_id: String,
    pub name: Option<String>,
    pub username: Option<String>,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.oid.unwrap_or(claims.sub),
            name: claims.name,
            username: claims.preferred_username,
        }
    }
}

// ============================================================================
// VERIFIER
// ============================================================================

/// RS256 token verifier backed by a JWKS endpoint.
pub struct JwtVerifier {
    audience: String,
    /// `None` pins the verifier to the keys it was built with.
    jwks_url: Option<String>,
    http: reqwest::Client,
    keys: DashMap<String, DecodingKey>,
    fetched_at: RwLock<Option<Instant>>,
    ttl: Duration,
    clock: Box<dyn JwtClock>,
    leeway_secs: i64,
}

impl JwtVerifier {
    /// Verifier for tokens issued to `azure.client_id` by `azure.tenant_id`.
    pub fn from_azure(azure: &AzureConfig, timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::internal_error(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            audience: azure.client_id.clone(),
            jwks_url: Some(jwks_url(&azure.tenant_id)),
            http,
            keys: DashMap::new(),
            fetched_at: RwLock::new(None),
            ttl: Duration::from_secs(JWKS_CACHE_TTL_SECS),
            clock: Box::new(SystemClock),
            leeway_secs: JWT_CLOCK_SKEW_SECS,
        })
    }

    /// Verifier that only trusts the keys in `jwks` and never fetches.
    pub fn with_jwks(audience: impl Into<String>, jwks: &JwkSet) -> Self {
        let verifier = Self {
            audience: audience.into(),
            jwks_url: None,
            http: reqwest::Client::new(),
            keys: DashMap::new(),
            fetched_at: RwLock::new(None),
            ttl: Duration::from_secs(JWKS_CACHE_TTL_SECS),
            clock: Box::new(SystemClock),
            leeway_secs: JWT_CLOCK_SKEW_SECS,
        };
        verifier.load_keys(jwks);
        verifier
    }

    pub fn with_clock(mut self, clock: impl JwtClock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn cached_key_count(&self) -> usize {
        self.keys.len()
    }

    fn load_keys(&self, jwks: &JwkSet) {
        self.keys.clear();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    self.keys.insert(kid, key);
                }
                Err(e) => tracing::warn!(kid = %kid, error = %e, "Skipping unusable JWKS key"),
            }
        }
    }

    /// Whether the cache must be refetched before looking up `kid`.
    ///
    /// Unknown kids trigger a refetch at most once per
    /// [`JWKS_MIN_REFRESH_SECS`].
    async fn needs_refresh(&self, kid: &str) -> bool {
        let Some(at) = *self.fetched_at.read().await else {
            return true;
        };
        let age = at.elapsed();
        age >= self.ttl
            || (!self.keys.contains_key(kid) && age >= Duration::from_secs(JWKS_MIN_REFRESH_SECS))
    }

    async fn refresh(&self, url: &str) -> ApiResult<()> {
        let mut fetched_at = self.fetched_at.write().await;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::upstream(format!("JWKS request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(ApiError::upstream(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }
        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| ApiError::upstream(format!("Invalid JWKS document: {}", e)))?;
        self.load_keys(&jwks);
        *fetched_at = Some(Instant::now());
        tracing::debug!(keys = self.keys.len(), "Refreshed JWKS");
        Ok(())
    }

    async fn key_for(&self, kid: &str) -> ApiResult<DecodingKey> {
        if let Some(url) = self.jwks_url.as_deref() {
            if self.needs_refresh(kid).await {
                self.refresh(url).await?;
            }
        }
        self.keys
            .get(kid)
            .map(|k| k.value().clone())
            .ok_or_else(|| ApiError::invalid_token("Token signed with an unknown key"))
    }

    /// Verify signature, audience and time claims.
    pub async fn verify(&self, token: &str) -> ApiResult<Claims> {
        let header = decode_header(token)
            .map_err(|e| ApiError::invalid_token(format!("Malformed token: {}", e)))?;
        if header.alg != Algorithm::RS256 {
            return Err(ApiError::invalid_token("Unsupported signing algorithm"));
        }
        let kid = header
            .kid
            .ok_or_else(|| ApiError::invalid_token("Token header has no kid"))?;
        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "aud".to_string()]);

        let claims = decode::<Claims>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    ApiError::invalid_token("Token signature is invalid")
                }
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    ApiError::invalid_token("Token was issued for another audience")
                }
                _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
            })?
            .claims;

        let now = self.clock.now_epoch_secs();
        if now < 0 {
            tracing::error!(timestamp = now, "System clock returned pre-epoch time");
            return Err(ApiError::internal_error("Server time configuration error"));
        }
        validate_claim_times(now, claims.exp, claims.nbf, self.leeway_secs)?;
        Ok(claims)
    }
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("audience", &self.audience)
            .field("jwks_url", &self.jwks_url)
            .field("keys", &self.keys.len())
            .finish()
    }
}

/// Key set location for a tenant.
pub fn jwks_url(tenant_id: &str) -> String {
    format!("{}/{}/discovery/v2.0/keys", AZURE_LOGIN_BASE_URL, tenant_id)
}

fn validate_claim_times(now: i64, exp: i64, nbf: Option<i64>, leeway_secs: i64) -> ApiResult<()> {
    if let Some(nbf) = nbf {
        if now + leeway_secs < nbf {
            return Err(ApiError::unauthorized("Token not yet valid (nbf)"));
        }
    }
    if exp < now - leeway_secs {
        return Err(ApiError::token_expired());
    }
    Ok(())
}

/// Token from `Authorization: Bearer`, falling back to the named cookie.
pub fn extract_token<'a>(
    authorization: Option<&'a str>,
    cookie_header: Option<&'a str>,
    cookie_name: &str,
) -> Option<&'a str> {
    if let Some(token) = authorization
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token);
    }
    cookie_header?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim())
        .filter(|v| !v.is_empty())
}


#[cfg(test)]
mod tests {
    use super::test_keys::*;
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_jwks_url_uses_tenant() {
        assert_eq!(
            jwks_url("tenant-1"),
            "https://login.microsoftonline.com/tenant-1/discovery/v2.0/keys"
        );
    }

    #[test]
    fn test_extract_token_prefers_header() {
        assert_eq!(
            extract_token(Some("Bearer abc"), Some("id_token=xyz"), "id_token"),
            Some("abc")
        );
        assert_eq!(
            extract_token(None, Some("theme=dark; id_token=xyz"), "id_token"),
            Some("xyz")
        );
        assert_eq!(extract_token(Some("Basic abc"), None, "id_token"), None);
        assert_eq!(extract_token(None, Some("id_token="), "id_token"), None);
    }

    #[test]
    fn test_claim_times_with_leeway() {
        assert!(validate_claim_times(1000, 990, None, 60).is_ok());
        let expired = validate_claim_times(1000, 900, None, 60).unwrap_err();
        assert_eq!(expired.code, ErrorCode::TokenExpired);
        assert!(validate_claim_times(1000, 2000, Some(1100), 60).is_err());
    }

    #[test]
    fn test_context_prefers_object_id() {
        let claims: Claims = serde_json::from_value(claims(1)).unwrap();
        let ctx = AuthContext::from(claims.clone());
        assert_eq!(ctx.user_id, "u1");
        assert_eq!(ctx.name.as_deref(), Some("Jane Doe"));

        let ctx = AuthContext::from(Claims { oid: None, ..claims });
        assert_eq!(ctx.user_id, "subject-1");
    }

    #[tokio::test]
    async fn test_verify_valid_token() {
        let verifier = verifier();
        assert_eq!(verifier.cached_key_count(), 1);
        let claims = verifier.verify(&valid_token()).await.unwrap();
        assert_eq!(claims.oid.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_verify_rejects_expired_token() {
        let verifier = verifier().with_clock(FixedClock(2_000_000_000));
        let token = sign(&claims(1_000_000_000), KID);
        let err = verifier.verify(&token).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_audience() {
        let mut c = claims(SystemClock.now_epoch_secs() + 3600);
        c["aud"] = serde_json::json!("someone-else");
        let err = verifier().verify(&sign(&c, KID)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }

    #[tokio::test]
    async fn test_verify_rejects_unknown_kid() {
        let token = sign(&claims(SystemClock.now_epoch_secs() + 3600), "rotated");
        let err = verifier().verify(&token).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }

    #[tokio::test]
    async fn test_verify_rejects_garbage() {
        assert!(verifier().verify("not-a-jwt").await.is_err());
    }
}
