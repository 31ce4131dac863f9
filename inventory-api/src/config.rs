//! API Configuration Module
//!
//! Server, CORS, upload and identity-provider settings. Configuration is
//! loaded from environment variables with sensible defaults for development.

use secrecy::SecretString;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BIND_ADDR, DEFAULT_CORS_MAX_AGE_SECS, DEFAULT_IDENTITY_TIMEOUT_SECS,
    DEFAULT_UPLOAD_LIMIT_MIB,
};
use crate::types::PublicAuthConfig;
use inventory_core::ConfigError;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Socket address to listen on.
    pub bind_addr: String,

    /// Deployment environment name ("development", "production", ...).
    pub environment: String,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Request Limits
    // ========================================================================
    /// Maximum size of an image upload request, in MiB.
    pub upload_limit_mib: u64,

    /// Request-scoped timeout around every identity provider call.
    pub identity_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            environment: "development".to_string(),
            cors_origins: Vec::new(), // Empty = allow all
            cors_allow_credentials: false,
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
            upload_limit_mib: DEFAULT_UPLOAD_LIMIT_MIB,
            identity_timeout: Duration::from_secs(DEFAULT_IDENTITY_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `INVENTORY_BIND_ADDR`: Listen address (default: 0.0.0.0:8080)
    /// - `INVENTORY_ENVIRONMENT`: Deployment environment (default: development)
    /// - `INVENTORY_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `INVENTORY_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `INVENTORY_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `UPLOAD_LIMIT_MIB`: Image upload limit (default: 10)
    /// - `IDENTITY_TIMEOUT_SECS`: Directory call timeout (default: 10)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("INVENTORY_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let upload_limit_mib = std::env::var("UPLOAD_LIMIT_MIB")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .filter(|v: &u64| *v > 0)
            .unwrap_or(DEFAULT_UPLOAD_LIMIT_MIB);

        Self {
            bind_addr: std::env::var("INVENTORY_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            environment: std::env::var("INVENTORY_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            cors_origins,
            cors_allow_credentials: std::env::var("INVENTORY_CORS_ALLOW_CREDENTIALS")
                .ok()
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false),
            cors_max_age_secs: std::env::var("INVENTORY_CORS_MAX_AGE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CORS_MAX_AGE_SECS),
            upload_limit_mib,
            identity_timeout: Duration::from_secs(
                std::env::var("IDENTITY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_IDENTITY_TIMEOUT_SECS),
            ),
        }
    }

    /// Upload limit in bytes.
    pub fn upload_limit_bytes(&self) -> usize {
        self.upload_limit().bytes()
    }

    pub fn upload_limit(&self) -> UploadLimit {
        UploadLimit {
            mib: self.upload_limit_mib,
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            // Dev mode: allow all
            return true;
        }
        self.cors_origins.iter().any(|allowed| allowed == origin)
    }
}

/// Size cap applied to image uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimit {
    pub mib: u64,
}

impl UploadLimit {
    pub fn bytes(&self) -> usize {
        (self.mib as usize).saturating_mul(1024 * 1024)
    }
}

// ============================================================================
// AZURE (ENTRA ID) CONFIGURATION
// ============================================================================

/// Tenant and application registration used for token verification and
/// for app-only Microsoft Graph access.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

impl AzureConfig {
    /// Load from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let required = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingRequired {
                    field: key.to_string(),
                })
        };
        Ok(Self {
            tenant_id: required("AZURE_TENANT_ID")?,
            client_id: required("AZURE_CLIENT_ID")?,
            client_secret: SecretString::from(required("AZURE_CLIENT_SECRET")?),
        })
    }

    /// The identifiers that may be handed to browsers.
    pub fn public(&self) -> PublicAuthConfig {
        PublicAuthConfig {
            tenant_id: self.tenant_id.clone(),
            client_id: self.client_id.clone(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_env::{EnvVarGuard, ENV_LOCK};
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert!(!config.cors_allow_credentials);
        assert_eq!(config.cors_max_age_secs, 86400);
        assert_eq!(config.upload_limit_mib, 10);
        assert_eq!(config.upload_limit_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_from_env_reads_upload_limit() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _limit = EnvVarGuard::set("UPLOAD_LIMIT_MIB", Some("25"));
        let _origins = EnvVarGuard::set("INVENTORY_CORS_ORIGINS", Some("https://a.example, ,https://b.example"));
        let config = ApiConfig::from_env();
        assert_eq!(config.upload_limit_mib, 25);
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_from_env_ignores_zero_upload_limit() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _limit = EnvVarGuard::set("UPLOAD_LIMIT_MIB", Some("0"));
        assert_eq!(ApiConfig::from_env().upload_limit_mib, 10);
    }

    #[test]
    fn test_origin_allowed() {
        let mut config = ApiConfig::default();
        assert!(config.is_origin_allowed("http://localhost:3000"));

        config.cors_origins = vec!["https://inventory.example".to_string()];
        assert!(config.is_origin_allowed("https://inventory.example"));
        assert!(!config.is_origin_allowed("https://evil.example"));
    }

    #[test]
    fn test_is_production() {
        let mut config = ApiConfig::default();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
    }

    #[test]
    fn test_azure_config_requires_all_fields() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _tenant = EnvVarGuard::set("AZURE_TENANT_ID", Some("tenant"));
        let _client = EnvVarGuard::set("AZURE_CLIENT_ID", Some("client"));
        let _secret = EnvVarGuard::set("AZURE_CLIENT_SECRET", None);
        assert!(matches!(
            AzureConfig::from_env(),
            Err(ConfigError::MissingRequired { ref field }) if field == "AZURE_CLIENT_SECRET"
        ));

        let _secret = EnvVarGuard::set("AZURE_CLIENT_SECRET", Some("s3cret"));
        let config = AzureConfig::from_env().unwrap();
        assert_eq!(config.tenant_id, "tenant");
        assert_eq!(config.client_secret.expose_secret(), "s3cret");
    }
}
