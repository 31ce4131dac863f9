//! Constants for the Inventory API
//!
//! Centralizing constants makes them easy to find, modify, and test.

// ============================================================================
// AUTHENTICATION
// ============================================================================

/// Cookie carrying the identity token when no Authorization header is sent
pub const ID_TOKEN_COOKIE: &str = "id_token";

/// How long a fetched JWKS is trusted before refetching (1 hour)
pub const JWKS_CACHE_TTL_SECS: u64 = 3600;

/// Minimum gap between refetches triggered by an unknown kid (5 minutes)
pub const JWKS_MIN_REFRESH_SECS: u64 = 300;

/// Tolerated clock skew when checking token exp/nbf
pub const JWT_CLOCK_SKEW_SECS: i64 = 60;

/// Microsoft identity platform base URL
pub const AZURE_LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";

/// Microsoft Graph base URL
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Scope requested for app-only Graph tokens
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Refresh Graph tokens this many seconds before they expire
pub const GRAPH_TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// UPLOADS / OBJECT STORE
// ============================================================================

/// Default per-request upload limit in MiB
pub const DEFAULT_UPLOAD_LIMIT_MIB: u64 = 10;

/// Multipart field carrying component images
pub const IMAGE_FIELD_NAME: &str = "image";

/// Default bucket for component images
pub const DEFAULT_BUCKET: &str = "vinventory";

/// Lifetime of presigned image URLs (24 hours)
pub const PRESIGNED_URL_TTL_SECS: u64 = 86400;

// ============================================================================
// IDENTITY
// ============================================================================

/// Default request-scoped timeout around directory calls
pub const DEFAULT_IDENTITY_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// WARRANTY NOTICES
// ============================================================================

/// Subject line of the warranty expiry mail
pub const WARRANTY_MAIL_SUBJECT: &str = "Warranty Expiration Notices";

/// First line of the warranty expiry mail body
pub const WARRANTY_MAIL_HEADER: &str = "The following components have warranties expiring soon:";

/// Default period of the in-process warranty notifier (24 hours)
pub const DEFAULT_WARRANTY_INTERVAL_SECS: u64 = 86400;

/// CLI argument selecting the one-shot notification job
pub const NOTIFICATION_JOB_ARG: &str = "notification_job";

// ============================================================================
// SERVER
// ============================================================================

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

