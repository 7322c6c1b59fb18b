//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables. Missing secrets
//! degrade the matching verifier or collaborator to a logged no-op rather
//! than failing startup.

use std::env;
use tracing::warn;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Shared token for the Facebook subscription-verification handshake
    pub facebook_verify_token: Option<String>,

    /// App secret for Facebook POST HMAC verification
    pub facebook_app_secret: Option<String>,

    /// Whether Facebook POSTs must carry a valid X-Hub-Signature-256.
    /// Off by default: the upstream subscription flow authenticates via
    /// the verify token only.
    pub require_facebook_signature: bool,

    /// TikTok client secret for webhook signature verification
    pub tiktok_client_secret: Option<String>,

    /// Maximum age in seconds for TikTok signature timestamps (0 = no check)
    pub tiktok_signature_max_age: u64,

    /// Gemini API key for classification
    pub gemini_api_key: Option<String>,

    /// Gemini model used for classification
    pub gemini_model: String,

    /// Classification HTTP timeout in milliseconds
    pub classify_timeout_ms: u64,

    /// Slack incoming-webhook URL for notifications
    pub slack_webhook_url: Option<String>,

    /// Channel display label used when a provider's payload omits one
    pub channel_display_name: String,

    /// Maximum number of concurrently processing dispatch tasks
    pub dispatch_concurrency: usize,

    /// Notification HTTP timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            facebook_verify_token: env::var("FB_VERIFY_TOKEN").ok(),

            facebook_app_secret: env::var("FB_APP_SECRET").ok(),

            require_facebook_signature: parse_bool("FB_REQUIRE_SIGNATURE", false),

            tiktok_client_secret: env::var("TIKTOK_CLIENT_SECRET").ok(),

            tiktok_signature_max_age: env::var("TIKTOK_SIGNATURE_MAX_AGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),

            gemini_api_key: env::var("GEMINI_API_KEY").ok(),

            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-pro".to_string()),

            classify_timeout_ms: env::var("CLASSIFY_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60_000),

            slack_webhook_url: env::var("SLACK_WEBHOOK_URL").ok(),

            channel_display_name: env::var("CHANNEL_DISPLAY_NAME").unwrap_or_default(),

            dispatch_concurrency: env::var("DISPATCH_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(100),

            request_timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
        }
    }
}

/// Parse a boolean flag ("1"/"true"/"yes", case-insensitive).
fn parse_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" | "" => false,
            _ => {
                warn!(env_var = name, value = %raw, "Invalid boolean, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_values() {
        env::set_var("TEST_BOOL", "true");
        assert!(parse_bool("TEST_BOOL", false));
        env::set_var("TEST_BOOL", "1");
        assert!(parse_bool("TEST_BOOL", false));
        env::set_var("TEST_BOOL", "No");
        assert!(!parse_bool("TEST_BOOL", true));
        env::remove_var("TEST_BOOL");
    }

    #[test]
    fn test_parse_bool_default() {
        assert!(!parse_bool("NONEXISTENT_BOOL_VAR", false));
        assert!(parse_bool("NONEXISTENT_BOOL_VAR_2", true));
    }

    #[test]
    fn test_parse_bool_garbage_uses_default() {
        env::set_var("TEST_BOOL_GARBAGE", "maybe");
        assert!(parse_bool("TEST_BOOL_GARBAGE", true));
        assert!(!parse_bool("TEST_BOOL_GARBAGE", false));
        env::remove_var("TEST_BOOL_GARBAGE");
    }
}
