//! Provider endpoints and tunables

use std::time::Duration;

/// Base URL of the chat web application
pub const DEFAULT_BASE_URL: &str = "https://chat.openai.com";

/// Model identifier sent with every conversation request
pub const DEFAULT_MODEL: &str = "text-davinci-002-render";

/// Browser user agent; the web API rejects non-browser clients
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.1 Safari/605.1.15";

/// Cookie carrying the renewable session secret
pub const SESSION_COOKIE: &str = "__Secure-next-auth.session-token";

/// Cookie carrying the auth callback URL
pub const CALLBACK_COOKIE: &str = "__Secure-next-auth.callback-url";

/// Settings shared by the transport, session manager and conversation registry
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Base URL, without a trailing slash
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// User-Agent header value
    pub user_agent: String,
    /// Upper bound for a single HTTP request
    pub request_timeout: Duration,
    /// Period of the background session refresh
    pub refresh_interval: Duration,
    /// Inactivity after which a user's conversation starts over
    pub idle_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(120),
            refresh_interval: Duration::from_secs(10 * 60),
            idle_timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl ProviderSettings {
    /// Session endpoint that trades the cookie for a bearer token
    pub fn session_url(&self) -> String {
        format!("{}/api/auth/session", self.base())
    }

    /// Conversation endpoint
    pub fn conversation_url(&self) -> String {
        format!("{}/backend-api/conversation", self.base())
    }

    /// Value of the callback-url cookie
    pub fn callback_url(&self) -> String {
        format!("{}/", self.base())
    }

    /// Referer header for conversation requests
    pub fn referer(&self) -> String {
        format!("{}/chat", self.base())
    }

    /// Host header for conversation requests
    pub fn host(&self) -> &str {
        let base = self.base();
        let without_scheme = base.split_once("://").map_or(base, |(_, rest)| rest);
        without_scheme.split('/').next().unwrap_or(without_scheme)
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let settings = ProviderSettings::default();
        assert_eq!(
            settings.session_url(),
            "https://chat.openai.com/api/auth/session"
        );
        assert_eq!(
            settings.conversation_url(),
            "https://chat.openai.com/backend-api/conversation"
        );
        assert_eq!(settings.callback_url(), "https://chat.openai.com/");
        assert_eq!(settings.referer(), "https://chat.openai.com/chat");
        assert_eq!(settings.host(), "chat.openai.com");
    }

    #[test]
    fn test_trailing_slash_and_port() {
        let settings = ProviderSettings {
            base_url: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.session_url(), "http://localhost:8080/api/auth/session");
        assert_eq!(settings.host(), "localhost:8080");
    }

    #[test]
    fn test_default_intervals() {
        let settings = ProviderSettings::default();
        assert_eq!(settings.refresh_interval, Duration::from_secs(600));
        assert_eq!(settings.idle_timeout, Duration::from_secs(300));
    }
}
