//! Application configuration management.
//!
//! Configuration is read from environment variables (optionally seeded from a
//! `.env` file) and deserialized by `envy` into a type-safe struct.

use anyhow::Context;
use serde::Deserialize;
use url::Url;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `APP_BASE_URL` (optional): base URL of the web client, used for invitation links
/// - `CORS_ALLOWED_ORIGIN` (optional): single allowed origin, permissive when unset
/// - `EMAIL_API_URL` / `EMAIL_API_KEY` (optional): email delivery API, disabled when unset
/// - `EMAIL_FROM` (optional): sender address
/// - `INVITATION_TTL_HOURS` (optional): invitation validity, defaults to one week
/// - `BOOTSTRAP_ADMIN_EMAIL` / `BOOTSTRAP_ADMIN_TOKEN` (optional): platform admin ensured at startup
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,

    #[serde(default)]
    pub cors_allowed_origin: Option<String>,

    #[serde(default)]
    pub email_api_url: Option<String>,

    #[serde(default)]
    pub email_api_key: Option<String>,

    #[serde(default = "default_email_from")]
    pub email_from: String,

    #[serde(default = "default_invitation_ttl_hours")]
    pub invitation_ttl_hours: i64,

    #[serde(default)]
    pub bootstrap_admin_email: Option<String>,

    #[serde(default)]
    pub bootstrap_admin_token: Option<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_app_base_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_email_from() -> String {
    "ClubFlow <noreply@clubflow.app>".to_string()
}

fn default_invitation_ttl_hours() -> i64 {
    24 * 7
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a value cannot be
    /// parsed into its expected type.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }

    /// Build configuration from explicit key/value pairs.
    pub fn from_iter<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)
    }

    /// Check that URL-valued settings are absolute http(s) URLs.
    pub fn validate(&self) -> anyhow::Result<()> {
        check_http_url("APP_BASE_URL", &self.app_base_url)?;
        if let Some(api_url) = self.email_api_url.as_deref().filter(|u| !u.is_empty()) {
            check_http_url("EMAIL_API_URL", api_url)?;
        }
        if let Some(origin) = &self.cors_allowed_origin {
            check_http_url("CORS_ALLOWED_ORIGIN", origin)?;
        }
        Ok(())
    }

    /// Whether outgoing email is configured.
    pub fn email_enabled(&self) -> bool {
        self.email_api_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Both bootstrap admin settings, if present.
    pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
        match (&self.bootstrap_admin_email, &self.bootstrap_admin_token) {
            (Some(email), Some(token)) if !email.is_empty() && !token.is_empty() => {
                Some((email.as_str(), token.as_str()))
            }
            _ => None,
        }
    }
}

fn check_http_url(name: &str, value: &str) -> anyhow::Result<()> {
    let parsed = Url::parse(value).with_context(|| format!("{name} is not a valid URL: {value}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => anyhow::bail!("{name} must use http or https, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = Config::from_iter(vars(&[("DATABASE_URL", "postgres://localhost/clubs")]))
            .unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.app_base_url, "http://localhost:5173");
        assert_eq!(config.invitation_ttl_hours, 168);
        assert!(!config.email_enabled());
        assert!(config.bootstrap_admin().is_none());
    }

    #[test]
    fn database_url_is_required() {
        assert!(Config::from_iter(vars(&[("SERVER_PORT", "8080")])).is_err());
    }

    #[test]
    fn reads_optional_settings() {
        let config = Config::from_iter(vars(&[
            ("DATABASE_URL", "postgres://localhost/clubs"),
            ("SERVER_PORT", "8080"),
            ("EMAIL_API_URL", "https://mail.example.com/send"),
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
            ("BOOTSTRAP_ADMIN_TOKEN", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.server_port, 8080);
        assert!(config.email_enabled());
        assert_eq!(
            config.bootstrap_admin(),
            Some(("root@example.com", "secret"))
        );
    }

    #[test]
    fn bootstrap_admin_needs_both_values() {
        let config = Config::from_iter(vars(&[
            ("DATABASE_URL", "postgres://localhost/clubs"),
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
        ]))
        .unwrap();

        assert!(config.bootstrap_admin().is_none());
    }

    #[test]
    fn validate_rejects_non_http_urls() {
        let ok = Config::from_iter(vars(&[("DATABASE_URL", "postgres://localhost/clubs")])).unwrap();
        assert!(ok.validate().is_ok());

        let bad_base = Config::from_iter(vars(&[
            ("DATABASE_URL", "postgres://localhost/clubs"),
            ("APP_BASE_URL", "not a url"),
        ]))
        .unwrap();
        assert!(bad_base.validate().is_err());

        let bad_mail = Config::from_iter(vars(&[
            ("DATABASE_URL", "postgres://localhost/clubs"),
            ("EMAIL_API_URL", "ftp://mail.example.com"),
        ]))
        .unwrap();
        assert!(bad_mail.validate().is_err());
    }
}
