use std::env;
use std::path::PathBuf;

/// Runtime settings read from the environment (optionally seeded from `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_address: String,
    /// Secret for signing session tokens; only required by `serve`.
    pub jwt_secret: Option<String>,
    pub jwt_expiry_hours: i64,
    pub upload_dir: PathBuf,
    pub cors_origin: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Sender mailbox and SMTP login; confirmations are skipped without both credentials.
    pub email_user: Option<String>,
    pub email_password: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Self {
            database_url: non_empty("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            max_connections: parse_or("DB_MAX_CONNECTIONS", non_empty("DB_MAX_CONNECTIONS"), 5)?,
            bind_address: non_empty("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1:5000".into()),
            jwt_secret: non_empty("JWT_SECRET"),
            jwt_expiry_hours: parse_or("JWT_EXPIRY_HOURS", non_empty("JWT_EXPIRY_HOURS"), 24)?,
            upload_dir: non_empty("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            cors_origin: non_empty("CORS_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".into()),
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.0-flash".into()),
            smtp_host: non_empty("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".into()),
            smtp_port: parse_or("SMTP_PORT", non_empty("SMTP_PORT"), 587)?,
            email_user: non_empty("EMAIL_USER"),
            email_password: non_empty("EMAIL_PASSWORD"),
        })
    }

    pub fn smtp_credentials(&self) -> Option<(&str, &str)> {
        Some((self.email_user.as_deref()?, self.email_password.as_deref()?))
    }

    pub fn require_jwt_secret(&self) -> Result<&str, ConfigError> {
        self.jwt_secret
            .as_deref()
            .ok_or(ConfigError::Missing("JWT_SECRET"))
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/portal")]))
            .unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:5000");
        assert_eq!(config.jwt_expiry_hours, 24);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert!(config.gemini_api_key.is_none());
        assert!(config.require_jwt_secret().is_err());
        assert_eq!(config.smtp_host, "smtp.gmail.com");
        assert_eq!(config.smtp_port, 587);
        assert!(config.smtp_credentials().is_none());
    }

    #[test]
    fn smtp_needs_both_user_and_password() {
        let user_only = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/portal"),
            ("EMAIL_USER", "portal@example.com"),
        ]))
        .unwrap();
        assert!(user_only.smtp_credentials().is_none());

        let both = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/portal"),
            ("EMAIL_USER", "portal@example.com"),
            ("EMAIL_PASSWORD", "app-password"),
            ("SMTP_PORT", "2525"),
        ]))
        .unwrap();
        assert_eq!(both.smtp_credentials(), Some(("portal@example.com", "app-password")));
        assert_eq!(both.smtp_port, 2525);
    }

    #[test]
    fn database_url_is_required() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/portal"),
            ("JWT_EXPIRY_HOURS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "JWT_EXPIRY_HOURS",
                ..
            }
        ));
    }
}
