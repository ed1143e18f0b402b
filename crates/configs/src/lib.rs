use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

/// Signing secrets and token lifetimes consumed by the token signer.
///
/// The access and refresh secrets must differ so a leaked access key cannot
/// mint refresh tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    #[serde(default)]
    pub access_secret: String,
    #[serde(default)]
    pub refresh_secret: String,
    /// Access-token lifetime for a plain login.
    #[serde(default = "default_access_expiry")]
    pub access_expiry_secs: i64,
    /// Access-token lifetime when the caller asked to stay signed in.
    #[serde(default = "default_remember_me_expiry")]
    pub remember_me_expiry_secs: i64,
    #[serde(default = "default_refresh_expiry")]
    pub refresh_expiry_secs: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            refresh_secret: String::new(),
            access_expiry_secs: default_access_expiry(),
            remember_me_expiry_secs: default_remember_me_expiry(),
            refresh_expiry_secs: default_refresh_expiry(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_mail_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub sender_email: String,
    #[serde(default)]
    pub sender_name: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: default_mail_api_url(),
            api_key: String::new(),
            sender_email: String::new(),
            sender_name: None,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_acquire_timeout() -> u64 { 30 }
fn default_access_expiry() -> i64 { 2 * 60 * 60 }
fn default_remember_me_expiry() -> i64 { 30 * 24 * 60 * 60 }
fn default_refresh_expiry() -> i64 { 30 * 24 * 60 * 60 }
fn default_mail_api_url() -> String { "https://api.brevo.com/v3/smtp/email".to_string() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.database.normalize_from_env();
        self.database.validate()?;
        self.jwt.normalize_from_env();
        self.jwt.validate()?;
        self.mail.normalize_from_env();
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        // Fill the URL from the environment when the TOML omits it
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl JwtConfig {
    pub fn normalize_from_env(&mut self) {
        if self.access_secret.trim().is_empty() {
            if let Ok(s) = std::env::var("JWT_ACCESS_SECRET") {
                self.access_secret = s;
            }
        }
        if self.refresh_secret.trim().is_empty() {
            if let Ok(s) = std::env::var("JWT_REFRESH_SECRET") {
                self.refresh_secret = s;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_secret.trim().is_empty() {
            return Err(anyhow!("jwt.access_secret is empty; set it in config.toml or JWT_ACCESS_SECRET"));
        }
        if self.refresh_secret.trim().is_empty() {
            return Err(anyhow!("jwt.refresh_secret is empty; set it in config.toml or JWT_REFRESH_SECRET"));
        }
        if self.access_secret == self.refresh_secret {
            return Err(anyhow!("jwt.access_secret and jwt.refresh_secret must differ"));
        }
        if self.access_expiry_secs <= 0 || self.remember_me_expiry_secs <= 0 || self.refresh_expiry_secs <= 0 {
            return Err(anyhow!("jwt expiries must be positive seconds"));
        }
        Ok(())
    }
}

impl MailConfig {
    pub fn normalize_from_env(&mut self) {
        if self.api_key.trim().is_empty() {
            if let Ok(k) = std::env::var("MAIL_API_KEY") {
                self.api_key = k;
            }
        }
        if self.sender_email.trim().is_empty() {
            if let Ok(s) = std::env::var("MAIL_SENDER_EMAIL") {
                self.sender_email = s;
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.sender_email.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_defaults_are_sane() {
        let jwt = JwtConfig::default();
        assert_eq!(jwt.access_expiry_secs, 7200);
        assert_eq!(jwt.remember_me_expiry_secs, 2_592_000);
        assert_eq!(jwt.refresh_expiry_secs, 2_592_000);
    }

    #[test]
    fn jwt_rejects_shared_secret() {
        let jwt = JwtConfig {
            access_secret: "same".into(),
            refresh_secret: "same".into(),
            ..JwtConfig::default()
        };
        assert!(jwt.validate().is_err());
    }

    #[test]
    fn database_rejects_non_postgres_url() {
        let db = DatabaseConfig {
            url: "mysql://localhost/app".into(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            acquire_timeout_secs: 30,
            sqlx_logging: false,
        };
        assert!(db.validate().is_err());
    }

    #[test]
    fn parses_minimal_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [database]
            url = "postgres://u:p@localhost/app"

            [jwt]
            access_secret = "a"
            refresh_secret = "b"

            [mail]
            api_key = "k"
            sender_email = "noreply@example.com"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.jwt.access_expiry_secs, 7200);
        assert!(cfg.mail.is_configured());
        assert_eq!(cfg.database.max_connections, 10);
    }
}
