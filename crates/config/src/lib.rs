use std::path::PathBuf;
use serde::Deserialize;

/// All configuration for the pickup service.
///
/// Precedence (lowest to highest): defaults → config file → env var → CLI arg.
/// CLI arg merging is done by the caller after `Config::load()`.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub db_url: String,

    // Server
    pub port: u16,
    pub site_url: String,
    pub request_timeout_secs: u64,
    pub cache_ttl_secs: u64,

    // Logging
    pub log_level: String,
    pub utc: bool,

    // Stripe
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    pub currency: String,

    // Resend
    pub resend_api_key: String,
    pub resend_api_base: String,
    pub email_from: String,
}

/// Config file layout (~/.pickup/config.toml). All fields optional; they layer
/// on top of compiled-in defaults.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    db_url: Option<String>,
    port: Option<u16>,
    site_url: Option<String>,
    request_timeout_secs: Option<u64>,
    cache_ttl_secs: Option<u64>,
    log_level: Option<String>,
    utc: Option<bool>,
    stripe_secret_key: Option<String>,
    stripe_api_base: Option<String>,
    currency: Option<String>,
    resend_api_key: Option<String>,
    resend_api_base: Option<String>,
    email_from: Option<String>,
}

impl Config {
    /// Config directory: ~/.pickup/
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pickup")
    }

    /// Config file path: ~/.pickup/config.toml
    pub fn file_path() -> PathBuf {
        Self::dir().join("config.toml")
    }

    /// Load config: defaults → config file → env vars.
    /// CLI args should be merged by the caller afterward.
    pub fn load() -> Self {
        let mut config = Self::defaults();

        // Layer 2: config file
        if let Ok(contents) = std::fs::read_to_string(Self::file_path()) {
            if let Ok(file) = toml::from_str::<FileConfig>(&contents) {
                config.apply_file(file);
            }
        }

        // Layer 3: environment variables
        config.apply_env();

        config
    }

    /// Whether checkout can reach Stripe at all.
    pub fn stripe_enabled(&self) -> bool {
        !self.stripe_secret_key.is_empty()
    }

    /// Whether confirmation emails are sent.
    pub fn email_enabled(&self) -> bool {
        !self.resend_api_key.is_empty()
    }

    // --- Private helpers ---

    fn defaults() -> Self {
        Self {
            db_url: "sqlite:pickup.db?mode=rwc".to_string(),
            port: 3000,
            site_url: "http://localhost:3000".to_string(),
            request_timeout_secs: 10,
            cache_ttl_secs: 30,
            log_level: "info".to_string(),
            utc: false,
            stripe_secret_key: String::new(),
            stripe_api_base: "https://api.stripe.com".to_string(),
            currency: "usd".to_string(),
            resend_api_key: String::new(),
            resend_api_base: "https://api.resend.com".to_string(),
            email_from: "Pickup <noreply@pickup.local>".to_string(),
        }
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.db_url { self.db_url = v; }
        if let Some(v) = file.port { self.port = v; }
        if let Some(v) = file.site_url { self.site_url = v; }
        if let Some(v) = file.request_timeout_secs { self.request_timeout_secs = v; }
        if let Some(v) = file.cache_ttl_secs { self.cache_ttl_secs = v; }
        if let Some(v) = file.log_level { self.log_level = v; }
        if let Some(v) = file.utc { self.utc = v; }
        if let Some(v) = file.stripe_secret_key { self.stripe_secret_key = v; }
        if let Some(v) = file.stripe_api_base { self.stripe_api_base = v; }
        if let Some(v) = file.currency { self.currency = v; }
        if let Some(v) = file.resend_api_key { self.resend_api_key = v; }
        if let Some(v) = file.resend_api_base { self.resend_api_base = v; }
        if let Some(v) = file.email_from { self.email_from = v; }
    }

    fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("PICKUP_DB_URL") { self.db_url = v; }
        if let Some(v) = var("PICKUP_PORT") {
            if let Ok(p) = v.parse() { self.port = p; }
        }
        if let Some(v) = var("PICKUP_SITE_URL") { self.site_url = v; }
        if let Some(v) = var("PICKUP_REQUEST_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() { self.request_timeout_secs = n; }
        }
        if let Some(v) = var("PICKUP_CACHE_TTL_SECS") {
            if let Ok(n) = v.parse() { self.cache_ttl_secs = n; }
        }
        if let Some(v) = var("PICKUP_LOG_LEVEL") { self.log_level = v; }
        if let Some(v) = var("PICKUP_UTC") {
            self.utc = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = var("STRIPE_SECRET_KEY") { self.stripe_secret_key = v; }
        if let Some(v) = var("PICKUP_STRIPE_API_BASE") { self.stripe_api_base = v; }
        if let Some(v) = var("PICKUP_CURRENCY") { self.currency = v; }
        if let Some(v) = var("RESEND_API_KEY") { self.resend_api_key = v; }
        if let Some(v) = var("PICKUP_RESEND_API_BASE") { self.resend_api_base = v; }
        if let Some(v) = var("PICKUP_EMAIL_FROM") { self.email_from = v; }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn file_layer_overrides_defaults() {
        let mut config = Config::defaults();
        let file: FileConfig = toml::from_str(
            r#"
            port = 8080
            site_url = "https://pickup.example"
            utc = true
            "#,
        )
        .unwrap();
        config.apply_file(file);

        assert_eq!(config.port, 8080);
        assert_eq!(config.site_url, "https://pickup.example");
        assert!(config.utc);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn env_layer_overrides_file_and_ignores_bad_numbers() {
        let mut config = Config::defaults();
        config.apply_file(FileConfig { port: Some(8080), ..Default::default() });

        let vars: HashMap<&str, &str> = HashMap::from([
            ("PICKUP_PORT", "not-a-port"),
            ("PICKUP_CACHE_TTL_SECS", "5"),
            ("PICKUP_UTC", "TRUE"),
            ("STRIPE_SECRET_KEY", "sk_test_123"),
        ]);
        config.apply_vars(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_ttl_secs, 5);
        assert!(config.utc);
        assert!(config.stripe_enabled());
        assert!(!config.email_enabled());
    }
}
