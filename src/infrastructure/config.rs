use crate::domain::DEFAULT_CHECK_INTERVAL_MINUTES;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    /// Postgres URL for the settings table; settings stay in memory when unset.
    pub database_url: Option<String>,

    // Host mail store API
    pub mail_api_url: String,
    pub mail_api_token: String,

    // Monitor defaults
    pub default_interval_minutes: u32,
    pub product_name: String,
    pub badge_color: String,
    pub notification_icon: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("QUOTA_WATCH"))
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", 8080)?
            .set_default("mail_api_url", "http://127.0.0.1:8900/api/v1")?
            .set_default("mail_api_token", "")?
            .set_default("default_interval_minutes", DEFAULT_CHECK_INTERVAL_MINUTES)?
            .set_default("product_name", "Quota Watch")?
            .set_default("badge_color", "#D9534F")?
            .set_default("notification_icon", "icons/quota-warning.svg")?
            .build()?;

        config.try_deserialize()
    }
}
