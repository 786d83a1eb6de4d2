use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub mail: MailSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthSettings {
    /// Assina o par de headers do gateway e nunca aparece em logs
    pub session_secret: String,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_verification_ttl_hours")]
    pub verification_ttl_hours: i64,
    #[serde(default = "default_reset_ttl_minutes")]
    pub reset_ttl_minutes: i64,
    #[serde(default = "default_invitation_ttl_days")]
    pub invitation_ttl_days: i64,
}

fn default_session_ttl_hours() -> i64 {
    72
}

fn default_verification_ttl_hours() -> i64 {
    24
}

fn default_reset_ttl_minutes() -> i64 {
    60
}

fn default_invitation_ttl_days() -> i64 {
    7
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MailSettings {
    pub enabled: bool,
    /// Endpoint HTTP do provedor de e-mail transacional
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub from_address: String,
    pub from_name: String,
    /// Base dos links enviados por e-mail (verificação, reset, convite)
    pub app_base_url: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        // Variáveis de ambiente com nomes consagrados
        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }
        if let Ok(secret) = std::env::var("SESSION_SECRET") {
            builder = builder.set_override("auth.session_secret", secret)?;
        }
        if let Ok(token) = std::env::var("MAIL_API_TOKEN") {
            builder = builder.set_override("mail.api_token", token)?;
        }

        // Overrides com prefixo da aplicação (ZAPCRM__SERVER__PORT etc.)
        builder = builder.add_source(Environment::with_prefix("ZAPCRM").separator("__"));

        let s = builder.build()?;

        s.try_deserialize()
    }
}
