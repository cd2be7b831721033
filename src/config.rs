use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub survey: SurveyConfig,
    #[serde(default)]
    pub monobank: MonobankConfig,
    #[serde(default)]
    pub novaposhta: NovaPoshtaConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub facebook: FacebookConfig,
    #[serde(default)]
    pub tiktok: TikTokConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SurveyConfig {
    /// Optional path to a survey definition JSON file. When unset the
    /// compiled-in default definition is used.
    #[serde(default)]
    pub definition_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MonobankConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_monobank_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub redirect_url: String,
    #[serde(default)]
    pub webhook_url: String,
}

fn default_monobank_base_url() -> String {
    "https://api.monobank.ua".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NovaPoshtaConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_novaposhta_base_url")]
    pub base_url: String,
}

fn default_novaposhta_base_url() -> String {
    "https://api.novaposhta.ua/v2.0/json/".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FacebookConfig {
    #[serde(default)]
    pub pixel_id: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_facebook_api_version")]
    pub api_version: String,
}

fn default_facebook_api_version() -> String {
    "v18.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TikTokConfig {
    #[serde(default)]
    pub pixel_code: String,
    #[serde(default)]
    pub access_token: String,
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => toml::from_str(&config_str)
                .map_err(|e| format!("Failed to parse {config_path}: {e}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // No config file: build from environment variables and defaults.
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and no config.toml was found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                        refresh_token_expires_in: get_env_parse(
                            "JWT_REFRESH_EXPIRES_IN",
                            2_592_000i64,
                        ),
                    },
                    survey: SurveyConfig {
                        definition_path: get_env("SURVEY_DEFINITION_PATH"),
                    },
                    monobank: MonobankConfig {
                        token: get_env("MONOBANK_TOKEN").unwrap_or_default(),
                        base_url: get_env("MONOBANK_BASE_URL")
                            .unwrap_or_else(|| default_monobank_base_url()),
                        redirect_url: get_env("MONOBANK_REDIRECT_URL").unwrap_or_default(),
                        webhook_url: get_env("MONOBANK_WEBHOOK_URL").unwrap_or_default(),
                    },
                    novaposhta: NovaPoshtaConfig {
                        api_key: get_env("NOVAPOSHTA_API_KEY").unwrap_or_default(),
                        base_url: get_env("NOVAPOSHTA_BASE_URL")
                            .unwrap_or_else(|| default_novaposhta_base_url()),
                    },
                    telegram: TelegramConfig {
                        bot_token: get_env("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
                        chat_id: get_env("TELEGRAM_CHAT_ID").unwrap_or_default(),
                    },
                    facebook: FacebookConfig {
                        pixel_id: get_env("FACEBOOK_PIXEL_ID").unwrap_or_default(),
                        access_token: get_env("FACEBOOK_ACCESS_TOKEN").unwrap_or_default(),
                        api_version: get_env("FACEBOOK_API_VERSION")
                            .unwrap_or_else(|| default_facebook_api_version()),
                    },
                    tiktok: TikTokConfig {
                        pixel_code: get_env("TIKTOK_PIXEL_CODE").unwrap_or_default(),
                        access_token: get_env("TIKTOK_ACCESS_TOKEN").unwrap_or_default(),
                    },
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // Environment variables win even when the file exists.
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.refresh_token_expires_in = n;
        }
        if let Ok(v) = env::var("SURVEY_DEFINITION_PATH") {
            config.survey.definition_path = Some(v);
        }
        if let Ok(v) = env::var("MONOBANK_TOKEN") {
            config.monobank.token = v;
        }
        if let Ok(v) = env::var("MONOBANK_BASE_URL") {
            config.monobank.base_url = v;
        }
        if let Ok(v) = env::var("MONOBANK_REDIRECT_URL") {
            config.monobank.redirect_url = v;
        }
        if let Ok(v) = env::var("MONOBANK_WEBHOOK_URL") {
            config.monobank.webhook_url = v;
        }
        if let Ok(v) = env::var("NOVAPOSHTA_API_KEY") {
            config.novaposhta.api_key = v;
        }
        if let Ok(v) = env::var("NOVAPOSHTA_BASE_URL") {
            config.novaposhta.base_url = v;
        }
        if let Ok(v) = env::var("TELEGRAM_BOT_TOKEN") {
            config.telegram.bot_token = v;
        }
        if let Ok(v) = env::var("TELEGRAM_CHAT_ID") {
            config.telegram.chat_id = v;
        }
        if let Ok(v) = env::var("FACEBOOK_PIXEL_ID") {
            config.facebook.pixel_id = v;
        }
        if let Ok(v) = env::var("FACEBOOK_ACCESS_TOKEN") {
            config.facebook.access_token = v;
        }
        if let Ok(v) = env::var("FACEBOOK_API_VERSION") {
            config.facebook.api_version = v;
        }
        if let Ok(v) = env::var("TIKTOK_PIXEL_CODE") {
            config.tiktok.pixel_code = v;
        }
        if let Ok(v) = env::var("TIKTOK_ACCESS_TOKEN") {
            config.tiktok.access_token = v;
        }

        Ok(config)
    }
}
