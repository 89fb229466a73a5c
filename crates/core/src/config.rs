use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["munchbot.toml", "config/munchbot.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub workspace: WorkspaceConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
    pub conversation: ConversationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct WorkspaceConfig {
    pub app_id: String,
    pub app_secret: SecretString,
    pub webhook_secret: SecretString,
    pub api_base_url: String,
    pub message_title: String,
    pub message_color: String,
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub api_base_url: String,
    pub term: String,
    pub limit: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct ConversationConfig {
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub workspace_app_id: Option<String>,
    pub workspace_app_secret: Option<String>,
    pub workspace_webhook_secret: Option<String>,
    pub workspace_api_base_url: Option<String>,
    pub search_client_id: Option<String>,
    pub search_client_secret: Option<String>,
    pub search_api_base_url: Option<String>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: WorkspaceConfig {
                app_id: String::new(),
                app_secret: String::new().into(),
                webhook_secret: String::new().into(),
                api_base_url: "https://api.watsonwork.ibm.com".to_string(),
                message_title: "Restaurant Finder".to_string(),
                message_color: "#D74108".to_string(),
            },
            search: SearchConfig {
                client_id: String::new(),
                client_secret: String::new().into(),
                api_base_url: "https://api.yelp.com".to_string(),
                term: "food".to_string(),
                limit: 5,
            },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 3000 },
            conversation: ConversationConfig { idle_timeout_secs: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(workspace) = patch.workspace {
            if let Some(app_id) = workspace.app_id {
                self.workspace.app_id = app_id;
            }
            if let Some(app_secret) = workspace.app_secret {
                self.workspace.app_secret = secret_value(app_secret);
            }
            if let Some(webhook_secret) = workspace.webhook_secret {
                self.workspace.webhook_secret = secret_value(webhook_secret);
            }
            if let Some(api_base_url) = workspace.api_base_url {
                self.workspace.api_base_url = api_base_url;
            }
            if let Some(message_title) = workspace.message_title {
                self.workspace.message_title = message_title;
            }
            if let Some(message_color) = workspace.message_color {
                self.workspace.message_color = message_color;
            }
        }

        if let Some(search) = patch.search {
            if let Some(client_id) = search.client_id {
                self.search.client_id = client_id;
            }
            if let Some(client_secret) = search.client_secret {
                self.search.client_secret = secret_value(client_secret);
            }
            if let Some(api_base_url) = search.api_base_url {
                self.search.api_base_url = api_base_url;
            }
            if let Some(term) = search.term {
                self.search.term = term;
            }
            if let Some(limit) = search.limit {
                self.search.limit = limit;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(conversation) = patch.conversation {
            if let Some(idle_timeout_secs) = conversation.idle_timeout_secs {
                self.conversation.idle_timeout_secs = Some(idle_timeout_secs);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("MUNCHBOT_WORKSPACE_APP_ID").or_else(|| read_env("APP_ID")) {
            self.workspace.app_id = value;
        }
        let app_secret =
            read_env("MUNCHBOT_WORKSPACE_APP_SECRET").or_else(|| read_env("APP_SECRET"));
        if let Some(value) = app_secret {
            self.workspace.app_secret = secret_value(value);
        }
        let webhook_secret =
            read_env("MUNCHBOT_WORKSPACE_WEBHOOK_SECRET").or_else(|| read_env("WEBHOOK_SECRET"));
        if let Some(value) = webhook_secret {
            self.workspace.webhook_secret = secret_value(value);
        }
        if let Some(value) = read_env("MUNCHBOT_WORKSPACE_API_BASE_URL") {
            self.workspace.api_base_url = value;
        }
        if let Some(value) = read_env("MUNCHBOT_WORKSPACE_MESSAGE_TITLE") {
            self.workspace.message_title = value;
        }
        if let Some(value) = read_env("MUNCHBOT_WORKSPACE_MESSAGE_COLOR") {
            self.workspace.message_color = value;
        }

        let client_id =
            read_env("MUNCHBOT_SEARCH_CLIENT_ID").or_else(|| read_env("YELP_CLIENT_ID"));
        if let Some(value) = client_id {
            self.search.client_id = value;
        }
        let client_secret =
            read_env("MUNCHBOT_SEARCH_CLIENT_SECRET").or_else(|| read_env("YELP_CLIENT_SECRET"));
        if let Some(value) = client_secret {
            self.search.client_secret = secret_value(value);
        }
        if let Some(value) = read_env("MUNCHBOT_SEARCH_API_BASE_URL") {
            self.search.api_base_url = value;
        }
        if let Some(value) = read_env("MUNCHBOT_SEARCH_TERM") {
            self.search.term = value;
        }
        if let Some(value) = read_env("MUNCHBOT_SEARCH_LIMIT") {
            self.search.limit = parse_u32("MUNCHBOT_SEARCH_LIMIT", &value)?;
        }

        if let Some(value) = read_env("MUNCHBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("MUNCHBOT_SERVER_PORT") {
            self.server.port = parse_u16("MUNCHBOT_SERVER_PORT", &value)?;
        } else if let Some(value) = read_env("PORT") {
            self.server.port = parse_u16("PORT", &value)?;
        }

        if let Some(value) = read_env("MUNCHBOT_CONVERSATION_IDLE_TIMEOUT_SECS") {
            self.conversation.idle_timeout_secs =
                Some(parse_u64("MUNCHBOT_CONVERSATION_IDLE_TIMEOUT_SECS", &value)?);
        }

        let log_level =
            read_env("MUNCHBOT_LOGGING_LEVEL").or_else(|| read_env("MUNCHBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MUNCHBOT_LOGGING_FORMAT").or_else(|| read_env("MUNCHBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(app_id) = overrides.workspace_app_id {
            self.workspace.app_id = app_id;
        }
        if let Some(app_secret) = overrides.workspace_app_secret {
            self.workspace.app_secret = secret_value(app_secret);
        }
        if let Some(webhook_secret) = overrides.workspace_webhook_secret {
            self.workspace.webhook_secret = secret_value(webhook_secret);
        }
        if let Some(api_base_url) = overrides.workspace_api_base_url {
            self.workspace.api_base_url = api_base_url;
        }
        if let Some(client_id) = overrides.search_client_id {
            self.search.client_id = client_id;
        }
        if let Some(client_secret) = overrides.search_client_secret {
            self.search.client_secret = secret_value(client_secret);
        }
        if let Some(api_base_url) = overrides.search_api_base_url {
            self.search.api_base_url = api_base_url;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_workspace(&self.workspace)?;
        validate_search(&self.search)?;
        validate_server(&self.server)?;
        validate_conversation(&self.conversation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// First existing config file, either the explicit path or one of the default candidates.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_workspace(workspace: &WorkspaceConfig) -> Result<(), ConfigError> {
    if workspace.app_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "workspace.app_id is required (set MUNCHBOT_WORKSPACE_APP_ID or APP_ID)".to_string(),
        ));
    }
    if workspace.app_secret.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "workspace.app_secret is required (set MUNCHBOT_WORKSPACE_APP_SECRET or APP_SECRET)"
                .to_string(),
        ));
    }
    if workspace.webhook_secret.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "workspace.webhook_secret is required (set MUNCHBOT_WORKSPACE_WEBHOOK_SECRET or WEBHOOK_SECRET)"
                .to_string(),
        ));
    }
    validate_base_url("workspace.api_base_url", &workspace.api_base_url)?;

    let color = workspace.message_color.trim();
    let is_hex_color = color.len() == 7
        && color.starts_with('#')
        && color.chars().skip(1).all(|ch| ch.is_ascii_hexdigit());
    if !is_hex_color {
        return Err(ConfigError::Validation(
            "workspace.message_color must be a `#RRGGBB` hex color".to_string(),
        ));
    }

    Ok(())
}

fn validate_search(search: &SearchConfig) -> Result<(), ConfigError> {
    if search.client_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "search.client_id is required (set MUNCHBOT_SEARCH_CLIENT_ID or YELP_CLIENT_ID)"
                .to_string(),
        ));
    }
    if search.client_secret.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "search.client_secret is required (set MUNCHBOT_SEARCH_CLIENT_SECRET or YELP_CLIENT_SECRET)"
                .to_string(),
        ));
    }
    validate_base_url("search.api_base_url", &search.api_base_url)?;

    if search.term.trim().is_empty() {
        return Err(ConfigError::Validation("search.term must not be empty".to_string()));
    }
    if search.limit == 0 || search.limit > 50 {
        return Err(ConfigError::Validation("search.limit must be in range 1..=50".to_string()));
    }

    Ok(())
}

fn validate_base_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_conversation(conversation: &ConversationConfig) -> Result<(), ConfigError> {
    if conversation.idle_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "conversation.idle_timeout_secs must be greater than zero when set".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    workspace: Option<WorkspacePatch>,
    search: Option<SearchPatch>,
    server: Option<ServerPatch>,
    conversation: Option<ConversationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkspacePatch {
    app_id: Option<String>,
    app_secret: Option<String>,
    webhook_secret: Option<String>,
    api_base_url: Option<String>,
    message_title: Option<String>,
    message_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    client_id: Option<String>,
    client_secret: Option<String>,
    api_base_url: Option<String>,
    term: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct ConversationPatch {
    idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

/// Every environment variable `AppConfig::load` reads, for tests and operator tooling.
pub const ENV_KEYS: [&str; 24] = [
    "MUNCHBOT_WORKSPACE_APP_ID",
    "APP_ID",
    "MUNCHBOT_WORKSPACE_APP_SECRET",
    "APP_SECRET",
    "MUNCHBOT_WORKSPACE_WEBHOOK_SECRET",
    "WEBHOOK_SECRET",
    "MUNCHBOT_WORKSPACE_API_BASE_URL",
    "MUNCHBOT_WORKSPACE_MESSAGE_TITLE",
    "MUNCHBOT_WORKSPACE_MESSAGE_COLOR",
    "MUNCHBOT_SEARCH_CLIENT_ID",
    "YELP_CLIENT_ID",
    "MUNCHBOT_SEARCH_CLIENT_SECRET",
    "YELP_CLIENT_SECRET",
    "MUNCHBOT_SEARCH_API_BASE_URL",
    "MUNCHBOT_SEARCH_TERM",
    "MUNCHBOT_SEARCH_LIMIT",
    "MUNCHBOT_SERVER_BIND_ADDRESS",
    "MUNCHBOT_SERVER_PORT",
    "PORT",
    "MUNCHBOT_CONVERSATION_IDLE_TIMEOUT_SECS",
    "MUNCHBOT_LOGGING_LEVEL",
    "MUNCHBOT_LOG_LEVEL",
    "MUNCHBOT_LOGGING_FORMAT",
    "MUNCHBOT_LOG_FORMAT",
];
