use std::env;
use std::fs;
use std::path::Path;

use munchbot_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use crate::commands::CommandResult;

struct FieldLine {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure("config", error),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult::text(lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<FieldLine> {
    vec![
        FieldLine {
            key: "workspace.app_id",
            value: config.workspace.app_id.clone(),
            env_keys: &["MUNCHBOT_WORKSPACE_APP_ID", "APP_ID"],
        },
        FieldLine {
            key: "workspace.app_secret",
            value: redact_secret(&config.workspace.app_secret),
            env_keys: &["MUNCHBOT_WORKSPACE_APP_SECRET", "APP_SECRET"],
        },
        FieldLine {
            key: "workspace.webhook_secret",
            value: redact_secret(&config.workspace.webhook_secret),
            env_keys: &["MUNCHBOT_WORKSPACE_WEBHOOK_SECRET", "WEBHOOK_SECRET"],
        },
        FieldLine {
            key: "workspace.api_base_url",
            value: config.workspace.api_base_url.clone(),
            env_keys: &["MUNCHBOT_WORKSPACE_API_BASE_URL"],
        },
        FieldLine {
            key: "workspace.message_title",
            value: config.workspace.message_title.clone(),
            env_keys: &["MUNCHBOT_WORKSPACE_MESSAGE_TITLE"],
        },
        FieldLine {
            key: "workspace.message_color",
            value: config.workspace.message_color.clone(),
            env_keys: &["MUNCHBOT_WORKSPACE_MESSAGE_COLOR"],
        },
        FieldLine {
            key: "search.client_id",
            value: config.search.client_id.clone(),
            env_keys: &["MUNCHBOT_SEARCH_CLIENT_ID", "YELP_CLIENT_ID"],
        },
        FieldLine {
            key: "search.client_secret",
            value: redact_secret(&config.search.client_secret),
            env_keys: &["MUNCHBOT_SEARCH_CLIENT_SECRET", "YELP_CLIENT_SECRET"],
        },
        FieldLine {
            key: "search.api_base_url",
            value: config.search.api_base_url.clone(),
            env_keys: &["MUNCHBOT_SEARCH_API_BASE_URL"],
        },
        FieldLine {
            key: "search.term",
            value: config.search.term.clone(),
            env_keys: &["MUNCHBOT_SEARCH_TERM"],
        },
        FieldLine {
            key: "search.limit",
            value: config.search.limit.to_string(),
            env_keys: &["MUNCHBOT_SEARCH_LIMIT"],
        },
        FieldLine {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["MUNCHBOT_SERVER_BIND_ADDRESS"],
        },
        FieldLine {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["MUNCHBOT_SERVER_PORT", "PORT"],
        },
        FieldLine {
            key: "conversation.idle_timeout_secs",
            value: config
                .conversation
                .idle_timeout_secs
                .map(|secs| secs.to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["MUNCHBOT_CONVERSATION_IDLE_TIMEOUT_SECS"],
        },
        FieldLine {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["MUNCHBOT_LOGGING_LEVEL", "MUNCHBOT_LOG_LEVEL"],
        },
        FieldLine {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["MUNCHBOT_LOGGING_FORMAT", "MUNCHBOT_LOG_FORMAT"],
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: &SecretString) -> String {
    if secret.expose_secret().trim().is_empty() {
        return "<empty>".to_string();
    }
    "<redacted>".to_string()
}
