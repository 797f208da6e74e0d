use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use pdsdesk_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

struct ConfigField {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    let api_token = config
        .auth
        .api_token
        .as_ref()
        .map(|token| redact_token(token.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    vec![
        ConfigField {
            key_path: "database.url",
            value: config.database.url.clone(),
            env_keys: &["PDSDESK_DATABASE_URL"],
        },
        ConfigField {
            key_path: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["PDSDESK_DATABASE_MAX_CONNECTIONS"],
        },
        ConfigField {
            key_path: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["PDSDESK_DATABASE_TIMEOUT_SECS"],
        },
        ConfigField {
            key_path: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["PDSDESK_SERVER_BIND_ADDRESS"],
        },
        ConfigField {
            key_path: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["PDSDESK_SERVER_PORT"],
        },
        ConfigField {
            key_path: "server.graceful_shutdown_secs",
            value: config.server.graceful_shutdown_secs.to_string(),
            env_keys: &["PDSDESK_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        ConfigField {
            key_path: "auth.api_token",
            value: api_token,
            env_keys: &["PDSDESK_AUTH_API_TOKEN"],
        },
        ConfigField {
            key_path: "routing.default_group_key",
            value: config.routing.default_group_key.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["PDSDESK_ROUTING_DEFAULT_GROUP_KEY"],
        },
        ConfigField {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["PDSDESK_LOGGING_LEVEL", "PDSDESK_LOG_LEVEL"],
        },
        ConfigField {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["PDSDESK_LOGGING_FORMAT", "PDSDESK_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("pdsdesk.toml"), PathBuf::from("config/pdsdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
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

/// Keeps the first four characters so operators can tell tokens apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let prefix: String = trimmed.chars().take(4).collect();
    format!("{prefix}***")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn redaction_keeps_only_a_short_prefix() {
        assert_eq!(redact_token("abcd-very-secret-token"), "abcd***");
        assert_eq!(redact_token("   "), "<empty>");
    }

    #[test]
    fn nested_key_paths_are_detected_in_toml() {
        let doc: toml::Value =
            "[routing]\ndefault_group_key = \"service-desk\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "routing.default_group_key"));
        assert!(!contains_path(&doc, "auth.api_token"));
    }
}
