use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use studioflow_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field<'a> {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: &'a str,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let max_connections = config.storage.max_connections.to_string();
    let timeout_secs = config.storage.timeout_secs.to_string();
    let fields = [
        Field {
            key_path: "storage.url",
            env_keys: &["STUDIOFLOW_STORAGE_URL"],
            value: &config.storage.url,
        },
        Field {
            key_path: "storage.max_connections",
            env_keys: &["STUDIOFLOW_STORAGE_MAX_CONNECTIONS"],
            value: &max_connections,
        },
        Field {
            key_path: "storage.timeout_secs",
            env_keys: &["STUDIOFLOW_STORAGE_TIMEOUT_SECS"],
            value: &timeout_secs,
        },
        Field {
            key_path: "approvals.avatar_base_url",
            env_keys: &["STUDIOFLOW_APPROVALS_AVATAR_BASE_URL"],
            value: &config.approvals.avatar_base_url,
        },
        Field {
            key_path: "logging.level",
            env_keys: &["STUDIOFLOW_LOGGING_LEVEL", "STUDIOFLOW_LOG_LEVEL"],
            value: &config.logging.level,
        },
        Field {
            key_path: "logging.format",
            env_keys: &["STUDIOFLOW_LOGGING_FORMAT", "STUDIOFLOW_LOG_FORMAT"],
            value: config.logging.format.as_str(),
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|field| {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        format!("- {} = {} (source: {source})", field.key_path, field.value)
    }));
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("studioflow.toml"), PathBuf::from("config/studioflow.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
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

    if config_file_doc.is_some_and(|doc| contains_path(doc, key_path)) {
        let file_path = config_file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
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
