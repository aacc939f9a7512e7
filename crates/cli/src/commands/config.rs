use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use asesor_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let mut push_line = |key: &str, value: &str, env_keys: &[&str]| {
        lines.push(render_line(
            key,
            value,
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    };

    push_line("database.url", &config.database.url, &["ASESOR_DATABASE_URL"]);
    push_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        &["ASESOR_DATABASE_MAX_CONNECTIONS"],
    );
    push_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        &["ASESOR_DATABASE_TIMEOUT_SECS"],
    );

    push_line("llm.base_url", &config.llm.base_url, &["ASESOR_LLM_BASE_URL"]);
    push_line("llm.model", &config.llm.model, &["ASESOR_LLM_MODEL"]);
    push_line(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        &["ASESOR_LLM_TIMEOUT_SECS"],
    );

    push_line("server.host", &config.server.host, &["ASESOR_SERVER_HOST"]);
    push_line("server.port", &config.server.port.to_string(), &["ASESOR_SERVER_PORT"]);

    push_line(
        "logging.level",
        &config.logging.level,
        &["ASESOR_LOGGING_LEVEL", "ASESOR_LOG_LEVEL"],
    );
    push_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["ASESOR_LOGGING_FORMAT", "ASESOR_LOG_FORMAT"],
    );

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os("ASESOR_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let root = PathBuf::from("asesor.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/asesor.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
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
    for env_key in env_keys {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
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
