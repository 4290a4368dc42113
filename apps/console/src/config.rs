use std::{fs, io, path::Path};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub console_url: String,
    pub username: Option<String>,
    pub request_timeout_secs: u64,
    pub start_route: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            console_url: "http://127.0.0.1:7351".into(),
            username: None,
            request_timeout_secs: 30,
            start_route: "/metrics".into(),
        }
    }
}

/// Defaults, then `path` if it exists, then environment overrides.
pub fn load_settings(path: &Path) -> anyhow::Result<ConsoleSettings> {
    let settings = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<ConsoleSettings>(&raw)
            .with_context(|| format!("failed to parse console config '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => ConsoleSettings::default(),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read console config '{}'", path.display()))
        }
    };
    Ok(apply_env_overrides(settings, |key| std::env::var(key).ok()))
}

fn apply_env_overrides(
    mut settings: ConsoleSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> ConsoleSettings {
    if let Some(v) = lookup("CONSOLE_URL") {
        settings.console_url = v;
    }
    if let Some(v) = lookup("APP__CONSOLE_URL") {
        settings.console_url = v;
    }

    if let Some(v) = lookup("CONSOLE_USERNAME") {
        settings.username = Some(v);
    }
    if let Some(v) = lookup("APP__CONSOLE_USERNAME") {
        settings.username = Some(v);
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
