use crate::domain::models::DueWindow;
use crate::domain::timer::{DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES};
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

const APP_JSON: &str = "app.json";
const API_BASE_URL_KEYS: [&str; 2] = ["FOCUSDESK_API_BASE_URL", "API_BASE_URL"];

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5001/api";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub default_duration_minutes: u32,
    pub toast_lifetime_seconds: u64,
    pub due_check_interval_seconds: u64,
    pub feed_poll_interval_seconds: u64,
    pub inactivity_limit_seconds: u64,
    pub due_window: DueWindow,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            toast_lifetime_seconds: 10,
            due_check_interval_seconds: 60,
            feed_poll_interval_seconds: 60,
            inactivity_limit_seconds: 15 * 60,
            due_window: DueWindow::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), InfraError> {
        Url::parse(&self.api_base_url).map_err(|error| {
            InfraError::InvalidConfig(format!(
                "apiBaseUrl '{}' is not a valid URL: {error}",
                self.api_base_url
            ))
        })?;
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.default_duration_minutes) {
            return Err(InfraError::InvalidConfig(format!(
                "defaultDurationMinutes must be within {MIN_DURATION_MINUTES}..={MAX_DURATION_MINUTES}"
            )));
        }
        if self.toast_lifetime_seconds == 0 {
            return Err(InfraError::InvalidConfig(
                "toastLifetimeSeconds must be > 0".to_string(),
            ));
        }
        if self.due_check_interval_seconds == 0 || self.feed_poll_interval_seconds == 0 {
            return Err(InfraError::InvalidConfig(
                "polling intervals must be > 0".to_string(),
            ));
        }
        if self.inactivity_limit_seconds == 0 {
            return Err(InfraError::InvalidConfig(
                "inactivityLimitSeconds must be > 0".to_string(),
            ));
        }
        self.due_window
            .validate()
            .map_err(InfraError::InvalidConfig)
    }
}

fn default_app_json() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "apiBaseUrl": DEFAULT_API_BASE_URL,
        "defaultDurationMinutes": DEFAULT_DURATION_MINUTES,
        "toastLifetimeSeconds": 10,
        "dueCheckIntervalSeconds": 60,
        "feedPollIntervalSeconds": 60,
        "inactivityLimitSeconds": 900,
        "dueWindow": {
            "minHours": 0.5,
            "maxHours": 1.2
        }
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_json())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config_with_lookup<F>(config_dir: &Path, lookup: F) -> Result<AppConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = read_config(&config_dir.join(APP_JSON))?;
    let mut config: AppConfig = serde_json::from_value(raw)?;
    if let Some(base_url) = optional_lookup_value(&lookup, &API_BASE_URL_KEYS) {
        config.api_base_url = base_url;
    }
    config.validate()?;
    Ok(config)
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}
