//! `askportal set` and `askportal unset`.
//!
//! Each configuration key has a setter, an unsetter and a formatter, listed in
//! [`SETTINGS`].

use std::fmt;
use std::path::PathBuf;

use crate::core::config::data::path_display;
use crate::core::config::Config;

#[derive(Debug)]
pub enum SettingError {
    UnknownKey(String),
    InvalidBoolean(String),
    InvalidNumber(String),
    MissingValue { key: &'static str, example: &'static str },
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(f, "Unknown config key: {key}"),
            SettingError::InvalidBoolean(input) => {
                write!(f, "Invalid boolean value: {input} (use on or off)")
            }
            SettingError::InvalidNumber(input) => write!(f, "Invalid number: {input}"),
            SettingError::MissingValue { key, example } => {
                write!(f, "{key} needs a value, e.g. askportal set {key} {example}")
            }
        }
    }
}

impl std::error::Error for SettingError {}

pub struct Setting {
    pub key: &'static str,
    example: &'static str,
    set: fn(&mut Config, &str) -> Result<(), SettingError>,
    unset: fn(&mut Config),
    format: fn(&Config) -> String,
}

pub const SETTINGS: &[Setting] = &[
    Setting {
        key: "server-url",
        example: "https://ask.example.org",
        set: |config, value| {
            config.server_url = Some(value.to_string());
            Ok(())
        },
        unset: |config| config.server_url = None,
        format: |config| config.server_url().to_string(),
    },
    Setting {
        key: "model",
        example: "gpt-4o",
        set: |config, value| {
            config.model = Some(value.to_string());
            Ok(())
        },
        unset: |config| config.model = None,
        format: |config| config.model.clone().unwrap_or_else(|| "(server default)".into()),
    },
    Setting {
        key: "reconnect-delay-ms",
        example: "2000",
        set: |config, value| {
            let delay = value
                .parse::<u64>()
                .map_err(|_| SettingError::InvalidNumber(value.to_string()))?;
            config.reconnect_delay_ms = Some(delay);
            Ok(())
        },
        unset: |config| config.reconnect_delay_ms = None,
        format: |config| config.reconnect_delay().as_millis().to_string(),
    },
    Setting {
        key: "download-prefix",
        example: "/api/download/",
        set: |config, value| {
            config.download_prefix = Some(value.to_string());
            Ok(())
        },
        unset: |config| config.download_prefix = None,
        format: |config| config.download_prefix().to_string(),
    },
    Setting {
        key: "syntax",
        example: "off",
        set: |config, value| {
            config.syntax_highlighting = Some(parse_bool(value)?);
            Ok(())
        },
        unset: |config| config.syntax_highlighting = None,
        format: |config| on_off(config.syntax_highlighting()).to_string(),
    },
    Setting {
        key: "history-path",
        example: "~/askportal-history",
        set: |config, value| {
            config.history_path = Some(PathBuf::from(value));
            Ok(())
        },
        unset: |config| config.history_path = None,
        format: |config| {
            config
                .history_dir()
                .map(path_display)
                .unwrap_or_else(|| "(unavailable)".into())
        },
    },
];

fn find_setting(key: &str) -> Result<&'static Setting, SettingError> {
    SETTINGS
        .iter()
        .find(|setting| setting.key == key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))
}

fn parse_bool(input: &str) -> Result<bool, SettingError> {
    match input.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(SettingError::InvalidBoolean(input.to_string())),
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Applies `key = value` to `config` and returns a confirmation line.
pub fn set(config: &mut Config, key: &str, value: &[String]) -> Result<String, SettingError> {
    let setting = find_setting(key)?;
    let value = value.join(" ");
    let value = value.trim();
    if value.is_empty() {
        return Err(SettingError::MissingValue {
            key: setting.key,
            example: setting.example,
        });
    }
    (setting.set)(config, value)?;
    Ok(format!("Set {} to: {}", setting.key, (setting.format)(config)))
}

pub fn unset(config: &mut Config, key: &str) -> Result<String, SettingError> {
    let setting = find_setting(key)?;
    (setting.unset)(config);
    Ok(format!(
        "Unset {} (now {})",
        setting.key,
        (setting.format)(config)
    ))
}

/// Every key with its effective value.
pub fn describe(config: &Config) -> String {
    SETTINGS
        .iter()
        .map(|setting| format!("  {:<20} {}", setting.key, (setting.format)(config)))
        .collect::<Vec<_>>()
        .join("\n")
}
