use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::security::AuthSettings;
use crate::static_config::{StaticConfigItem, STATIC_CONFIG_TABLE};

pub const MAX_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RuntimeMode {
    Production,
    Development,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    values: HashMap<String, String>,
}

impl SystemConfig {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get(key)
            .map(str::to_string)
            .or_else(|| default_value(key))
            .unwrap_or_default()
    }

    pub fn get_number(&self, key: &str) -> i64 {
        self.get(key)
            .and_then(|value| value.parse::<i64>().ok())
            .or_else(|| default_value(key).and_then(|value| value.parse::<i64>().ok()))
            .unwrap_or_default()
    }

    /// Overlays recognised environment variables. Blank values count as unset.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(item) = STATIC_CONFIG_TABLE.iter().find(|item| item.env == name) else {
                continue;
            };
            if value.trim().is_empty() {
                continue;
            }
            check_type(item, &value)?;
            let value = if item.value_type == "number" {
                value.trim().to_string()
            } else {
                value
            };
            self.values.insert(item.key.to_string(), value);
        }
        Ok(())
    }

    pub fn mode(&self) -> Result<RuntimeMode, ConfigError> {
        match self.get_string("runtime.mode").trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(RuntimeMode::Production),
            "development" | "dev" => Ok(RuntimeMode::Development),
            other => Err(ConfigError::InvalidValue(
                "runtime.mode".to_string(),
                other.to_string(),
            )),
        }
    }

    /// Startup check. Secrets never fall back to a default; production also
    /// requires an explicit CORS origin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mode = self.mode()?;
        for key in ["security.token_secret", "admin.username", "admin.password"] {
            self.require(key)?;
        }
        if mode == RuntimeMode::Production {
            self.require("cors.allowed_origin")?;
        }
        let port = self.get_number("server.port");
        if !(1..=65535).contains(&port) {
            return Err(ConfigError::InvalidValue(
                "server.port".to_string(),
                port.to_string(),
            ));
        }
        let ttl = self.get_number("security.token_ttl_seconds");
        if !(1..=MAX_TOKEN_TTL_SECONDS).contains(&ttl) {
            return Err(ConfigError::InvalidValue(
                "security.token_ttl_seconds".to_string(),
                self.get_string("security.token_ttl_seconds"),
            ));
        }
        Ok(())
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            username: self.get_string("admin.username"),
            password: self.get_string("admin.password"),
            signing_secret: self.get_string("security.token_secret"),
            token_ttl: Duration::try_seconds(self.get_number("security.token_ttl_seconds"))
                .unwrap_or(Duration::MAX),
        }
    }

    /// `None` means any origin.
    pub fn allowed_origin(&self) -> Option<String> {
        let origin = self.get_string("cors.allowed_origin");
        let origin = origin.trim();
        (!origin.is_empty() && origin != "*").then(|| origin.to_string())
    }

    pub fn listen_addr(&self) -> String {
        format!(
            "{}:{}",
            self.get_string("server.host"),
            self.get_number("server.port")
        )
    }

    fn require(&self, key: &str) -> Result<(), ConfigError> {
        if self.get_string(key).trim().is_empty() {
            let env = config_item(key).map(|item| item.env).unwrap_or_default();
            return Err(ConfigError::Missing(key.to_string(), env.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("type mismatch for key {0}: expected {1}")]
    TypeMismatch(String, String),
    #[error("missing required config {0} (set {1})")]
    Missing(String, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

pub struct SystemConfigLoader;

impl SystemConfigLoader {
    pub fn from_str(input: &str) -> Result<SystemConfig, ConfigError> {
        let value: toml::Value =
            toml::from_str(input).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let mut values = HashMap::new();
        let mut errors = Vec::new();
        flatten_values(&mut values, String::new(), &value, &mut errors);
        if let Some(err) = errors.into_iter().next() {
            return Err(err);
        }
        Ok(SystemConfig { values })
    }

    /// Table defaults, then the optional TOML file, then the environment.
    pub fn layered<I>(file: Option<&str>, env: I) -> Result<SystemConfig, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = match file {
            Some(content) => Self::from_str(content)?,
            None => SystemConfig::default(),
        };
        config.apply_env(env)?;
        Ok(config)
    }
}

fn flatten_values(
    output: &mut HashMap<String, String>,
    prefix: String,
    value: &toml::Value,
    errors: &mut Vec<ConfigError>,
) {
    match value {
        toml::Value::Table(table) => {
            for (key, nested) in table {
                let new_prefix = if prefix.is_empty() {
                    key.to_string()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_values(output, new_prefix, nested, errors);
            }
        }
        toml::Value::String(value) => {
            insert_checked(output, &prefix, value.to_string(), "string", errors);
        }
        toml::Value::Integer(value) => {
            insert_checked(output, &prefix, value.to_string(), "number", errors);
        }
        _ => {
            errors.push(ConfigError::TypeMismatch(prefix, "string|number".to_string()));
        }
    }
}

fn insert_checked(
    output: &mut HashMap<String, String>,
    key: &str,
    value: String,
    found_type: &str,
    errors: &mut Vec<ConfigError>,
) {
    let Some(item) = config_item(key) else {
        errors.push(ConfigError::UnknownKey(key.to_string()));
        return;
    };
    if item.value_type != found_type {
        errors.push(ConfigError::TypeMismatch(key.to_string(), item.value_type.to_string()));
        return;
    }
    output.insert(key.to_string(), value);
}

fn check_type(item: &StaticConfigItem, value: &str) -> Result<(), ConfigError> {
    if item.value_type == "number" && value.trim().parse::<i64>().is_err() {
        return Err(ConfigError::TypeMismatch(
            item.env.to_string(),
            item.value_type.to_string(),
        ));
    }
    Ok(())
}

fn config_item(key: &str) -> Option<&'static StaticConfigItem> {
    STATIC_CONFIG_TABLE.iter().find(|item| item.key == key)
}

fn default_value(key: &str) -> Option<String> {
    config_item(key).map(|item| item.default_value.to_string())
}
