//! Configuration loading
//!
//! Defaults, then environment variables (and `.env`), then an optional TOML
//! file. Command-line flags are applied on top by `main`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub mqtt: MqttConfig,
    /// Device id used in the `info/<device>/tx|rx` topics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MqttConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: default_username(),
            password: None,
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive(),
        }
    }
}

fn default_host() -> String {
    "homeassistant.local".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_username() -> String {
    "homeassistant".to_string()
}

fn default_client_id() -> String {
    "s21-monitor".to_string()
}

fn default_keep_alive() -> u64 {
    60
}

/// Column widths of the terminal display
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    #[serde(default = "default_value_width")]
    pub value_width: usize,
    #[serde(default = "default_dump_width")]
    pub dump_width: usize,
    #[serde(default = "default_change_dump_width")]
    pub change_dump_width: usize,
    #[serde(default = "default_rule_width")]
    pub rule_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            value_width: default_value_width(),
            dump_width: default_dump_width(),
            change_dump_width: default_change_dump_width(),
            rule_width: default_rule_width(),
        }
    }
}

fn default_value_width() -> usize {
    18
}

fn default_dump_width() -> usize {
    23
}

fn default_change_dump_width() -> usize {
    35
}

fn default_rule_width() -> usize {
    100
}

impl MonitorConfig {
    /// Build the configuration from the environment, then the optional file
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Ok(env_file) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {:?}", env_file);
        }

        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;

        if let Some(path) = path {
            config = config.merge_file(path)?;
        }

        Ok(config)
    }

    /// Override fields from environment variables
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("MQTT_HOST") {
            self.mqtt.host = host;
        }
        if let Some(port) = lookup("MQTT_PORT") {
            self.mqtt.port = port
                .parse()
                .with_context(|| format!("Invalid MQTT_PORT: {:?}", port))?;
        }
        if let Some(username) = lookup("MQTT_USERNAME") {
            self.mqtt.username = username;
        }
        if let Some(password) = lookup("MQTT_PASSWORD") {
            self.mqtt.password = Some(password);
        }
        if let Some(device_id) = lookup("DEVICE_ID") {
            self.device_id = Some(device_id);
        }
        Ok(())
    }

    /// Layer a TOML file over this configuration
    ///
    /// Keys present in the file win; a missing `device_id` keeps the current one.
    fn merge_file(self, path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut base = toml::Value::try_from(&self)
            .context("Failed to serialize configuration defaults")?;
        let overlay: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        merge_toml(&mut base, overlay);

        let config: MonitorConfig = base
            .try_into()
            .with_context(|| format!("Invalid config file: {:?}", path))?;
        log::debug!("Configuration merged from {:?}", path);
        Ok(config)
    }

    /// The configured device id, or an error if none was given
    pub fn device_id(&self) -> Result<&str> {
        match self.device_id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => bail!("No device id configured (set DEVICE_ID, device_id in the config file, or --device)"),
        }
    }

    pub fn tx_topic(&self) -> Result<String> {
        Ok(format!("info/{}/tx", self.device_id()?))
    }

    pub fn rx_topic(&self) -> Result<String> {
        Ok(format!("info/{}/rx", self.device_id()?))
    }
}

fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.mqtt.host, "homeassistant.local");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.username, "homeassistant");
        assert!(config.mqtt.password.is_none());
        assert_eq!(config.display.rule_width, 100);
        assert!(config.device_id().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("MQTT_HOST", "broker.lan"),
            ("MQTT_PORT", "8883"),
            ("MQTT_PASSWORD", "secret"),
            ("DEVICE_ID", "faikin-42"),
        ]);
        let mut config = MonitorConfig::default();
        config.apply_env(|key| vars.get(key).cloned()).unwrap();

        assert_eq!(config.mqtt.host, "broker.lan");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.username, "homeassistant");
        assert_eq!(config.mqtt.password.as_deref(), Some("secret"));
        assert_eq!(config.tx_topic().unwrap(), "info/faikin-42/tx");
        assert_eq!(config.rx_topic().unwrap(), "info/faikin-42/rx");
    }

    #[test]
    fn test_invalid_port() {
        let vars = env(&[("MQTT_PORT", "not-a-port")]);
        let mut config = MonitorConfig::default();
        assert!(config.apply_env(|key| vars.get(key).cloned()).is_err());
    }

    #[test]
    fn test_file_overrides_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [mqtt]
            host = "10.0.0.5"

            [display]
            value_width = 30
            "#
        )
        .unwrap();

        let vars = env(&[("MQTT_HOST", "broker.lan"), ("DEVICE_ID", "unit1")]);
        let mut config = MonitorConfig::default();
        config.apply_env(|key| vars.get(key).cloned()).unwrap();
        let config = config.merge_file(file.path()).unwrap();

        assert_eq!(config.mqtt.host, "10.0.0.5");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.device_id().unwrap(), "unit1");
        assert_eq!(config.display.value_width, 30);
        assert_eq!(config.display.dump_width, 23);
    }

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            device_id = "abc"

            [mqtt]
            host = "broker"
            port = 1884
        "#;

        let config: MonitorConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.mqtt.host, "broker");
        assert_eq!(config.mqtt.port, 1884);
        assert_eq!(config.mqtt.client_id, "s21-monitor");
        assert_eq!(config.device_id().unwrap(), "abc");
    }
}
