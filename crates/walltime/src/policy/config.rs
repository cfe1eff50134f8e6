use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::common::error::WalltimeError;
use crate::common::utils::size::parse_memory_amount;
use crate::common::utils::time::parse_human_time;
use crate::policy::{EstimationPolicy, MemoryPolicy};

#[derive(Deserialize)]
#[serde(untagged)]
enum PrimitiveType {
    Int(u64),
    Float(f64),
    String(String),
}

fn deserialize_human_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<PrimitiveType>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PrimitiveType::Int(seconds)) => Ok(Some(Duration::from_secs(seconds))),
        Some(PrimitiveType::Float(seconds)) => Duration::try_from_secs_f64(seconds)
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(PrimitiveType::String(text)) => parse_human_time(&text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn deserialize_memory_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<PrimitiveType>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PrimitiveType::Int(bytes)) => Ok(Some(bytes)),
        Some(PrimitiveType::Float(bytes)) => Err(serde::de::Error::custom(format!(
            "memory amount {bytes} has to be a whole number of bytes or a string with units"
        ))),
        Some(PrimitiveType::String(text)) => parse_memory_amount(&text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Estimation options as they appear in a configuration file. Durations are given as
/// humantime strings (`"5h"`), `HH:MM:SS` or seconds, memory as `"8GB"` or bytes.
#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
struct ConfigDef {
    #[serde(default, deserialize_with = "deserialize_human_duration_opt")]
    default_time: Option<Duration>,
    time_mult: Option<f64>,
    time_override: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_memory_opt")]
    default_memory: Option<u64>,
    memory_mult: Option<f64>,
    memory_override: Option<bool>,
}

/// Values that take precedence over the configuration file (e.g. from the command line).
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub default_time: Option<Duration>,
    pub time_mult: Option<f64>,
    pub time_override: Option<bool>,
    pub default_memory: Option<u64>,
    pub memory_mult: Option<f64>,
    pub memory_override: Option<bool>,
}

/// Run-wide estimation configuration. Loaded once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EstimatorConfig {
    pub time: EstimationPolicy,
    pub memory: MemoryPolicy,
}

impl EstimatorConfig {
    pub fn load(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded configuration from {}: {config:?}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> crate::Result<Self> {
        let def: ConfigDef = toml::from_str(text)?;
        EstimatorConfig::default().apply(ConfigOverrides {
            default_time: def.default_time,
            time_mult: def.time_mult,
            time_override: def.time_override,
            default_memory: def.default_memory,
            memory_mult: def.memory_mult,
            memory_override: def.memory_override,
        })
    }

    /// Replaces the values that are set in `overrides` and validates the result.
    pub fn apply(mut self, overrides: ConfigOverrides) -> crate::Result<Self> {
        let ConfigOverrides {
            default_time,
            time_mult,
            time_override,
            default_memory,
            memory_mult,
            memory_override,
        } = overrides;

        if let Some(default_time) = default_time {
            self.time.default_time = default_time;
        }
        if let Some(time_mult) = time_mult {
            self.time.time_mult = time_mult;
        }
        if let Some(time_override) = time_override {
            self.time.time_override = time_override;
        }
        if let Some(default_memory) = default_memory {
            self.memory.default_memory = default_memory;
        }
        if let Some(memory_mult) = memory_mult {
            self.memory.memory_mult = memory_mult;
        }
        if let Some(memory_override) = memory_override {
            self.memory.memory_override = memory_override;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.time.default_time.is_zero() {
            return Err(WalltimeError::ConfigError(
                "`default_time` has to be greater than zero".to_string(),
            ));
        }
        check_multiplier("time_mult", self.time.time_mult)?;
        if self.memory.default_memory == 0 {
            return Err(WalltimeError::ConfigError(
                "`default_memory` has to be greater than zero".to_string(),
            ));
        }
        check_multiplier("memory_mult", self.memory.memory_mult)
    }
}

fn check_multiplier(name: &str, value: f64) -> crate::Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(WalltimeError::ConfigError(format!(
            "`{name}` has to be a positive number, not {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::{ConfigOverrides, EstimatorConfig};
    use crate::common::error::WalltimeError;

    #[test]
    fn empty_config_has_defaults() {
        let config = EstimatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, EstimatorConfig::default());
        assert_eq!(config.time.default_time, Duration::from_secs(7200));
        assert_eq!(config.time.time_mult, 3.0);
        assert!(!config.time.time_override);
    }

    #[test]
    fn parse_all_keys() {
        let config = EstimatorConfig::from_toml_str(
            r#"
default_time = "5h"
time_mult = 1.5
time_override = true
default_memory = "16GB"
memory_mult = 1.25
memory_override = true
"#,
        )
        .unwrap();
        assert_eq!(config.time.default_time, Duration::from_secs(5 * 3600));
        assert_eq!(config.time.time_mult, 1.5);
        assert!(config.time.time_override);
        assert_eq!(config.memory.default_memory, 16 * 1024 * 1024 * 1024);
        assert_eq!(config.memory.memory_mult, 1.25);
        assert!(config.memory.memory_override);
    }

    #[test]
    fn parse_numeric_values() {
        let config = EstimatorConfig::from_toml_str(
            "default_time = 3600\ntime_mult = 2\ndefault_memory = 1024\n",
        )
        .unwrap();
        assert_eq!(config.time.default_time, Duration::from_secs(3600));
        assert_eq!(config.time.time_mult, 2.0);
        assert_eq!(config.memory.default_memory, 1024);
    }

    #[test]
    fn parse_hms_default_time() {
        let config = EstimatorConfig::from_toml_str("default_time = \"02:30:00\"").unwrap();
        assert_eq!(config.time.default_time, Duration::from_secs(9000));
    }

    #[test]
    fn reject_unknown_key() {
        assert!(matches!(
            EstimatorConfig::from_toml_str("time_multiplier = 2"),
            Err(WalltimeError::ConfigError(_))
        ));
    }

    #[test]
    fn reject_invalid_duration() {
        assert!(matches!(
            EstimatorConfig::from_toml_str("default_time = \"soon\""),
            Err(WalltimeError::ConfigError(_))
        ));
    }

    #[test]
    fn reject_invalid_multiplier() {
        for text in ["time_mult = 0", "time_mult = -1.5", "memory_mult = 0.0"] {
            assert!(matches!(
                EstimatorConfig::from_toml_str(text),
                Err(WalltimeError::ConfigError(_))
            ));
        }
    }

    #[test]
    fn reject_zero_default() {
        assert!(EstimatorConfig::from_toml_str("default_time = \"0s\"").is_err());
        assert!(EstimatorConfig::from_toml_str("default_memory = 0").is_err());
    }

    #[test]
    fn overrides_take_precedence() {
        let config = EstimatorConfig::from_toml_str("default_time = \"5h\"\ntime_mult = 2")
            .unwrap()
            .apply(ConfigOverrides {
                time_mult: Some(4.0),
                time_override: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.time.default_time, Duration::from_secs(5 * 3600));
        assert_eq!(config.time.time_mult, 4.0);
        assert!(config.time.time_override);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let result = EstimatorConfig::default().apply(ConfigOverrides {
            memory_mult: Some(f64::NAN),
            ..Default::default()
        });
        assert!(matches!(result, Err(WalltimeError::ConfigError(_))));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_time = \"1h\"").unwrap();
        file.flush().unwrap();
        let config = EstimatorConfig::load(file.path()).unwrap();
        assert_eq!(config.time.default_time, Duration::from_secs(3600));
    }
}
