use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_FILENAME: &str = "wavetrack_data.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
}

/// Parameters a sampling session is started with.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Requested gate spacing in seconds. Anything that is not a positive
    /// integer falls back to [`DEFAULT_INTERVAL_SECS`].
    #[serde(default, deserialize_with = "lenient_interval")]
    pub interval: Option<i64>,
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_filename() -> String {
    DEFAULT_FILENAME.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interval: None,
            filename: default_filename(),
            output_dir: default_output_dir(),
        }
    }
}

impl SessionConfig {
    pub fn interval_secs(&self) -> u64 {
        match self.interval {
            Some(secs) if secs > 0 => secs as u64,
            _ => DEFAULT_INTERVAL_SECS,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        let filename = match self.filename.trim() {
            "" => DEFAULT_FILENAME,
            name => name,
        };
        self.output_dir.join(filename)
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }
}

/// Parses a user-typed interval. Unparseable text yields `None`.
pub fn parse_interval(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

fn lenient_interval<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_yaml::Value::Number(n) => n.as_i64(),
        serde_yaml::Value::String(s) => parse_interval(&s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.session.interval_secs(), 5);
        assert_eq!(
            config.session.output_path(),
            Path::new(".").join("wavetrack_data.csv")
        );
    }

    #[test]
    fn reads_session_section() {
        let yaml = r#"
session:
  interval: 10
  filename: drive.csv
  output_dir: /tmp/wavetrack
"#;
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.session.interval_secs(), 10);
        assert_eq!(
            config.session.output_path(),
            PathBuf::from("/tmp/wavetrack/drive.csv")
        );
    }

    #[test]
    fn bad_intervals_fall_back_to_default() {
        for raw in ["0", "-3", "\"soon\"", "2.5", "[1]", "~"] {
            let yaml = format!("session:\n  interval: {}\n", raw);
            let config = Config::from_str(&yaml).unwrap();
            assert_eq!(config.session.interval_secs(), 5, "interval {}", raw);
        }

        let config = Config::from_str("session:\n  interval: \"7\"\n").unwrap();
        assert_eq!(config.session.interval_secs(), 7);
    }

    #[test]
    fn blank_filename_uses_default() {
        let session = SessionConfig {
            filename: "  ".into(),
            ..SessionConfig::default()
        };
        assert!(session.output_path().ends_with(DEFAULT_FILENAME));
    }

    #[test]
    fn parse_interval_is_lenient() {
        assert_eq!(parse_interval(" 12 "), Some(12));
        assert_eq!(parse_interval("-1"), Some(-1));
        assert_eq!(parse_interval("abc"), None);
    }
}
