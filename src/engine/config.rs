use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::info;

use super::MAX_BLOCK_SIZE_DEFAULT;

/// Prefix of the environment variables overriding the configuration, e.g. `MX2482_CHANNELS=16`.
pub const ENV_PREFIX: &str = "MX2482";

const DEFAULT_CHANNELS: u32 = 24;
const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Settings that are fixed for the lifetime of a console.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MixerConfig {
    /// Number of channel strips.
    pub channels: u32,
    /// Biggest block the engine will be asked to process, in frames.
    pub max_block_size: usize,
    /// Preferred sample rate of the audio devices.
    pub sample_rate: u32,
    /// Name of the capture device. The host's default if `None`.
    pub input_device: Option<String>,
    /// Name of the playback device. The host's default if `None`.
    pub output_device: Option<String>,
}
impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            channels: DEFAULT_CHANNELS,
            max_block_size: MAX_BLOCK_SIZE_DEFAULT,
            sample_rate: DEFAULT_SAMPLE_RATE,
            input_device: None,
            output_device: None,
        }
    }
}
impl MixerConfig {
    /// Loads the configuration from `path` (YAML, TOML or JSON, picked by extension) if given,
    /// overlaid with `MX2482_*` environment variables. Missing fields take their default.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize::<MixerConfig>()?;

        config.validate()?;
        info!(?config, "Loaded configuration");
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_block_size == 0 {
            return Err(ConfigError::Invalid("max_block_size must be at least 1"));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid config: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        let config = MixerConfig::default();

        assert_eq!(config.channels, 24);
        assert_eq!(config.max_block_size, 1024);
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.input_device, None);
    }

    #[test]
    fn partial_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "channels: 8\noutput_device: Speakers").unwrap();

        let config = MixerConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.channels, 8);
        assert_eq!(config.output_device.as_deref(), Some("Speakers"));
        assert_eq!(config.max_block_size, 1024);
    }

    #[test]
    fn zero_block_size_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_block_size = 0").unwrap();

        let result = MixerConfig::load(Some(file.path()));

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file() {
        let result = MixerConfig::load(Some(Path::new("does/not/exist.yaml")));

        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
