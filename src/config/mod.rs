use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::retry::RetryPolicy;
use crate::stages::{LengthUnit, Platform};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text-completion service settings
    pub completion: CompletionConfig,

    /// Retry policy for every completion call
    pub retry: RetryPolicy,

    /// Window sizes for the chunked stages
    pub chunking: ChunkingConfig,

    /// Per-platform limits and topic quotas
    pub platforms: PlatformsConfig,

    /// Length enforcement settings
    pub length: LengthConfig,

    /// Fan-out and deadline settings
    pub pipeline: PipelineConfig,

    /// Report output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL of an OpenAI-compatible API
    pub endpoint: String,

    /// Model name sent with every request
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

/// A sliding window, measured in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub size: usize,
    pub overlap: usize,
}

impl WindowConfig {
    pub const fn new(size: usize, overlap: usize) -> Self {
        Self { size, overlap }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Windows the raw transcript is refined in
    pub refine: WindowConfig,

    /// Windows topics are derived from
    pub topics: WindowConfig,

    /// Only this many leading windows are used for topic derivation
    pub max_topic_windows: usize,

    /// Context windows for drafting, per platform
    pub draft: DraftWindows,

    /// Number of relevant windows passed to a draft
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftWindows {
    pub long_form: WindowConfig,
    pub micro_professional: WindowConfig,
    pub micro_social: WindowConfig,
}

impl DraftWindows {
    pub fn window(&self, platform: Platform) -> &WindowConfig {
        match platform {
            Platform::LongForm => &self.long_form,
            Platform::MicroProfessional => &self.micro_professional,
            Platform::MicroSocial => &self.micro_social,
        }
    }
}

/// A platform given in YAML only needs the keys it changes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformsConfig {
    #[serde(deserialize_with = "long_form_spec")]
    pub long_form: PlatformSpec,
    #[serde(deserialize_with = "micro_professional_spec")]
    pub micro_professional: PlatformSpec,
    #[serde(deserialize_with = "micro_social_spec")]
    pub micro_social: PlatformSpec,
}

impl PlatformsConfig {
    pub fn spec(&self, platform: Platform) -> &PlatformSpec {
        match platform {
            Platform::LongForm => &self.long_form,
            Platform::MicroProfessional => &self.micro_professional,
            Platform::MicroSocial => &self.micro_social,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSpec {
    /// Maximum length of a post, in `unit`
    pub limit: usize,

    pub unit: LengthUnit,

    /// Maximum number of topics kept for the platform
    pub quota: usize,
}

impl PlatformSpec {
    pub const LONG_FORM: Self = Self {
        limit: 500,
        unit: LengthUnit::Words,
        quota: 1,
    };

    pub const MICRO_PROFESSIONAL: Self = Self {
        limit: 100,
        unit: LengthUnit::Words,
        quota: 2,
    };

    pub const MICRO_SOCIAL: Self = Self {
        limit: 280,
        unit: LengthUnit::Chars,
        quota: 5,
    };
}

#[derive(Deserialize)]
struct PlatformSpecPatch {
    limit: Option<usize>,
    unit: Option<LengthUnit>,
    quota: Option<usize>,
}

impl PlatformSpecPatch {
    fn apply(self, base: PlatformSpec) -> PlatformSpec {
        PlatformSpec {
            limit: self.limit.unwrap_or(base.limit),
            unit: self.unit.unwrap_or(base.unit),
            quota: self.quota.unwrap_or(base.quota),
        }
    }
}

fn long_form_spec<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<PlatformSpec, D::Error> {
    Ok(PlatformSpecPatch::deserialize(d)?.apply(PlatformSpec::LONG_FORM))
}

fn micro_professional_spec<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<PlatformSpec, D::Error> {
    Ok(PlatformSpecPatch::deserialize(d)?.apply(PlatformSpec::MICRO_PROFESSIONAL))
}

fn micro_social_spec<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<PlatformSpec, D::Error> {
    Ok(PlatformSpecPatch::deserialize(d)?.apply(PlatformSpec::MICRO_SOCIAL))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthConfig {
    /// Share of the limit an over-long post may exceed it by and still be trimmed
    /// rather than truncated
    pub tolerance_ratio: f64,

    /// Appended to hard-truncated content
    pub continuation_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of draft/edit units in flight
    pub concurrency: usize,

    /// Wall-clock budget for a whole run, in seconds
    pub run_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory reports are written to when no explicit path is given
    pub output_dir: Option<PathBuf>,

    /// Default report format
    pub format: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            request_timeout_secs: 120,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            refine: WindowConfig::new(6000, 200),
            topics: WindowConfig::new(4000, 200),
            max_topic_windows: 3,
            draft: DraftWindows::default(),
            top_k: 3,
        }
    }
}

impl Default for DraftWindows {
    fn default() -> Self {
        Self {
            long_form: WindowConfig::new(3000, 100),
            micro_professional: WindowConfig::new(2000, 100),
            micro_social: WindowConfig::new(1000, 100),
        }
    }
}

impl Default for PlatformsConfig {
    fn default() -> Self {
        Self {
            long_form: PlatformSpec::LONG_FORM,
            micro_professional: PlatformSpec::MICRO_PROFESSIONAL,
            micro_social: PlatformSpec::MICRO_SOCIAL,
        }
    }
}

impl Default for LengthConfig {
    fn default() -> Self {
        Self {
            tolerance_ratio: 0.1,
            continuation_marker: "...".to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            run_timeout_secs: 900,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Load configuration from file without creating one
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs_err::read_to_string(&config_path).context("Failed to read config file")?;
        let config = Self::from_yaml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document; missing sections and keys take their defaults
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("repurposer").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let windows = [
            ("chunking.refine", &self.chunking.refine),
            ("chunking.topics", &self.chunking.topics),
            ("chunking.draft.long_form", &self.chunking.draft.long_form),
            (
                "chunking.draft.micro_professional",
                &self.chunking.draft.micro_professional,
            ),
            ("chunking.draft.micro_social", &self.chunking.draft.micro_social),
        ];
        for (name, window) in windows {
            if window.size == 0 || window.size <= window.overlap {
                anyhow::bail!(
                    "{}: window size ({}) must be greater than its overlap ({})",
                    name,
                    window.size,
                    window.overlap
                );
            }
        }

        if self.chunking.top_k == 0 {
            anyhow::bail!("chunking.top_k must be at least 1");
        }

        for platform in Platform::ALL {
            if self.platforms.spec(platform).limit == 0 {
                anyhow::bail!("platforms.{}: limit must be greater than zero", platform);
            }
        }

        if self.retry.max_retries == 0 {
            anyhow::bail!("retry.max_retries must allow at least one attempt");
        }

        if !(0.0..=1.0).contains(&self.length.tolerance_ratio) {
            anyhow::bail!("length.tolerance_ratio must be between 0 and 1");
        }

        if self.pipeline.concurrency == 0 {
            anyhow::bail!("pipeline.concurrency must be at least 1");
        }

        if self.pipeline.run_timeout_secs == 0 {
            anyhow::bail!("pipeline.run_timeout_secs must be greater than zero");
        }

        url::Url::parse(&self.completion.endpoint)
            .with_context(|| format!("Invalid completion endpoint: {}", self.completion.endpoint))?;

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Endpoint: {}", self.completion.endpoint);
        println!("  Model: {}", self.completion.model);
        println!("  API key variable: {}", self.completion.api_key_env);
        println!(
            "  Retries: {} attempts, starting at {:?}",
            self.retry.max_retries, self.retry.initial_wait
        );
        for platform in Platform::ALL {
            let spec = self.platforms.spec(platform);
            println!(
                "  {}: up to {} {:?}, {} topic(s)",
                platform.display_name(),
                spec.limit,
                spec.unit,
                spec.quota
            );
        }
        println!("  Concurrency: {}", self.pipeline.concurrency);
        println!("  Run timeout: {}s", self.pipeline.run_timeout_secs);
        if let Some(dir) = &self.output.output_dir {
            println!("  Output directory: {}", dir.display());
        }
        println!("  Default Format: {}", self.output.format);
    }

    /// Fast-failing configuration for unit tests
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            retry: RetryPolicy::new(2, std::time::Duration::from_millis(1)),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.platforms.spec(Platform::MicroSocial).limit, 280);
        assert_eq!(config.platforms.spec(Platform::MicroProfessional).quota, 2);
        assert_eq!(config.chunking.draft.window(Platform::LongForm).size, 3000);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
retry:
  max_retries: 5
  initial_wait_ms: 250
pipeline:
  concurrency: 8
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_wait.as_millis(), 250);
        assert_eq!(config.pipeline.concurrency, 8);
        assert_eq!(config.pipeline.run_timeout_secs, 900);
        assert_eq!(config.chunking.refine.size, 6000);
    }

    #[test]
    fn test_single_platform_override_keeps_other_platforms() {
        let yaml = r#"
platforms:
  micro_social:
    limit: 200
    quota: 3
chunking:
  draft:
    long_form:
      size: 4000
      overlap: 200
"#;
        let config = Config::from_yaml(yaml).unwrap();

        let social = config.platforms.spec(Platform::MicroSocial);
        assert_eq!(social.limit, 200);
        assert_eq!(social.quota, 3);
        assert_eq!(social.unit, LengthUnit::Chars);
        assert_eq!(
            *config.platforms.spec(Platform::LongForm),
            PlatformSpec::LONG_FORM
        );
        assert_eq!(config.platforms.spec(Platform::MicroProfessional).quota, 2);
        assert_eq!(config.chunking.draft.window(Platform::LongForm).size, 4000);
        assert_eq!(config.chunking.draft.window(Platform::MicroSocial).size, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();

        assert_eq!(parsed.retry, config.retry);
        assert_eq!(parsed.platforms.micro_social, config.platforms.micro_social);
        assert!(yaml.contains("initial_wait_ms: 2000"));
    }

    #[test]
    fn test_overlap_not_below_window_is_rejected() {
        let mut config = Config::default();
        config.chunking.topics.overlap = config.chunking.topics.size;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunking.topics"));
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let mut config = Config::default();
        config.pipeline.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let mut config = Config::default();
        config.platforms.long_form.limit = 0;
        assert!(config.validate().is_err());
    }
}
