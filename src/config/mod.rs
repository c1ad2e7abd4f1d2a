//! Application Configuration
//!
//! User settings stored in TOML format, overlaid with environment variables
//! and command-line flags at startup.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::grounding::{Scorer, DEFAULT_MATCH_THRESHOLD};
use crate::llm::gemini::{DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
use crate::vision::cloud_vision::DEFAULT_VISION_ENDPOINT;

/// Model API key
pub const ENV_API_KEY: &str = "GOOGLE_API_KEY";
/// Path to a service account or authorized user JSON file
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// API key for the Vision API, if it differs from the model key
pub const ENV_VISION_API_KEY: &str = "GOOGLE_VISION_API_KEY";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Language model settings
    pub llm: LlmSettings,
    /// OCR service settings
    pub ocr: OcrSettings,
    /// Field grounding settings
    pub grounding: GroundingSettings,
    /// Annotation rendering settings
    pub render: RenderSettings,
}

/// Language model settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Gemini API key
    pub api_key: Option<String>,
    /// Model name, e.g. `gemini-1.5-flash`
    pub model: String,
    /// REST base URL
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &self.api_key.as_deref().map(mask_secret))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// OCR service settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Service account or authorized user credentials file
    pub credentials_path: Option<PathBuf>,
    /// Vision API key, used instead of credentials when set
    pub api_key: Option<String>,
    /// REST base URL
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            credentials_path: None,
            api_key: None,
            endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl OcrSettings {
    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()) || self.credentials_path.is_some()
    }
}

impl fmt::Debug for OcrSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrSettings")
            .field("credentials_path", &self.credentials_path)
            .field("api_key", &self.api_key.as_deref().map(mask_secret))
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Field grounding settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingSettings {
    /// Minimum fuzzy score (0-100) for a token to count as a match
    pub threshold: u8,
    /// Similarity function for the fuzzy pass
    pub scorer: Scorer,
}

impl Default for GroundingSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            scorer: Scorer::default(),
        }
    }
}

/// Annotation rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Outline colour as RGB
    pub color: [u8; 3],
    /// Outline width in pixels
    pub stroke_width: u32,
    /// Draw a tag box at each polygon's top-left corner
    pub draw_labels: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            color: [255, 0, 0],
            stroke_width: 3,
            draw_labels: true,
        }
    }
}

/// Configuration problems that prevent running
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("No model API key configured (set GOOGLE_API_KEY or llm.api_key)")]
    MissingLlmKey,

    #[error("Match threshold must be between 0 and 100, got {0}")]
    InvalidThreshold(u8),
}

/// Configuration problems that only degrade the result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// OCR falls back to the metadata server and will likely fail off-cloud
    MissingOcrCredentials,
    /// The configured credentials file does not exist
    CredentialsFileNotFound(PathBuf),
    /// Outlines will not be visible
    ZeroStrokeWidth,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::MissingOcrCredentials => write!(
                f,
                "No OCR credentials configured (set {} or {}); trying ambient credentials",
                ENV_CREDENTIALS,
                ENV_VISION_API_KEY
            ),
            ConfigWarning::CredentialsFileNotFound(path) => {
                write!(f, "Credentials file {} does not exist", path.display())
            }
            ConfigWarning::ZeroStrokeWidth => write!(f, "render.stroke_width is 0, outlines are invisible"),
        }
    }
}

/// Credentials supplied outside the config file (environment, flags, UI).
///
/// Never written back to `config.toml`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialOverrides {
    pub api_key: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub vision_api_key: Option<String>,
}

impl CredentialOverrides {
    /// Read the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read an environment lookup; blank values are ignored
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            api_key: var(ENV_API_KEY),
            credentials_path: var(ENV_CREDENTIALS).map(PathBuf::from),
            vision_api_key: var(ENV_VISION_API_KEY),
        }
    }

    /// Layer `top` over `self`; values set in `top` win
    pub fn layered(self, top: CredentialOverrides) -> Self {
        Self {
            api_key: top.api_key.or(self.api_key),
            credentials_path: top.credentials_path.or(self.credentials_path),
            vision_api_key: top.vision_api_key.or(self.vision_api_key),
        }
    }

    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(key) = &self.api_key {
            config.llm.api_key = Some(key.clone());
        }
        if let Some(path) = &self.credentials_path {
            config.ocr.credentials_path = Some(path.clone());
        }
        if let Some(key) = &self.vision_api_key {
            config.ocr.api_key = Some(key.clone());
        }
    }
}

impl fmt::Debug for CredentialOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialOverrides")
            .field("api_key", &self.api_key.as_deref().map(mask_secret))
            .field("credentials_path", &self.credentials_path)
            .field("vision_api_key", &self.vision_api_key.as_deref().map(mask_secret))
            .finish()
    }
}

impl AppConfig {
    /// Copy with overrides applied
    pub fn with_overrides(&self, overrides: &CredentialOverrides) -> AppConfig {
        let mut config = self.clone();
        overrides.apply(&mut config);
        config
    }

    /// The model key, if one is set
    pub fn llm_api_key(&self) -> Option<&str> {
        self.llm.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Check the configuration before any service call
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        if self.llm_api_key().is_none() {
            return Err(ConfigError::MissingLlmKey);
        }
        if self.grounding.threshold > 100 {
            return Err(ConfigError::InvalidThreshold(self.grounding.threshold));
        }

        let mut warnings = Vec::new();
        if !self.ocr.has_credentials() {
            warnings.push(ConfigWarning::MissingOcrCredentials);
        }
        if let Some(path) = &self.ocr.credentials_path {
            if !path.exists() {
                warnings.push(ConfigWarning::CredentialsFileNotFound(path.clone()));
            }
        }
        if self.render.stroke_width == 0 {
            warnings.push(ConfigWarning::ZeroStrokeWidth);
        }
        Ok(warnings)
    }

    /// Copy with secrets masked, for display
    pub fn redacted(&self) -> AppConfig {
        let mut config = self.clone();
        config.llm.api_key = config.llm.api_key.as_deref().map(mask_secret);
        config.ocr.api_key = config.ocr.api_key.as_deref().map(mask_secret);
        config
    }
}

/// Keep the first four characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "********".to_string()
    } else {
        format!("{visible}********")
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
