//! Configuration for the impact pipeline.
//!
//! A YAML file provides the base settings; CLI flags and environment
//! variables (via clap) override individual values on top of it.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Record store settings
    pub database: DatabaseConfig,
    /// Generative scoring backend
    pub scoring: ScoringConfig,
    /// Intake form rate limiting
    pub intake: IntakeConfig,
    /// General settings
    pub general: GeneralConfig,
}

impl PipelineConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Read and parse a YAML file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&yaml).map_err(|e| {
            PipelineError::Config(format!("Invalid config {}: {}", path.display(), e))
        })
    }
}

/// Record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path; `:memory:` for a throwaway database
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "impact-pipeline.db".to_string(),
        }
    }
}

/// Generative scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Call the model before falling back to rules
    pub enabled: bool,
    /// OpenAI-compatible base URL
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// HTTP timeout for one scoring call (ms)
    pub timeout_ms: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            max_tokens: 1024,
            temperature: 0.2,
            timeout_ms: 30_000,
        }
    }
}

/// Intake rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Sliding window length (seconds)
    pub window_secs: u64,
    /// Submissions allowed per client per window
    pub max_requests: u32,
    /// Clients tracked before eviction kicks in
    pub max_clients: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            window_secs: 3600,
            max_requests: 5,
            max_clients: 10_000,
        }
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Impact Pipeline - venture portfolio metrics and GEDSI scoring
#[derive(Parser, Debug, Clone)]
#[command(name = "impact-pipeline")]
#[command(about = "Venture portfolio metrics, recalculation and GEDSI scoring")]
pub struct Args {
    /// YAML config file
    #[arg(long, env = "IMPACT_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database path (overrides config)
    #[arg(long, env = "DATABASE_PATH")]
    pub database: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// OpenAI-compatible base URL; enables model scoring
    #[arg(long, env = "LLM_BASE_URL")]
    pub llm_base_url: Option<String>,

    /// Model name; enables model scoring
    #[arg(long, env = "LLM_MODEL")]
    pub llm_model: Option<String>,

    /// API key for the scoring backend
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Portfolio totals and averages
    Portfolio,
    /// Recalculate derived fields for one venture or all of them
    Recalculate {
        #[arg(long)]
        venture: Option<String>,
    },
    /// Analytics overview for a period (7d, 30d, 90d, 1y)
    Analytics {
        #[arg(long, default_value = "30d")]
        period: String,
    },
    /// Readiness and GEDSI assessment of a venture
    Score {
        #[arg(long)]
        venture: String,
    },
    /// Monthly metric trend, optionally for one venture
    Trends {
        #[arg(long)]
        venture: Option<String>,
    },
    /// Print the default config as YAML
    InitConfig,
}

impl Args {
    /// Build the effective config: file (or defaults) with flags on top.
    pub fn resolve_config(&self) -> Result<PipelineConfig, PipelineError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        self.apply_to(&mut config);
        Ok(config)
    }

    /// Overlay flags onto `config`.
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(path) = &self.database {
            config.database.path = path.clone();
        }
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(url) = &self.llm_base_url {
            config.scoring.base_url = url.clone();
            config.scoring.enabled = true;
        }
        if let Some(model) = &self.llm_model {
            config.scoring.model = model.clone();
            config.scoring.enabled = true;
        }
        if let Some(key) = &self.llm_api_key {
            config.scoring.api_key = Some(key.clone());
        }
    }
}
