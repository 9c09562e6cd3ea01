use std::collections::HashMap;
use std::path::Path;

use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::application::ports::DEFAULT_PDF_SPLIT_CONCURRENCY;
use crate::application::services::{DEFAULT_MAX_FILE_SIZE, PipelineSettings};
use crate::domain::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, SplitterConfig, default_separators};

use super::Environment;

pub const ENV_PREFIX: &str = "APP";
pub const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingSettings,
    pub partitioning: PartitioningSettings,
    pub llm: LlmSettings,
    pub storage: StorageSettings,
    pub database: DatabaseSettings,
    pub intake: IntakeSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// `.env`, then `appsettings.<environment>.toml` from the working
    /// directory, then `APP_`-prefixed variables (`APP_CHUNKING__CHUNK_SIZE`).
    pub fn load() -> Result<(Self, Environment), ConfigError> {
        dotenvy::dotenv().ok();
        let environment = Environment::from_env().map_err(ConfigError::Message)?;
        let settings = Self::load_from(environment, Path::new("."), None)?;
        Ok((settings, environment))
    }

    /// `env_vars` replaces the process environment as the variable source when given.
    pub fn load_from(
        environment: Environment,
        config_dir: &Path,
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file_stem = config_dir.join(format!("appsettings.{}", environment.as_str()));

        let configuration = Config::builder()
            .add_source(File::with_name(&file_stem.to_string_lossy()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator(ENV_SEPARATOR)
                    .list_separator(",")
                    .with_list_parse_key("partitioning.languages")
                    .try_parsing(true)
                    .source(env_vars),
            )
            .build()?;

        let settings: Settings = configuration.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.chunking
            .splitter_config()
            .validate()
            .map_err(|e| ConfigError::Message(format!("chunking: {}", e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
    pub split_at_document_boundaries: bool,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: default_separators(),
            split_at_document_boundaries: true,
        }
    }
}

impl ChunkingSettings {
    pub fn splitter_config(&self) -> SplitterConfig {
        SplitterConfig::new(self.chunk_size, self.chunk_overlap)
            .with_separators(self.separators.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PartitioningSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub pdf_split_concurrency: u8,
    pub languages: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for PartitioningSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.unstructuredapp.io".to_string(),
            api_key: None,
            pdf_split_concurrency: DEFAULT_PDF_SPLIT_CONCURRENCY,
            languages: vec!["eng".to_string()],
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderSetting {
    #[serde(rename = "openai")]
    OpenAi,
    Azure,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProviderSetting,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProviderSetting::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4096,
            temperature: 0.2,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProviderSetting {
    Local,
    Azure,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub provider: StorageProviderSetting,
    pub local_path: String,
    pub bucket: String,
    pub public_base_url: Option<String>,
    pub azure_account: Option<String>,
    pub azure_access_key: Option<String>,
    pub azure_container: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: StorageProviderSetting::Local,
            local_path: "./data".to_string(),
            bucket: "board-documents".to_string(),
            public_base_url: None,
            azure_account: None,
            azure_access_key: None,
            azure_container: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// In-memory repositories are used when unset.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntakeSettings {
    pub max_file_size_mb: u64,
    /// Describe uploads with the LLM when one is configured.
    pub generate_metadata: bool,
}

impl Default for IntakeSettings {
    fn default() -> Self {
        Self {
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE / (1024 * 1024),
            generate_metadata: true,
        }
    }
}

impl IntakeSettings {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub enable_json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info,boardlens=debug".to_string(),
            enable_json: false,
        }
    }
}

impl Settings {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            splitter: self.chunking.splitter_config(),
            split_at_document_boundaries: self.chunking.split_at_document_boundaries,
            pdf_split_concurrency: self.partitioning.pdf_split_concurrency,
            languages: self.partitioning.languages.clone(),
        }
    }
}
