mod environment;
mod settings;

pub use environment::{ENVIRONMENT_VAR, Environment};
pub use settings::{
    ChunkingSettings, DatabaseSettings, IntakeSettings, LlmProviderSetting, LlmSettings,
    LoggingSettings, PartitioningSettings, Settings, StorageProviderSetting, StorageSettings,
};
