pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

pub use paths::AppPaths;
pub use service::{port_from_env, ConfigError, ConfigService};
pub use settings::{AppConfig, LlmConfig, LoggingConfig, MemoryConfig, PathsConfig, ServerConfig};
