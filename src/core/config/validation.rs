use super::service::ConfigError;
use super::settings::AppConfig;

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        return Err(invalid("llm.temperature", "must be between 0.0 and 2.0"));
    }
    validate_range("llm.retriever_k", config.llm.retriever_k as u64, 1, 100)?;
    validate_range(
        "llm.request_timeout_secs",
        config.llm.request_timeout_secs,
        1,
        86_400,
    )?;
    validate_non_empty("llm.api_base", &config.llm.api_base)?;
    validate_non_empty("llm.embedding_model", &config.llm.embedding_model)?;
    validate_non_empty("llm.chat_model", &config.llm.chat_model)?;

    validate_range("memory.window", config.memory.window as u64, 1, 1_000)?;
    validate_range(
        "memory.session_ttl_secs",
        config.memory.session_ttl_secs,
        1,
        30 * 86_400,
    )?;
    validate_range(
        "memory.max_sessions",
        config.memory.max_sessions as u64,
        1,
        10_000_000,
    )?;
    validate_range(
        "memory.sweep_interval_secs",
        config.memory.sweep_interval_secs,
        1,
        86_400,
    )?;

    for origin in &config.server.cors_allowed_origins {
        validate_non_empty("server.cors_allowed_origins[]", origin)?;
    }

    Ok(())
}

fn validate_range(path: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(invalid(
            path,
            &format!("must be between {} and {} (got {})", min, max, value),
        ));
    }
    Ok(())
}

fn validate_non_empty(path: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(path, "must not be empty"));
    }
    Ok(())
}

fn invalid(path: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid(format!("{} {}", path, reason))
}
