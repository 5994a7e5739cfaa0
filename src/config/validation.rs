use crate::config::types::{Config, DetailConfig, FetchConfig, ListingConfig, OutputConfig};
use crate::harvester::compile_selector;
use crate::ConfigError;
use url::Url;

/// Upper bound for every configured wait, in seconds
const MAX_WAIT_SECS: u64 = 3600;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_listing_config(&config.listing)?;
    validate_detail_config(&config.detail)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates listing configuration
fn validate_listing_config(config: &ListingConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid listing url '{}': {}", config.url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Listing url '{}' must use HTTP or HTTPS",
            config.url
        )));
    }

    for selector in [
        &config.item_selector,
        &config.title_selector,
        &config.date_selector,
        &config.ready_selector,
    ] {
        validate_selector(selector)?;
    }

    if config.wait_timeout_secs < 1 || config.wait_timeout_secs > MAX_WAIT_SECS {
        return Err(ConfigError::Validation(format!(
            "wait_timeout_secs must be between 1 and {}, got {}",
            MAX_WAIT_SECS, config.wait_timeout_secs
        )));
    }

    if config.poll_interval_ms < 10 || config.poll_interval_ms > MAX_WAIT_SECS * 1000 {
        return Err(ConfigError::Validation(format!(
            "poll_interval_ms must be between 10 and {}, got {}",
            MAX_WAIT_SECS * 1000,
            config.poll_interval_ms
        )));
    }

    Ok(())
}

/// Validates detail page selectors
fn validate_detail_config(config: &DetailConfig) -> Result<(), ConfigError> {
    for selector in [
        &config.title_selector,
        &config.author_selector,
        &config.views_selector,
        &config.created_at_selector,
        &config.description_selector,
        &config.tags_selector,
    ] {
        validate_selector(selector)?;
    }
    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 || config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 1 and 10, got {}",
            config.max_retries
        )));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > MAX_WAIT_SECS {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and {}, got {}",
            MAX_WAIT_SECS, config.request_timeout_secs
        )));
    }

    if config.retry_delay_secs > MAX_WAIT_SECS {
        return Err(ConfigError::Validation(format!(
            "retry_delay_secs must be at most {}, got {}",
            MAX_WAIT_SECS, config.retry_delay_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Checks that a CSS selector parses
fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    compile_selector(selector).map(|_| ())
}
