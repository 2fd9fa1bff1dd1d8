use crate::config::types::{
    Config, CrawlerConfig, DriverConfig, LanguageConfig, OutputConfig, ScraperConfig, SiteConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_language_config(&config.languages)?;
    validate_crawler_config(&config.crawler)?;
    validate_scraper_config(&config.scraper)?;
    validate_driver_config(&config.driver)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the sitemap source
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.sitemap_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid sitemap-url: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "sitemap-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.exclude.iter().any(|token| token.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "exclude tokens cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates main, target and export languages
fn validate_language_config(config: &LanguageConfig) -> Result<(), ConfigError> {
    validate_language_code(&config.main)?;

    if config.targets.is_empty() {
        return Err(ConfigError::Validation(
            "at least one target language is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for lang in &config.targets {
        validate_language_code(lang)?;
        if !seen.insert(lang.as_str()) {
            return Err(ConfigError::Validation(format!(
                "target language '{}' is listed twice",
                lang
            )));
        }
    }

    // A page can only qualify if some target differs from the main language
    if config.targets.iter().all(|lang| lang == &config.main) {
        return Err(ConfigError::Validation(format!(
            "targets must contain a language other than the main language '{}'",
            config.main
        )));
    }

    for lang in &config.export {
        validate_language_code(lang)?;
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.save_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "crawler save-interval must be >= 1, got {}",
            config.save_interval
        )));
    }

    if config.probe_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "probe-attempts must be >= 1, got {}",
            config.probe_attempts
        )));
    }

    Ok(())
}

/// Validates scraper configuration
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.save_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "scraper save-interval must be >= 1, got {}",
            config.save_interval
        )));
    }

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

/// Validates page driver settings
fn validate_driver_config(config: &DriverConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    for selector in [&config.primary_selector, &config.secondary_selector] {
        Selector::parse(selector)
            .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))?;
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.working_dir.is_empty() {
        return Err(ConfigError::Validation(
            "working-dir cannot be empty".to_string(),
        ));
    }

    if let Some(path) = &config.summary_path {
        if path.is_empty() {
            return Err(ConfigError::Validation(
                "summary-path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Language codes end up in file and directory names
fn validate_language_code(code: &str) -> Result<(), ConfigError> {
    if code.is_empty() {
        return Err(ConfigError::InvalidLanguage(
            "language code cannot be empty".to_string(),
        ));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::InvalidLanguage(format!(
            "'{}' may only contain ASCII letters, digits, '-' and '_'",
            code
        )));
    }

    Ok(())
}
