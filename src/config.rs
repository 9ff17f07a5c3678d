use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::listing::ListingConfig;
use crate::lookup::LookupConfig;
use crate::utils::RetryConfig;

// ============================================================================
// Console Configuration
// ============================================================================
//
// Loaded from the YAML file named by CAMPUS_ORDERS_CONFIG, or defaults when
// unset. CAMPUS_ORDERS_PAGE_SIZE overrides `listing.page_size`.
//
// ```yaml
// listing:
//   page_size: 10
//   exhaustion: empty_page      # or short_page
//   utc_offset_minutes: 330
// lookup:
//   duplicate_policy: first_match   # or reject
// retry:
//   max_attempts: 2
//   initial_delay_ms: 200
// log_filter: info,campus_orders_admin=debug
// ```
//
// ============================================================================

pub const CONFIG_PATH_ENV: &str = "CAMPUS_ORDERS_CONFIG";
pub const PAGE_SIZE_ENV: &str = "CAMPUS_ORDERS_PAGE_SIZE";
pub const DEFAULT_LOG_FILTER: &str = "info,campus_orders_admin=debug";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub listing: ListingConfig,
    pub lookup: LookupConfig,
    pub retry: RetryConfig,
    /// Used when RUST_LOG is not set.
    pub log_filter: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            listing: ListingConfig::default(),
            lookup: LookupConfig::default(),
            retry: RetryConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ConsoleConfig {
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("Invalid console configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Resolve configuration from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_yaml_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(raw) = std::env::var(PAGE_SIZE_ENV) {
            config.apply_page_size_override(&raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_page_size_override(&mut self, raw: &str) -> anyhow::Result<()> {
        self.listing.page_size = raw
            .trim()
            .parse()
            .with_context(|| format!("{PAGE_SIZE_ENV} must be a positive integer, got {raw:?}"))?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.listing.page_size == 0 {
            bail!("listing.page_size must be greater than zero");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.listing.utc_offset_minutes.abs() >= 24 * 60 {
            bail!("listing.utc_offset_minutes must be within one day");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::ExhaustionPolicy;
    use crate::lookup::DuplicatePolicy;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.listing.page_size, 10);
        assert_eq!(config.listing.exhaustion, ExhaustionPolicy::EmptyPage);
        assert_eq!(config.lookup.duplicate_policy, DuplicatePolicy::FirstMatch);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ConsoleConfig::from_yaml_str(
            r#"
listing:
  page_size: 25
  exhaustion: short_page
  utc_offset_minutes: 330
lookup:
  duplicate_policy: reject
retry:
  max_attempts: 4
  initial_delay_ms: 50
"#,
        )
        .unwrap();

        assert_eq!(config.listing.page_size, 25);
        assert_eq!(config.listing.exhaustion, ExhaustionPolicy::ShortPage);
        assert_eq!(config.listing.utc_offset_minutes, 330);
        assert_eq!(config.lookup.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(50));
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let err = ConsoleConfig::from_yaml_str("listing:\n  page_size: 0\n").unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        assert!(ConsoleConfig::from_yaml_str("retry:\n  max_attempts: 0\n").is_err());
    }

    #[test]
    fn test_rejects_unknown_policy() {
        assert!(ConsoleConfig::from_yaml_str("lookup:\n  duplicate_policy: newest\n").is_err());
    }

    #[test]
    fn test_page_size_override() {
        let mut config = ConsoleConfig::default();
        config.apply_page_size_override(" 5 ").unwrap();
        assert_eq!(config.listing.page_size, 5);
        assert!(config.apply_page_size_override("ten").is_err());
    }
}
