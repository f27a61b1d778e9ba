//! Configuration for templates, CSRF and the database
//!
//! Values are layered with figment, lowest priority first:
//!
//! 1. Hardcoded defaults
//! 2. A TOML file (`./config.toml`, or the path given to [`MixinsConfig::load_from`])
//! 3. Environment variables with the `ACTON_` prefix, `__` separating sections
//!
//! # Example Configuration
//!
//! ```toml
//! [templates]
//! template_dir = "./templates"
//! auto_reload = true
//!
//! [security]
//! csrf_enabled = true
//! csrf_secret = "change-me"
//! csrf_time_limit_secs = 3600
//!
//! [database]
//! url = "sqlite://./blog.db"
//! max_connections = 5
//! ```
//!
//! `ACTON_SECURITY__CSRF_SECRET=...` overrides the secret above.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Template engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Directory templates are loaded from
    pub template_dir: PathBuf,

    /// Re-read templates from disk on every render
    pub auto_reload: bool,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("./templates"),
            auto_reload: cfg!(debug_assertions),
        }
    }
}

/// CSRF configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Protect generated forms with CSRF tokens
    pub csrf_enabled: bool,

    /// Key for token digests; a random key is generated when unset
    pub csrf_secret: Option<String>,

    /// Token lifetime in seconds; unset tokens never expire
    pub csrf_time_limit_secs: Option<u64>,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            csrf_enabled: true,
            csrf_secret: None,
            csrf_time_limit_secs: Some(1800),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection URL
    pub url: String,

    /// Pool size
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MixinsConfig {
    /// Template engine settings
    #[serde(default)]
    pub templates: TemplateSettings,

    /// CSRF settings
    #[serde(default)]
    pub security: SecuritySettings,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseSettings,
}

impl MixinsConfig {
    /// Load from `./config.toml` (if present) and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed into the configuration.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from("./config.toml")
    }

    /// Load from a specific file (if present) and the environment
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use acton_mixins::config::MixinsConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = MixinsConfig::load_from("./config/production.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed into the configuration.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config: Self = Self::figment(path.as_ref())?.extract()?;
        tracing::debug!(templates = ?config.templates, database = %config.database.url, "loaded configuration");
        Ok(config)
    }

    fn figment(path: &Path) -> anyhow::Result<Figment> {
        Ok(Figment::new()
            .merge(Toml::string(&toml::to_string(&Self::default())?))
            .merge(Toml::file(path))
            .merge(Env::prefixed("ACTON_").split("__").lowercase(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MixinsConfig::default();
        assert!(config.security.csrf_enabled);
        assert_eq!(config.security.csrf_time_limit_secs, Some(1800));
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.templates.template_dir, PathBuf::from("./templates"));
    }

    #[test]
    fn test_load_from_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "app.toml",
                r#"
                [templates]
                template_dir = "views"

                [security]
                csrf_secret = "from-file"

                [database]
                max_connections = 2
                "#,
            )?;
            jail.set_env("ACTON_DATABASE__URL", "sqlite://./env.db");

            let config = MixinsConfig::load_from("app.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.templates.template_dir, PathBuf::from("views"));
            assert_eq!(config.security.csrf_secret.as_deref(), Some("from-file"));
            assert_eq!(config.security.csrf_time_limit_secs, Some(1800));
            assert_eq!(config.database.max_connections, 2);
            assert_eq!(config.database.url, "sqlite://./env.db");
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = MixinsConfig::load_from("absent.toml").map_err(|e| e.to_string())?;
            assert!(config.security.csrf_secret.is_none());
            assert_eq!(config.database.max_connections, 5);
            Ok(())
        });
    }
}
