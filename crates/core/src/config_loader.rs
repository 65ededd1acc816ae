use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration by merging the default TOML file and
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<AppConfig> {
        Self::load_from("config/Config.toml")
    }

    /// Loads application configuration from a specific TOML file, with
    /// `ECON_INGEST_`-prefixed environment variables layered on top
    /// (nested keys separated by `__`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("ECON_INGEST_").split("__"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_sections_fall_back_to_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "Config.toml",
                r#"
                [database]
                url = "postgresql://db.internal/econ"

                [fred]
                api_key = "test-key"
                "#,
            )?;

            let config = ConfigLoader::load_from("Config.toml").expect("load");
            assert_eq!(config.database.url, "postgresql://db.internal/econ");
            assert_eq!(config.fred.as_ref().map(|f| f.api_key.as_str()), Some("test-key"));
            // Unset sections keep their defaults.
            assert_eq!(config.ingest.max_retries, 5);
            assert!(config.polygon.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "Config.toml",
                r#"
                [database]
                url = "postgresql://db.internal/econ"
                "#,
            )?;
            jail.set_env("ECON_INGEST_INGEST__MAX_RETRIES", "3");

            let config = ConfigLoader::load_from("Config.toml").expect("load");
            assert_eq!(config.ingest.max_retries, 3);
            Ok(())
        });
    }
}
