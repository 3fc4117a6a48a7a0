use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};
use std::path::Path;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

/// Prefix for environment overrides, e.g. `ALGO_COST_ORDER__QUANTITY=250`.
pub const ENV_PREFIX: &str = "ALGO_COST_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the default TOML file merged with environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration from a specific TOML file.
    ///
    /// Layers, lowest first: built-in defaults, an optional sibling
    /// `Config.json`, the TOML file, then environment variables. Missing
    /// files are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or if the
    /// resulting order parameters are invalid.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let path = path.as_ref();
        let json_path = path.with_extension("json");

        let config: AppConfig = Figment::from(figment::providers::Serialized::defaults(
            AppConfig::default(),
        ))
        .merge(Json::file(json_path))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;

        config.order.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::load_from("config/Config.toml").expect("defaults load");
            assert_eq!(config, AppConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_toml_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Config.toml",
                r#"
                [feed]
                url = "ws://127.0.0.1:9000/ws"
                subscriber_queue_capacity = 8

                [order]
                quantity = 500.0
                fee_tier = "Tier 2"

                [fees]
                "Tier 1" = "0.001"
                "Tier 2" = "0.0008"
                "#,
            )?;

            let config = ConfigLoader::load().expect("config loads");
            assert_eq!(config.feed.url, "ws://127.0.0.1:9000/ws");
            assert_eq!(config.feed.subscriber_queue_capacity, 8);
            assert_eq!(config.feed.max_reconnect_delay_ms, 30_000);
            assert_eq!(config.order.quantity, 500.0);
            assert_eq!(config.order.volatility, 0.01);
            assert_eq!(config.order.fee_tier, "Tier 2");
            assert_eq!(config.fees.rate("Tier 2"), Some(dec!(0.0008)));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("Custom.toml", "[order]\nquantity = 500.0\n")?;
            jail.set_env("ALGO_COST_ORDER__QUANTITY", "250");
            jail.set_env("ALGO_COST_ORDER__VOLATILITY", "0.05");

            let config = ConfigLoader::load_from("Custom.toml").expect("config loads");
            assert_eq!(config.order.quantity, 250.0);
            assert_eq!(config.order.volatility, 0.05);
            Ok(())
        });
    }

    #[test]
    fn test_json_sibling_sits_below_toml() {
        Jail::expect_with(|jail| {
            jail.create_file("App.json", r#"{"order": {"quantity": 42.0, "fee_tier": "Tier 3"}}"#)?;
            jail.create_file("App.toml", "[order]\nquantity = 84.0\n")?;

            let config = ConfigLoader::load_from("App.toml").expect("config loads");
            assert_eq!(config.order.quantity, 84.0);
            assert_eq!(config.order.fee_tier, "Tier 3");
            Ok(())
        });
    }

    #[test]
    fn test_invalid_order_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("Bad.toml", "[order]\nvolatility = 2.0\n")?;
            assert!(ConfigLoader::load_from("Bad.toml").is_err());
            Ok(())
        });
    }
}
