use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base directory every stored file path is relative to.
    pub root_data_dir: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Glob patterns a file name must match to be registered as output.
    #[serde(default = "default_output_patterns")]
    pub output_patterns: Vec<String>,
    #[serde(default)]
    pub suite2p_output_dir: Option<String>,
    #[serde(default)]
    pub caiman_output_dir: Option<String>,
}

fn default_database_path() -> String {
    "calcium.db".to_string()
}

fn default_output_patterns() -> Vec<String> {
    vec!["*".to_string()]
}

/// Load `Config.{toml,yaml,json}` if present, overridden by `CALCIUM_*`
/// environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("CALCIUM")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("output_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<AppConfig, ConfigError> {
        Config::builder()
            .add_source(ConfigFile::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize::<AppConfig>()
    }

    #[test]
    fn test_defaults_applied() {
        let config = from_toml(r#"root_data_dir = "/data""#).unwrap();
        assert_eq!(config.root_data_dir, "/data");
        assert_eq!(config.database_path, "calcium.db");
        assert_eq!(config.output_patterns, vec!["*".to_string()]);
        assert!(config.suite2p_output_dir.is_none());
        assert!(config.caiman_output_dir.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = from_toml(
            r#"
            root_data_dir = "/data"
            database_path = "/var/lib/calcium.db"
            output_patterns = ["*.npy", "*.hdf5"]
            suite2p_output_dir = "/data/suite2p"
            caiman_output_dir = "/data/caiman"
            "#,
        )
        .unwrap();
        assert_eq!(config.output_patterns.len(), 2);
        assert_eq!(config.caiman_output_dir.as_deref(), Some("/data/caiman"));
    }

    #[test]
    fn test_missing_root_is_error() {
        assert!(from_toml(r#"database_path = "x.db""#).is_err());
    }
}
