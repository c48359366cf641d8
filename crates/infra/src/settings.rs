use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use bookshop_observability::LogFormat;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSHOP_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHOP_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSHOP";

/// Application configuration loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub seed: SeedSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Layer `.env`, `{config_dir}/base.toml`, `{config_dir}/{env}.toml` and
    /// `BOOKSHOP_*` variables, later sources winning.
    ///
    /// Nested keys use a double underscore: `BOOKSHOP_DATABASE__MAX_CONNECTIONS=2`.
    pub fn load() -> anyhow::Result<Self> {
        // A missing `.env` is fine.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Same layering as [`load`](Self::load) with an explicit directory and environment.
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{environment}.toml"));

        config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// SQLite file; `None` means the per-user data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    fn default_max_connections() -> u32 {
        5
    }

    /// The configured path, or `{data_dir}/bookshop/bookshop.db`.
    pub fn resolve_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().context("no per-user data directory on this platform")?;
        Ok(data_dir.join("bookshop").join("bookshop.db"))
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: Self::default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SeedSettings {
    /// Fill an empty catalogue with the sample books on startup.
    #[serde(default = "SeedSettings::default_sample_books")]
    pub sample_books: bool,
}

impl SeedSettings {
    fn default_sample_books() -> bool {
        true
    }
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            sample_books: Self::default_sample_books(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that read or write `BOOKSHOP_*` variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_OVERRIDES: [(&str, &str); 3] = [
        ("BOOKSHOP_DATABASE__MAX_CONNECTIONS", "2"),
        ("BOOKSHOP_SEED__SAMPLE_BOOKS", "false"),
        ("BOOKSHOP_TELEMETRY__LOG_FORMAT", "json"),
    ];

    fn temp_config_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bookshop-config-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn from_toml(toml: &str) -> Settings {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.database.path, None);
        assert_eq!(settings.database.max_connections, 5);
        assert!(settings.seed.sample_books);
        assert_eq!(settings.telemetry.log_format, LogFormat::Pretty);
    }

    #[test]
    fn empty_source_yields_defaults() {
        assert_eq!(from_toml(""), Settings::default());
    }

    #[test]
    fn parses_every_section() {
        let settings = from_toml(
            r#"
            [database]
            path = "/var/lib/bookshop/shop.db"
            max_connections = 2

            [seed]
            sample_books = false

            [telemetry]
            log_format = "json"
            "#,
        );
        assert_eq!(
            settings.database.resolve_path().unwrap(),
            PathBuf::from("/var/lib/bookshop/shop.db")
        );
        assert_eq!(settings.database.max_connections, 2);
        assert!(!settings.seed.sample_books);
        assert_eq!(settings.telemetry.log_format, LogFormat::Json);
    }

    #[test]
    fn default_path_lives_under_bookshop_dir() {
        if let Ok(path) = DatabaseSettings::default().resolve_path() {
            assert!(path.ends_with("bookshop/bookshop.db"));
        }
    }

    #[test]
    fn layered_files_override_base() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = temp_config_dir();
        std::fs::write(
            dir.join("base.toml"),
            "[database]\nmax_connections = 3\n[seed]\nsample_books = false\n",
        )
        .unwrap();
        std::fs::write(dir.join("test.toml"), "[database]\nmax_connections = 1\n").unwrap();

        let settings = Settings::load_from(&dir, "test").unwrap();
        assert_eq!(settings.database.max_connections, 1);
        assert!(!settings.seed.sample_books);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn environment_variables_override_files() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = temp_config_dir();
        std::fs::write(
            dir.join("base.toml"),
            "[database]\nmax_connections = 4\n[telemetry]\nlog_format = \"pretty\"\n",
        )
        .unwrap();

        // SAFETY: every test touching these variables holds `ENV_LOCK`.
        unsafe {
            for (key, value) in ENV_OVERRIDES {
                std::env::set_var(key, value);
            }
        }
        let loaded = Settings::load_from(&dir, "test");
        unsafe {
            for (key, _) in ENV_OVERRIDES {
                std::env::remove_var(key);
            }
        }
        let _ = std::fs::remove_dir_all(&dir);

        let settings = loaded.unwrap();
        assert_eq!(settings.database.max_connections, 2);
        assert!(!settings.seed.sample_books);
        assert_eq!(settings.telemetry.log_format, LogFormat::Json);
        assert_eq!(settings.database.path, None);
    }
}
