//! Layered server configuration: defaults, then an optional YAML file, then
//! `FLEET__`-prefixed environment variables.

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use fleet_register::{AuthnConfig, ConnectOpts, FleetRegisterConfig};
use serde::{Deserialize, Serialize};

/// Prefix of environment overrides; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "FLEET__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub authn: AuthnConfig,
    pub fleet_register: FleetRegisterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Global request body size limit in bytes
    pub body_limit_bytes: usize,
    pub request_timeout_secs: u64,
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8087".to_owned(),
            body_limit_bytes: 16 * 1024 * 1024,
            request_timeout_secs: 30,
            cors_enabled: false,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// `sqlite:` or `postgres:` connection URL.
    pub dsn: String,
    pub max_conns: u32,
    pub min_conns: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: "sqlite://fleet-register.db?mode=rwc".to_owned(),
            max_conns: 10,
            min_conns: 1,
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn connect_opts(&self) -> ConnectOpts {
        ConnectOpts {
            max_conns: Some(self.max_conns),
            min_conns: Some(self.min_conns.min(self.max_conns)),
            acquire_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, `path` (if given) and the environment.
    ///
    /// # Errors
    /// Returns an error if the file is missing or any layer fails to
    /// deserialize into the expected shape.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Copy of the configuration safe to print: token values are masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for mapping in &mut copy.authn.tokens {
            mapping.token = "***".to_owned();
        }
        copy
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use fleet_register::AuthNMode;
    use std::io::Write;

    fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_file() {
        figment::Jail::expect_with(|_jail| {
            let cfg = AppConfig::load(None).unwrap();
            assert_eq!(cfg.server.bind_addr, "127.0.0.1:8087");
            assert_eq!(cfg.server.request_timeout(), Duration::from_secs(30));
            assert_eq!(cfg.fleet_register.default_page_size, 50);
            assert_eq!(cfg.authn.mode, AuthNMode::AcceptAll);
            Ok(())
        });
    }

    #[test]
    fn file_then_environment_override() {
        let file = yaml_file(
            "server:\n  bind_addr: \"0.0.0.0:9000\"\ndatabase:\n  dsn: \"sqlite::memory:\"\n  max_conns: 2\n",
        );
        figment::Jail::expect_with(|jail| {
            jail.set_env("FLEET__SERVER__CORS_ENABLED", "true");
            jail.set_env("FLEET__DATABASE__MAX_CONNS", "4");
            let cfg = AppConfig::load(Some(file.path())).unwrap();
            assert_eq!(cfg.server.bind_addr, "0.0.0.0:9000");
            assert!(cfg.server.cors_enabled);
            assert_eq!(cfg.database.dsn, "sqlite::memory:");
            assert_eq!(cfg.database.max_conns, 4);
            Ok(())
        });
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = yaml_file("server:\n  bind: \"0.0.0.0:9000\"\n");
        figment::Jail::expect_with(|_jail| {
            assert!(AppConfig::load(Some(file.path())).is_err());
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/fleet.yaml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn redaction_masks_tokens_only() {
        let file = yaml_file(
            "authn:\n  mode: static_tokens\n  tokens:\n    - token: \"secret\"\n      username: \"admin\"\n",
        );
        figment::Jail::expect_with(|_jail| {
            let cfg = AppConfig::load(Some(file.path())).unwrap().redacted();
            assert_eq!(cfg.authn.tokens[0].token, "***");
            assert_eq!(cfg.authn.tokens[0].username, "admin");
            Ok(())
        });
    }

    #[test]
    fn min_conns_never_exceeds_max() {
        let db = DatabaseConfig {
            max_conns: 2,
            min_conns: 5,
            ..DatabaseConfig::default()
        };
        let opts = db.connect_opts();
        assert_eq!(opts.min_conns, Some(2));
    }
}
