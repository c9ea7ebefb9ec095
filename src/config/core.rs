use super::overrides::{ConfigOverrides, apply_ci};
use super::{ConfigurationError, ReportingConfig};
use crate::ci::{self, EnvSnapshot};
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

// Embed the default config at compile time
pub const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// Project configuration file looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = "testreport.toml";

#[derive(Debug, Clone)]
enum ConfigFile {
    /// Merged when it exists
    Optional(PathBuf),
    /// Named explicitly; missing is an error
    Required(PathBuf),
}

/// Resolves a [`ReportingConfig`] for one run.
///
/// Layers, lowest priority first: embedded defaults, config file, environment
/// table, CI adjustments, explicit overrides. The result is validated.
pub struct ConfigResolver<'a> {
    env: &'a EnvSnapshot,
    file: Option<ConfigFile>,
}

impl<'a> ConfigResolver<'a> {
    /// Resolver over the embedded defaults and the environment only
    pub fn new(env: &'a EnvSnapshot) -> Self {
        Self { env, file: None }
    }

    /// Merge `testreport.toml` from `dir` if present
    pub fn with_project_dir(mut self, dir: &Path) -> Self {
        self.file = Some(ConfigFile::Optional(dir.join(PROJECT_CONFIG_FILE)));
        self
    }

    /// Merge the given file, which must exist
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(ConfigFile::Required(path.into()));
        self
    }

    /// Defaults plus the config file, before environment and CI layers
    pub fn file_figment(&self) -> Result<Figment, ConfigurationError> {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        match &self.file {
            Some(ConfigFile::Optional(path)) if path.is_file() => {
                tracing::debug!("Loading config file {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            Some(ConfigFile::Optional(path)) => {
                tracing::trace!("No config file at {}", path.display());
            }
            Some(ConfigFile::Required(path)) => {
                if !path.is_file() {
                    return Err(ConfigurationError::invalid(
                        "config",
                        format!("file not found: {}", path.display()),
                    ));
                }
                tracing::debug!("Loading config file {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {}
        }

        Ok(figment)
    }

    pub fn resolve(&self, overrides: &ConfigOverrides) -> Result<ReportingConfig, ConfigurationError> {
        let env_layer = ConfigOverrides::from_env(self.env);
        let mut config: ReportingConfig = self
            .file_figment()?
            .merge(Serialized::defaults(&env_layer))
            .extract()?;

        let ci_info = ci::detect(self.env);
        apply_ci(&mut config, &ci_info, env_layer.environment.is_some());

        let config: ReportingConfig = Figment::from(Serialized::defaults(&config))
            .merge(Serialized::defaults(overrides))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Like [`resolve`](Self::resolve), but an invalid configuration falls back
    /// to the defaults (still adjusted for CI) with a single warning. Explicit
    /// overrides are kept on top of the fallback unless they are invalid too.
    pub fn resolve_or_default(&self, overrides: &ConfigOverrides) -> ReportingConfig {
        self.resolve(overrides).unwrap_or_else(|e| {
            tracing::warn!("{e}; falling back to default configuration");
            let mut defaults = ReportingConfig::default();
            apply_ci(&mut defaults, &ci::detect(self.env), false);

            let merged = Figment::from(Serialized::defaults(&defaults))
                .merge(Serialized::defaults(overrides))
                .extract::<ReportingConfig>()
                .map_err(ConfigurationError::from)
                .and_then(|config| config.validate().map(|()| config));
            merged.unwrap_or_else(|e| {
                tracing::debug!("Explicit overrides rejected on fallback: {e}");
                defaults
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputOverrides, PerformanceOverrides};
    use std::fs;
    use tempfile::TempDir;

    fn project(contents: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), contents).unwrap();
        dir
    }

    #[test]
    fn test_embedded_defaults_match_struct_defaults() {
        let from_toml: ReportingConfig = Figment::new()
            .merge(Toml::string(DEFAULT_CONFIG))
            .extract()
            .unwrap();
        assert_eq!(from_toml, ReportingConfig::default());
    }

    #[test]
    fn test_resolve_without_layers_gives_defaults() {
        let env = EnvSnapshot::default();
        let config = ConfigResolver::new(&env).resolve(&ConfigOverrides::default()).unwrap();
        assert_eq!(config, ReportingConfig::default());
    }

    #[test]
    fn test_layer_priority() {
        let dir = project(
            r#"
            environment = "qa"
            [output]
            directory = "from-file"
            title = "File Title"
            [performance]
            parallel = false
            timeout_ms = 1000
            "#,
        );
        let env = EnvSnapshot::from_pairs([("TEST_REPORTS_DIR", "from-env")]);
        let overrides = ConfigOverrides {
            output: OutputOverrides {
                title: Some("Flag Title".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let config = ConfigResolver::new(&env)
            .with_project_dir(dir.path())
            .resolve(&overrides)
            .unwrap();

        assert_eq!(config.environment, "qa");
        assert_eq!(config.output.directory, PathBuf::from("from-env"));
        assert_eq!(config.output.title, "Flag Title");
        assert!(!config.performance.parallel);
        assert_eq!(config.performance.timeout_ms, 1000);
        assert_eq!(config.output.base_filename, "test-report");
    }

    #[test]
    fn test_ci_layer_then_explicit_overrides() {
        let env = EnvSnapshot::from_pairs([("GITHUB_ACTIONS", "true"), ("GITHUB_RUN_ID", "9")]);
        let resolver = ConfigResolver::new(&env);

        let config = resolver.resolve(&ConfigOverrides::default()).unwrap();
        assert_eq!(config.performance.timeout_ms, 120_000);
        assert!(!config.errors.fail_on_error);
        assert_eq!(config.environment, "ci");

        let overrides = ConfigOverrides {
            performance: PerformanceOverrides {
                timeout_ms: Some(500),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = resolver.resolve(&overrides).unwrap();
        assert_eq!(config.performance.timeout_ms, 500);
    }

    #[test]
    fn test_env_environment_survives_ci() {
        let env = EnvSnapshot::from_pairs([("CI", "1"), ("TEST_REPORTING_ENVIRONMENT", "nightly")]);
        let config = ConfigResolver::new(&env).resolve(&ConfigOverrides::default()).unwrap();
        assert_eq!(config.environment, "nightly");
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let dir = project("[retry]\nmax_attempts = 0\n");
        let env = EnvSnapshot::default();
        let resolver = ConfigResolver::new(&env).with_project_dir(dir.path());

        let err = resolver.resolve(&ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { ref field, .. } if field == "retry.max_attempts"));
        assert_eq!(resolver.resolve_or_default(&ConfigOverrides::default()), ReportingConfig::default());
    }

    #[test]
    fn test_unknown_env_format_falls_back_to_defaults() {
        let env = EnvSnapshot::from_pairs([("TEST_REPORTING_FORMATS", "json,pdf")]);
        let resolver = ConfigResolver::new(&env);
        assert!(resolver.resolve(&ConfigOverrides::default()).is_err());
        assert_eq!(
            resolver.resolve_or_default(&ConfigOverrides::default()).output.formats.len(),
            3
        );
    }

    #[test]
    fn test_fallback_keeps_explicit_overrides() {
        let env = EnvSnapshot::from_pairs([("TEST_REPORTING_FORMATS", "pdf")]);
        let overrides = ConfigOverrides {
            output: OutputOverrides {
                directory: Some("out".to_string()),
                title: Some("Nightly".to_string()),
                ..OutputOverrides::default()
            },
            ..ConfigOverrides::default()
        };

        let config = ConfigResolver::new(&env).resolve_or_default(&overrides);
        assert_eq!(config.output.directory, std::path::PathBuf::from("out"));
        assert_eq!(config.output.title, "Nightly");
        assert_eq!(config.output.formats, ReportingConfig::default().output.formats);

        // Overrides that are invalid on their own are dropped as well
        let bad = ConfigOverrides {
            output: OutputOverrides {
                formats: Some(vec!["pdf".to_string()]),
                ..OutputOverrides::default()
            },
            ..ConfigOverrides::default()
        };
        assert_eq!(ConfigResolver::new(&env).resolve_or_default(&bad), ReportingConfig::default());
    }

    #[test]
    fn test_malformed_file_is_load_error() {
        let dir = project("[output\ndirectory = ");
        let env = EnvSnapshot::default();
        let err = ConfigResolver::new(&env)
            .with_project_dir(dir.path())
            .resolve(&ConfigOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Load(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let env = EnvSnapshot::default();
        let err = ConfigResolver::new(&env)
            .with_config_file("/definitely/not/here.toml")
            .resolve(&ConfigOverrides::default())
            .unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }
}
