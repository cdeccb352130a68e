//! Host-side entry point for running deprecations.
//!
//! This module provides the [`ConfigService`] type, which ties the pieces a
//! host needs together: loading settings files, running the engine over
//! them, logging every reported deprecation and deciding whether the host may
//! start with the result.
//!
//! # Example
//!
//! ```rust,no_run
//! use config_deprecation::ConfigService;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ConfigService::standard();
//!
//!     // Load, merge and rewrite the settings
//!     let validated = service.load(&["config/kibana.yml"], &["server.port=5601"])?;
//!
//!     // Refuse to start on critical deprecations
//!     validated.ensure_startable()?;
//!
//!     for (domain, messages) in validated.by_domain() {
//!         println!("[{domain}] {} deprecation(s)", messages.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
use std::path::Path;

use indexmap::IndexMap;
use tracing::{error, info, warn};

use crate::{
    atomic::AtomicFile,
    context::AmbientContext,
    engine::DeprecationEngine,
    error::Error,
    loader,
    message::RecordedDeprecation,
    registry::DeprecationRegistry,
    value::Value,
};

/// The rewritten settings together with everything reported while
/// rewriting them.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSettings {
    pub settings: Value,
    pub deprecations: Vec<RecordedDeprecation>,
}

impl ValidatedSettings {
    pub fn critical_count(&self) -> usize {
        self.deprecations.iter().filter(|d| d.is_critical()).count()
    }

    /// Groups the reported deprecations by the domain of the component that
    /// registered the rule. Domains appear in the order they first reported
    /// something; the root component's domain is `""`.
    pub fn by_domain(&self) -> IndexMap<&str, Vec<&RecordedDeprecation>> {
        let mut grouped: IndexMap<&str, Vec<&RecordedDeprecation>> = IndexMap::new();
        for deprecation in &self.deprecations {
            grouped
                .entry(deprecation.domain.as_str())
                .or_default()
                .push(deprecation);
        }
        grouped
    }

    /// Applies the startup policy: warnings are tolerated, any critical
    /// deprecation is not.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CriticalDeprecations`] with the number of critical
    /// messages when there is at least one.
    pub fn ensure_startable(&self) -> Result<(), Error> {
        match self.critical_count() {
            0 => Ok(()),
            count => Err(Error::CriticalDeprecations(count)),
        }
    }
}

/// Runs a fixed registry over settings on behalf of a host.
///
/// `ConfigService` is responsible for:
///
/// - Reading and merging settings files and command-line overrides
/// - Rewriting the settings with every registered rule
/// - Logging each reported deprecation
/// - Persisting the rewritten settings on request
///
/// The environment is captured once when the service is created, so every
/// run of the same service sees the same ambient inputs.
#[derive(Debug, Clone)]
pub struct ConfigService {
    engine: DeprecationEngine,
}

impl ConfigService {
    /// Creates a service over `registry`, capturing the current process
    /// environment.
    pub fn new(registry: DeprecationRegistry) -> Self {
        Self::with_ambient(registry, AmbientContext::capture())
    }

    pub fn with_ambient(registry: DeprecationRegistry, ambient: AmbientContext) -> Self {
        Self {
            engine: DeprecationEngine::new(registry, ambient),
        }
    }

    /// A service over [`DeprecationRegistry::standard`].
    pub fn standard() -> Self {
        Self::new(DeprecationRegistry::standard())
    }

    pub fn registry(&self) -> &DeprecationRegistry {
        self.engine.registry()
    }

    /// Rewrites `raw` and logs every reported deprecation.
    ///
    /// Warnings are logged at `warn` level and critical deprecations at
    /// `error` level, each with the reporting domain and rule as fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rule`] when a rule fails. Nothing is logged for the
    /// messages reported before the failure.
    pub fn validate(&self, raw: Value) -> Result<ValidatedSettings, Error> {
        let applied = self.engine.apply(raw)?;

        for deprecation in &applied.deprecations {
            let message = &deprecation.message;
            let url = message.documentation_url.as_deref().unwrap_or_default();
            if deprecation.is_critical() {
                error!(
                    domain = %deprecation.domain,
                    rule = %deprecation.rule,
                    documentation_url = url,
                    "{}",
                    message.message
                );
            } else {
                warn!(
                    domain = %deprecation.domain,
                    rule = %deprecation.rule,
                    documentation_url = url,
                    "{}",
                    message.message
                );
            }
        }

        Ok(ValidatedSettings {
            settings: applied.settings,
            deprecations: applied.deprecations,
        })
    }

    /// Reads `files` in order, applies `overrides` and validates the
    /// result.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] when a file cannot be read
    /// - [`Error::UnsupportedFormat`] for an unknown file extension
    /// - [`Error::InvalidOverride`] for a malformed override
    /// - [`Error::Rule`] when a rule fails
    pub fn load<P, S>(&self, files: &[P], overrides: &[S]) -> Result<ValidatedSettings, Error>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let raw = loader::load_settings(files, overrides)?;
        self.validate(raw)
    }

    /// Atomically replaces `destination` with the rewritten settings, in the
    /// format its extension names.
    pub fn persist(
        &self,
        validated: &ValidatedSettings,
        destination: impl AsRef<Path>,
    ) -> Result<(), Error> {
        let destination = destination.as_ref();
        AtomicFile::new(destination).write_settings(&validated.settings)?;
        info!(file = %destination.display(), "Wrote rewritten settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        deprecations, factory::ConfigDeprecationFactory, message::DeprecationLevel,
        registry::RegistryBuilder,
    };
    use pretty_assertions::assert_eq;

    fn yaml(source: &str) -> Value {
        serde_yaml::from_str(source).unwrap()
    }

    fn service() -> ConfigService {
        let registry = RegistryBuilder::new()
            .provider("", &|f: &ConfigDeprecationFactory| {
                deprecations![
                    f.unused_from_root("legacy.flag"),
                    f.rename_from_root("old.port", "server.port")
                        .level(DeprecationLevel::Critical),
                ]
            })
            .provider("monitoring", &|f: &ConfigDeprecationFactory| {
                deprecations![f.unused("legacy")]
            })
            .build();
        ConfigService::with_ambient(registry, AmbientContext::default())
    }

    #[test]
    fn test_warnings_do_not_block_startup() {
        let validated = service().validate(yaml("legacy:\n  flag: true\n")).unwrap();

        assert_eq!(validated.deprecations.len(), 1);
        assert_eq!(validated.critical_count(), 0);
        assert!(validated.ensure_startable().is_ok());
    }

    #[test]
    fn test_critical_blocks_startup() {
        let validated = service().validate(yaml("old:\n  port: 1\n")).unwrap();

        assert_eq!(validated.settings, yaml("server:\n  port: 1\n"));
        assert!(matches!(
            validated.ensure_startable(),
            Err(Error::CriticalDeprecations(1))
        ));
    }

    #[test]
    fn test_by_domain_groups_in_first_seen_order() {
        let validated = service()
            .validate(yaml("monitoring:\n  legacy: 1\nlegacy:\n  flag: 1\n"))
            .unwrap();

        let grouped = validated.by_domain();
        let domains: Vec<_> = grouped.keys().copied().collect();
        assert_eq!(domains, vec!["", "monitoring"]);
        assert_eq!(grouped["monitoring"][0].rule, "unused(monitoring.legacy)");
    }

    #[test]
    fn test_load_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("kibana.yml");
        std::fs::write(&file, "old:\n  port: 5601\n").unwrap();

        let service = service();
        let validated = service.load(&[&file], &["legacy.flag=true"]).unwrap();
        assert_eq!(validated.deprecations.len(), 2);

        service.persist(&validated, &file).unwrap();
        let reloaded = service.load(&[&file], &[] as &[&str]).unwrap();
        assert_eq!(reloaded.settings, yaml("server:\n  port: 5601\nlegacy:\n  flag: true\n"));
        assert_eq!(reloaded.deprecations.len(), 1);
    }
}
