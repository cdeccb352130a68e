//! The `check` command behind the binary: load settings, rewrite them,
//! render a report and optionally write the result back.
use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;
use tracing::info;

use crate::{
    error::Error,
    message::{DeprecationLevel, RecordedDeprecation},
    registry::DeprecationRegistry,
    service::{ConfigService, ValidatedSettings},
};

/// How the deprecation report is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Settings files, later files winning.
    pub configs: Vec<PathBuf>,
    /// `key.path=value` overrides applied after the files.
    pub overrides: Vec<String>,
    /// Write the rewritten settings back to the single config file.
    pub write: bool,
    pub format: ReportFormat,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    deprecations: &'a [RecordedDeprecation],
    critical: usize,
}

/// What a successful `check` produced.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub validated: ValidatedSettings,
    /// The rendered report, newline terminated.
    pub report: String,
}

impl CheckOutcome {
    /// `Ok` when the host may start with the rewritten settings.
    pub fn ensure_startable(&self) -> Result<(), Error> {
        self.validated.ensure_startable()
    }

    /// The process exit code: `0` when the host may start, `1` otherwise.
    pub fn exit_code(&self) -> u8 {
        match self.validated.critical_count() {
            0 => 0,
            _ => 1,
        }
    }
}

/// Loads, rewrites and reports `options.configs`.
///
/// The report is rendered before any startup decision so the caller can
/// print it even when [`CheckOutcome::ensure_startable`] fails. With
/// `options.write` the rewritten settings replace the config file.
///
/// # Errors
///
/// - [`Error::WriteRejected`] when `write` is combined with several files or
///   with overrides, which would leak into the written file
/// - every error of [`ConfigService::load`], including [`Error::Rule`]
/// - [`Error::Io`] and the serializer errors when writing back fails
pub fn check(service: &ConfigService, options: &CheckOptions) -> Result<CheckOutcome, Error> {
    let target = if options.write {
        match options.configs.as_slice() {
            [single] if options.overrides.is_empty() => Some(single),
            [_] => return Err(Error::WriteRejected("overrides would be written to the file")),
            _ => return Err(Error::WriteRejected("exactly one config file is required")),
        }
    } else {
        None
    };

    info!(
        rules = service.registry().len(),
        files = options.configs.len(),
        "Checking settings"
    );
    let validated = service.load(options.configs.as_slice(), options.overrides.as_slice())?;

    let report = match options.format {
        ReportFormat::Text => render_text(&validated),
        ReportFormat::Json => render_json(&validated)?,
    };

    if let Some(target) = target {
        service.persist(&validated, target)?;
    }

    Ok(CheckOutcome { validated, report })
}

/// Deprecations grouped by domain, one line per message followed by its
/// documentation link and manual steps.
pub fn render_text(validated: &ValidatedSettings) -> String {
    if validated.deprecations.is_empty() {
        return "No deprecated settings found\n".to_string();
    }

    let mut lines = Vec::new();
    for (domain, deprecations) in validated.by_domain() {
        lines.push(format!("[{}]", display_domain(domain)));
        for deprecation in deprecations {
            let message = &deprecation.message;
            let marker = match message.effective_level() {
                DeprecationLevel::Critical => "CRITICAL",
                DeprecationLevel::Warning => "warning",
            };
            lines.push(format!("  {marker}: {}", message.message));
            if let Some(url) = &message.documentation_url {
                lines.push(format!("    see {url}"));
            }
            lines.extend(message.manual_steps.iter().map(|step| format!("    - {step}")));
        }
    }
    lines.push(String::new());
    lines.join("\n")
}

pub fn render_json(validated: &ValidatedSettings) -> Result<String, Error> {
    let report = JsonReport {
        deprecations: &validated.deprecations,
        critical: validated.critical_count(),
    };
    let mut rendered = serde_json::to_string_pretty(&report)?;
    rendered.push('\n');
    Ok(rendered)
}

/// Every registered rule in run order, with its domain.
pub fn render_rules(registry: &DeprecationRegistry) -> String {
    registry
        .iter()
        .map(|entry| {
            format!(
                "{:<12} {}\n",
                display_domain(entry.domain()),
                entry.deprecation().name()
            )
        })
        .collect()
}

fn display_domain(domain: &str) -> &str {
    if domain.is_empty() { "<root>" } else { domain }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        deprecations, factory::ConfigDeprecationFactory, registry::RegistryBuilder, value::Value,
    };
    use pretty_assertions::assert_eq;

    fn validated(source: &str) -> ValidatedSettings {
        let registry = RegistryBuilder::new()
            .provider("", &|f: &ConfigDeprecationFactory| {
                deprecations![
                    f.rename_from_root("old", "new"),
                    f.unused_from_root("legacy").documentation_url("https://example.com/legacy"),
                ]
            })
            .build();
        let settings: Value = serde_yaml::from_str(source).unwrap();
        ConfigService::with_ambient(registry, Default::default())
            .validate(settings)
            .unwrap()
    }

    #[test]
    fn test_render_text_groups_by_domain() {
        let report = render_text(&validated("old: 1\nlegacy: true\n"));
        assert_eq!(
            report,
            "[<root>]\n\
             \x20 warning: \"old\" is deprecated and has been replaced by \"new\"\n\
             \x20   - Replace \"old\" with \"new\" in the config file.\n\
             \x20 warning: \"legacy\" is deprecated and is no longer used\n\
             \x20   see https://example.com/legacy\n\
             \x20   - Remove \"legacy\" from the config.\n"
        );
    }

    #[test]
    fn test_render_text_without_deprecations() {
        assert_eq!(render_text(&validated("new: 1\n")), "No deprecated settings found\n");
    }

    #[test]
    fn test_exit_code_follows_critical_count() {
        let outcome = CheckOutcome {
            validated: validated("old: 1\n"),
            report: String::new(),
        };
        assert_eq!(outcome.exit_code(), 0);
        assert!(outcome.ensure_startable().is_ok());
    }

    #[test]
    fn test_render_rules_lists_run_order() {
        let registry = RegistryBuilder::new()
            .provider("", &|f: &ConfigDeprecationFactory| deprecations![f.unused_from_root("a")])
            .provider("reporting", &|f: &ConfigDeprecationFactory| deprecations![f.unused("b")])
            .build();
        assert_eq!(
            render_rules(&registry),
            "<root>       unused(a)\nreporting    unused(reporting.b)\n"
        );
    }
}
