//! Rules contributed by the root component.
//!
//! These run first, with paths resolved from the root of the settings tree.
use indexmap::IndexMap;

use crate::{
    deprecations,
    error::Error,
    factory::ConfigDeprecationFactory,
    message::DeprecationMessage,
    path,
    registry::DeprecationProvider,
    rule::{Deprecation, DeprecationCollector, DeprecationContext},
    value::Value,
};

const LOGGING_README: &str =
    "https://github.com/elastic/kibana/blob/master/src/core/server/logging/README.mdx";

const UNUSED_SETTINGS: &[&str] = &[
    "savedObjects.indexCheckTimeout",
    "server.xsrf.token",
    "maps.manifestServiceUrl",
    "optimize.lazy",
    "optimize.lazyPort",
    "optimize.lazyHost",
    "optimize.lazyPrebuild",
    "optimize.lazyProxyTimeout",
    "optimize.enabled",
    "optimize.bundleFilter",
    "optimize.bundleDir",
    "optimize.viewCaching",
    "optimize.watch",
    "optimize.watchPort",
    "optimize.watchHost",
    "optimize.watchPrebuild",
    "optimize.watchProxyTimeout",
    "optimize.useBundleCache",
    "optimize.sourceMaps",
    "optimize.workers",
    "optimize.profile",
    "optimize.validateSyntaxOfNodeModules",
];

const RENAMED_SETTINGS: &[(&str, &str)] = &[
    ("xpack.xpack_main.telemetry.config", "telemetry.config"),
    ("xpack.xpack_main.telemetry.url", "telemetry.url"),
    ("xpack.xpack_main.telemetry.enabled", "telemetry.enabled"),
    ("xpack.telemetry.enabled", "telemetry.enabled"),
    ("xpack.telemetry.config", "telemetry.config"),
    ("xpack.telemetry.banner", "telemetry.banner"),
    ("xpack.telemetry.url", "telemetry.url"),
    ("cpu.cgroup.path.override", "ops.cGroupOverrides.cpuPath"),
    ("cpuacct.cgroup.path.override", "ops.cGroupOverrides.cpuAcctPath"),
    ("server.xsrf.whitelist", "server.xsrf.allowlist"),
];

const UNUSED_ELASTICSEARCH_SETTINGS: &[&str] =
    &["elasticsearch.preserveHost", "elasticsearch.startupTimeout"];

/// The root component's rule list.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreDeprecations;

impl DeprecationProvider for CoreDeprecations {
    fn deprecations(&self, factory: &ConfigDeprecationFactory) -> Vec<Deprecation> {
        let mut rules: Vec<Deprecation> = UNUSED_SETTINGS
            .iter()
            .map(|setting| factory.unused_from_root(setting).into())
            .collect();
        rules.extend(
            RENAMED_SETTINGS
                .iter()
                .map(|(old, new)| factory.rename_from_root(old, new).into()),
        );
        rules.extend(
            UNUSED_ELASTICSEARCH_SETTINGS
                .iter()
                .map(|setting| factory.unused_from_root(setting).into()),
        );

        rules.extend(deprecations![
            factory.custom("rewriteCorsSettings", rewrite_cors_settings),
            factory.custom("configPathDeprecation", config_path_deprecation),
            factory.custom("dataPathDeprecation", data_path_deprecation),
            factory.custom("rewriteBasePathDeprecation", rewrite_base_path_deprecation),
            factory.custom("cspRulesDeprecation", csp_rules_deprecation),
            factory.custom(
                "mapManifestServiceUrlDeprecation",
                map_manifest_service_url_deprecation
            ),
            factory.custom("serverHostZeroDeprecation", server_host_zero_deprecation),
            factory.custom("opsLoggingEventDeprecation", |settings, _, out| {
                legacy_logging(
                    settings,
                    out,
                    &["logging.events.ops"],
                    "#loggingevents",
                    &format!(
                        "\"logging.events.ops\" has been deprecated and will be removed in 8.0. \
                         To access ops data moving forward, please enable debug logs for the \
                         \"metrics.ops\" context in your logging configuration. For more details, \
                         see {LOGGING_README}"
                    ),
                )
            }),
            factory.custom("requestLoggingEventDeprecation", |settings, _, out| {
                legacy_logging(
                    settings,
                    out,
                    &["logging.events.request", "logging.events.response"],
                    "#loggingevents",
                    &format!(
                        "\"logging.events.request\" and \"logging.events.response\" have been \
                         deprecated and will be removed in 8.0. To access request and/or response \
                         data moving forward, please enable debug logs for the \
                         \"http.server.response\" context in your logging configuration. For more \
                         details, see {LOGGING_README}"
                    ),
                )
            }),
            factory.custom("timezoneLoggingDeprecation", |settings, _, out| {
                legacy_logging(
                    settings,
                    out,
                    &["logging.timezone"],
                    "#loggingtimezone",
                    &format!(
                        "\"logging.timezone\" has been deprecated and will be removed in 8.0. \
                         To set the timezone moving forward, please add a timezone date modifier \
                         to the log pattern in your logging configuration. For more details, see \
                         {LOGGING_README}"
                    ),
                )
            }),
            factory.custom("destLoggingDeprecation", |settings, _, out| {
                legacy_logging(
                    settings,
                    out,
                    &["logging.dest"],
                    "#loggingdest",
                    &format!(
                        "\"logging.dest\" has been deprecated and will be removed in 8.0. \
                         To set the destination moving forward, you can use the \"console\" \
                         appender in your logging configuration or define a custom one. For more \
                         details, see {LOGGING_README}"
                    ),
                )
            }),
            factory.custom("quietLoggingDeprecation", |settings, _, out| {
                legacy_logging(
                    settings,
                    out,
                    &["logging.quiet"],
                    "#loggingquiet",
                    "\"logging.quiet\" has been deprecated and will be removed in 8.0. \
                     Moving forward, you can use \"logging.root.level:error\" in your \
                     logging configuration. ",
                )
            }),
            factory.custom("silentLoggingDeprecation", |settings, _, out| {
                legacy_logging(
                    settings,
                    out,
                    &["logging.silent"],
                    "#loggingsilent",
                    "\"logging.silent\" has been deprecated and will be removed in 8.0. \
                     Moving forward, you can use \"logging.root.level:off\" in your \
                     logging configuration. ",
                )
            }),
            factory.custom("verboseLoggingDeprecation", |settings, _, out| {
                legacy_logging(
                    settings,
                    out,
                    &["logging.verbose"],
                    "#loggingverbose",
                    "\"logging.verbose\" has been deprecated and will be removed in 8.0. \
                     Moving forward, you can use \"logging.root.level:all\" in your \
                     logging configuration. ",
                )
            }),
            factory.custom("jsonLoggingDeprecation", json_logging_deprecation),
            factory.custom("logRotateDeprecation", |settings, _, out| {
                legacy_logging(
                    settings,
                    out,
                    &["logging.rotate"],
                    "#rolling-file-appender",
                    &format!(
                        "\"logging.rotate\" and sub-options have been deprecated and will be \
                         removed in 8.0. Moving forward, you can enable log rotation using the \
                         \"rolling-file\" appender for a logger in your logging configuration. \
                         For more details, see {LOGGING_README}#rolling-file-appender"
                    ),
                )
            }),
            factory.custom("logEventsLogDeprecation", |settings, _, out| {
                legacy_logging(
                    settings,
                    out,
                    &["logging.events.log"],
                    "#loggingevents",
                    "\"logging.events.log\" has been deprecated and will be removed in 8.0. \
                     Moving forward, log levels can be customized on a per-logger basis \
                     using the new logging configuration. ",
                )
            }),
            factory.custom("logEventsErrorDeprecation", |settings, _, out| {
                legacy_logging(
                    settings,
                    out,
                    &["logging.events.error"],
                    "#loggingevents",
                    "\"logging.events.error\" has been deprecated and will be removed in 8.0. \
                     Moving forward, you can use \"logging.root.level: error\" in your \
                     logging configuration. ",
                )
            }),
            factory.custom("logFilterDeprecation", |settings, _, out| {
                legacy_logging(
                    settings,
                    out,
                    &["logging.filter"],
                    "#loggingfilter",
                    "\"logging.filter\" has been deprecated and will be removed in 8.0.",
                )
            }),
        ]);

        rules
    }
}

/// Reports a legacy logging setting with a link into the logging README.
/// Informational only; the tree is not changed.
fn legacy_logging(
    settings: &Value,
    out: &mut DeprecationCollector<'_>,
    paths: &[&str],
    anchor: &str,
    message: &str,
) -> Result<(), Error> {
    if paths.iter().any(|p| path::has(settings, p)) {
        out.add(
            DeprecationMessage::builder()
                .message(message)
                .documentation_url(format!("{LOGGING_README}{anchor}"))
                .build()?,
        );
    }
    Ok(())
}

pub(crate) fn rewrite_cors_settings(
    settings: &mut Value,
    _ctx: &DeprecationContext<'_>,
    out: &mut DeprecationCollector<'_>,
) -> Result<(), Error> {
    let Some(enabled) = path::get(settings, "server.cors").and_then(Value::as_bool) else {
        return Ok(());
    };

    out.add("\"server.cors\" is deprecated and has been replaced by \"server.cors.enabled\"");
    let mut cors = Value::mapping();
    path::set(&mut cors, "enabled", Value::Bool(enabled))?;
    path::set(settings, "server.cors", cors)?;
    Ok(())
}

fn config_path_deprecation(
    _settings: &mut Value,
    ctx: &DeprecationContext<'_>,
    out: &mut DeprecationCollector<'_>,
) -> Result<(), Error> {
    if ctx.has_env_var("CONFIG_PATH") {
        out.add(
            "Environment variable CONFIG_PATH is deprecated. \
             It has been replaced with KBN_PATH_CONF pointing to a config folder",
        );
    }
    Ok(())
}

fn data_path_deprecation(
    _settings: &mut Value,
    ctx: &DeprecationContext<'_>,
    out: &mut DeprecationCollector<'_>,
) -> Result<(), Error> {
    if ctx.has_env_var("DATA_PATH") {
        out.add(
            "Environment variable \"DATA_PATH\" will be removed.  \
             It has been replaced with kibana.yml setting \"path.data\"",
        );
    }
    Ok(())
}

pub(crate) fn rewrite_base_path_deprecation(
    settings: &mut Value,
    _ctx: &DeprecationContext<'_>,
    out: &mut DeprecationCollector<'_>,
) -> Result<(), Error> {
    if path::has(settings, "server.basePath") && !path::has(settings, "server.rewriteBasePath") {
        out.add(
            "You should set server.basePath along with server.rewriteBasePath. Starting in 7.0, \
             Kibana will expect that all requests start with server.basePath rather than \
             expecting you to rewrite the requests in your reverse proxy. Set \
             server.rewriteBasePath to false to preserve the current behavior and silence \
             this warning.",
        );
    }
    Ok(())
}

const NONCE_SOURCE: &str = "{nonce}";
const SELF_SOURCE: &str = "'self'";
const SELF_POLICIES: [&str; 2] = ["script-src", "style-src"];

/// Rewrites `csp.rules` entries of the form `<policy> <source>...`: nonce
/// sources are replaced by `'self'`, and the script and style policies must
/// always allow `'self'`. A later entry for the same policy replaces an
/// earlier one in place.
pub(crate) fn csp_rules_deprecation(
    settings: &mut Value,
    _ctx: &DeprecationContext<'_>,
    out: &mut DeprecationCollector<'_>,
) -> Result<(), Error> {
    let Some(rules) = path::get(settings, "csp.rules").filter(|rules| rules.is_truthy()) else {
        return Ok(());
    };
    let rules = rules.as_sequence().ok_or_else(|| Error::UnexpectedType {
        path: "csp.rules".to_string(),
        expected: "sequence",
        found: rules.type_name(),
    })?;

    let mut parsed: IndexMap<String, Vec<String>> = IndexMap::new();
    for (i, rule) in rules.iter().enumerate() {
        let rule = rule.as_str().ok_or_else(|| Error::UnexpectedType {
            path: format!("csp.rules.{i}"),
            expected: "string",
            found: rule.type_name(),
        })?;
        let mut parts = rule.split_whitespace();
        let policy = parts.next().unwrap_or_default().to_string();
        parsed.insert(policy, parts.map(str::to_string).collect());
    }

    let has_self = |sources: &[String]| sources.iter().any(|s| s.contains(SELF_SOURCE));
    let mut rewritten = Vec::with_capacity(parsed.len());
    for (policy, mut sources) in parsed {
        if sources.iter().any(|s| s.contains(NONCE_SOURCE)) {
            out.add(format!(
                "csp.rules no longer supports the {{nonce}} syntax. Replacing with 'self' in {policy}"
            ));
            sources.retain(|s| !s.contains(NONCE_SOURCE));
            if !has_self(&sources) {
                sources.push(SELF_SOURCE.to_string());
            }
        }

        if SELF_POLICIES.contains(&policy.as_str()) && !has_self(&sources) {
            out.add(format!(
                "csp.rules must contain the 'self' source. Automatically adding to {policy}."
            ));
            sources.push(SELF_SOURCE.to_string());
        }

        let rule = format!("{policy} {}", sources.join(" "));
        rewritten.push(Value::String(rule.trim().to_string()));
    }

    path::set(settings, "csp.rules", Value::Sequence(rewritten))?;
    Ok(())
}

fn map_manifest_service_url_deprecation(
    settings: &mut Value,
    _ctx: &DeprecationContext<'_>,
    out: &mut DeprecationCollector<'_>,
) -> Result<(), Error> {
    if path::has(settings, "map.manifestServiceUrl") {
        out.add(
            "You should no longer use the map.manifestServiceUrl setting in kibana.yml to \
             configure the location of the Elastic Maps Service settings. These settings have \
             moved to the \"map.emsTileApiUrl\" and \"map.emsFileApiUrl\" settings instead. \
             These settings are for development use only and should not be modified for use \
             in production environments.",
        );
    }
    Ok(())
}

fn server_host_zero_deprecation(
    settings: &mut Value,
    _ctx: &DeprecationContext<'_>,
    out: &mut DeprecationCollector<'_>,
) -> Result<(), Error> {
    if path::get(settings, "server.host").and_then(Value::as_str) == Some("0") {
        out.add(
            "Support for setting server.host to \"0\" in kibana.yml is deprecated and will be \
             removed in Kibana version 8.0.0. Instead use \"0.0.0.0\" to bind to all interfaces.",
        );
    }
    Ok(())
}

/// The development CLI passes `logging.json=false` to its child process, so
/// the warning is silenced when `env` is `development`.
fn json_logging_deprecation(
    settings: &mut Value,
    _ctx: &DeprecationContext<'_>,
    out: &mut DeprecationCollector<'_>,
) -> Result<(), Error> {
    let development = path::get(settings, "env").and_then(Value::as_str) == Some("development");
    if path::has(settings, "logging.json") && !development {
        out.add(
            DeprecationMessage::builder()
                .message(format!(
                    "\"logging.json\" has been deprecated and will be removed in 8.0. To specify \
                     log message format moving forward, you can configure the \"appender.layout\" \
                     property for every custom appender in your logging configuration. There is \
                     currently no default layout for custom appenders and each one must be \
                     declared explicitly. For more details, see {LOGGING_README}"
                ))
                .documentation_url(LOGGING_README)
                .build()?,
        );
    }
    Ok(())
}
