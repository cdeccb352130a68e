//! Rules contributed by the monitoring plugin.
//!
//! Monitoring settings used to live under `xpack.monitoring`. The narrow
//! renames into `monitoring.ui` run first. The blanket
//! `xpack.monitoring` -> `monitoring` rename runs after them and, like every
//! rename, never touches a `monitoring` key that already exists.
use crate::{
    Plugin, deprecations,
    error::Error,
    factory::ConfigDeprecationFactory,
    path,
    registry::DeprecationProvider,
    rule::{Deprecation, DeprecationCollector, DeprecationContext},
    value::Value,
};

pub const CLUSTER_ALERTS_ADDRESS_CONFIG_KEY: &str =
    "cluster_alerts.email_notifications.email_address";

#[derive(Debug, Default, Clone, Copy, Plugin)]
#[plugin(path = "monitoring", order = 100)]
pub struct MonitoringDeprecations;

impl DeprecationProvider for MonitoringDeprecations {
    fn deprecations(&self, factory: &ConfigDeprecationFactory) -> Vec<Deprecation> {
        deprecations![
            factory.rename_from_root(
                "xpack.monitoring.max_bucket_size",
                "monitoring.ui.max_bucket_size"
            ),
            factory.rename_from_root(
                "xpack.monitoring.min_interval_seconds",
                "monitoring.ui.min_interval_seconds"
            ),
            factory.rename_from_root(
                "xpack.monitoring.show_license_expiration",
                "monitoring.ui.show_license_expiration"
            ),
            factory.rename_from_root(
                "xpack.monitoring.ui.container.elasticsearch.enabled",
                "monitoring.ui.container.elasticsearch.enabled"
            ),
            factory.rename_from_root(
                "xpack.monitoring.ui.container.logstash.enabled",
                "monitoring.ui.container.logstash.enabled"
            ),
            factory.rename_from_root(
                "xpack.monitoring.elasticsearch",
                "monitoring.ui.elasticsearch"
            ),
            factory.rename_from_root("xpack.monitoring.ccs.enabled", "monitoring.ui.ccs.enabled"),
            factory.rename_from_root(
                "xpack.monitoring.elasticsearch.logFetchCount",
                "monitoring.ui.elasticsearch.logFetchCount"
            ),
            factory.rename_from_root("xpack.monitoring", "monitoring"),
            factory.custom("clusterAlertsEmailAddress", cluster_alerts_email_address),
            factory.custom("elasticsearchBuiltinUser", elasticsearch_builtin_user),
            factory.custom("elasticsearchSslPairing", elasticsearch_ssl_pairing),
            factory.rename("xpack_api_polling_frequency_millis", "licensing.api_polling_frequency"),
        ]
    }
}

fn enabled_or_default(settings: &Value, path: &str) -> bool {
    path::get(settings, path).is_none_or(Value::is_truthy)
}

/// E-mail notifications of cluster alerts need a destination address once
/// they are enabled, which they are unless switched off.
fn cluster_alerts_email_address(
    settings: &mut Value,
    ctx: &DeprecationContext<'_>,
    out: &mut DeprecationCollector<'_>,
) -> Result<(), Error> {
    let email_notifications = enabled_or_default(settings, "monitoring.cluster_alerts.enabled")
        && enabled_or_default(
            settings,
            "monitoring.cluster_alerts.email_notifications.enabled",
        );
    let configured = [
        format!("monitoring.{CLUSTER_ALERTS_ADDRESS_CONFIG_KEY}"),
        format!("xpack.monitoring.{CLUSTER_ALERTS_ADDRESS_CONFIG_KEY}"),
    ]
    .iter()
    .any(|key| path::get(settings, key).is_some_and(Value::is_truthy));

    if email_notifications && !configured {
        out.add(format!(
            "Config key [{}] will be required for email notifications to work in 8.0.",
            path::join(ctx.from_path(), CLUSTER_ALERTS_ADDRESS_CONFIG_KEY)
        ));
    }
    Ok(())
}

fn elasticsearch_builtin_user(
    settings: &mut Value,
    ctx: &DeprecationContext<'_>,
    out: &mut DeprecationCollector<'_>,
) -> Result<(), Error> {
    let base = path::join(ctx.from_path(), "ui.elasticsearch");
    let username = path::get(settings, &path::join(&base, "username")).and_then(Value::as_str);

    if let Some(user @ ("elastic" | "kibana")) = username {
        out.add(format!(
            "Setting [{base}.username] to \"{user}\" is deprecated. \
             You should use the \"kibana_system\" user instead."
        ));
    }
    Ok(())
}

fn elasticsearch_ssl_pairing(
    settings: &mut Value,
    ctx: &DeprecationContext<'_>,
    out: &mut DeprecationCollector<'_>,
) -> Result<(), Error> {
    let base = path::join(ctx.from_path(), "ui.elasticsearch.ssl");
    let Some(ssl) = path::get(settings, &base).and_then(Value::as_mapping) else {
        return Ok(());
    };

    let (present, missing) = match (ssl.contains_key("key"), ssl.contains_key("certificate")) {
        (true, false) => ("key", "certificate"),
        (false, true) => ("certificate", "key"),
        _ => return Ok(()),
    };
    out.add(format!(
        "Setting [{base}.{present}] without [{base}.{missing}] is deprecated. This has no \
         effect, you should use both settings to enable TLS client authentication to \
         Elasticsearch."
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::AmbientContext,
        engine::apply_deprecations,
        message::RecordedDeprecation,
        registry::{Plugin as _, RegistryBuilder},
    };
    use pretty_assertions::assert_eq;

    fn yaml(source: &str) -> Value {
        serde_yaml::from_str(source).unwrap()
    }

    fn apply(settings: Value) -> (Value, Vec<RecordedDeprecation>) {
        let registry = RegistryBuilder::new()
            .plugin::<MonitoringDeprecations>()
            .build();
        let applied = apply_deprecations(settings, &registry, &AmbientContext::default()).unwrap();
        (applied.settings, applied.deprecations)
    }

    fn with_address(mut settings: Value, prefix: &str) -> Value {
        let key = path::join(prefix, CLUSTER_ALERTS_ADDRESS_CONFIG_KEY);
        path::set(&mut settings, &key, Value::from("ops@example.com")).unwrap();
        settings
    }

    #[test]
    fn test_plugin_metadata() {
        assert_eq!(MonitoringDeprecations::PATH, "monitoring");
        assert_eq!(MonitoringDeprecations::ORDER, 100);
    }

    #[test]
    fn test_narrow_renames_run_before_blanket_rename() {
        let settings = with_address(
            yaml("xpack:\n  monitoring:\n    max_bucket_size: 10\n"),
            "xpack.monitoring",
        );
        let (result, messages) = apply(settings);

        // the narrow rename created monitoring, so the rest of xpack.monitoring
        // is reported and dropped
        assert_eq!(result, yaml("monitoring:\n  ui:\n    max_bucket_size: 10\n"));
        let rules: Vec<_> = messages.iter().map(|m| m.rule.as_str()).collect();
        assert_eq!(
            rules,
            vec![
                "rename(xpack.monitoring.max_bucket_size -> monitoring.ui.max_bucket_size)",
                "rename(xpack.monitoring -> monitoring)",
                "clusterAlertsEmailAddress",
            ]
        );
        assert!(
            messages[1]
                .message
                .message
                .ends_with("However both keys are present, ignoring \"xpack.monitoring\"")
        );
    }

    #[test]
    fn test_blanket_rename_conflict_keeps_new_value() {
        let settings = with_address(
            yaml("xpack:\n  monitoring:\n    enabled: true\nmonitoring:\n  enabled: false\n"),
            "monitoring",
        );
        let (result, messages) = apply(settings);

        assert_eq!(path::get(&result, "monitoring.enabled"), Some(&Value::Bool(false)));
        assert!(!path::has(&result, "xpack"));
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message.message.contains("ignoring \"xpack.monitoring\""));
    }

    #[test]
    fn test_missing_email_address_is_reported() {
        let (_, messages) = apply(Value::mapping());
        assert_eq!(messages.len(), 1);
        assert!(
            messages[0]
                .message
                .message
                .contains("[monitoring.cluster_alerts.email_notifications.email_address]")
        );
        assert_eq!(messages[0].domain, "monitoring");
    }

    #[test]
    fn test_legacy_address_counts_as_configured() {
        let settings = with_address(Value::mapping(), "xpack.monitoring");
        let (result, messages) = apply(settings);
        // the blanket rename moved it before the check ran
        assert!(path::has(
            &result,
            "monitoring.cluster_alerts.email_notifications.email_address"
        ));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].rule, "rename(xpack.monitoring -> monitoring)");
    }

    #[test]
    fn test_disabled_cluster_alerts_need_no_address() {
        let (_, messages) = apply(yaml("monitoring:\n  cluster_alerts:\n    enabled: false\n"));
        assert!(messages.is_empty());
    }

    #[test]
    fn test_builtin_users_are_reported() {
        for user in ["elastic", "kibana"] {
            let settings = with_address(
                yaml(&format!("monitoring:\n  ui:\n    elasticsearch:\n      username: {user}\n")),
                "monitoring",
            );
            let (_, messages) = apply(settings);
            assert_eq!(messages.len(), 1);
            assert!(messages[0].message.message.contains(&format!("\"{user}\"")));
        }

        let settings = with_address(
            yaml("monitoring:\n  ui:\n    elasticsearch:\n      username: kibana_system\n"),
            "monitoring",
        );
        assert!(apply(settings).1.is_empty());
    }

    #[test]
    fn test_ssl_key_without_certificate() {
        let settings = with_address(
            yaml("monitoring:\n  ui:\n    elasticsearch:\n      ssl:\n        key: /k.pem\n"),
            "monitoring",
        );
        let (_, messages) = apply(settings);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message.message.starts_with(
            "Setting [monitoring.ui.elasticsearch.ssl.key] without \
             [monitoring.ui.elasticsearch.ssl.certificate]"
        ));
    }

    #[test]
    fn test_polling_frequency_renamed_within_domain() {
        let settings = with_address(
            yaml("monitoring:\n  xpack_api_polling_frequency_millis: 5000\n"),
            "monitoring",
        );
        let (result, messages) = apply(settings);

        assert_eq!(
            path::get(&result, "monitoring.licensing.api_polling_frequency"),
            Some(&Value::from(5000i64))
        );
        assert_eq!(messages.len(), 1);
    }
}
