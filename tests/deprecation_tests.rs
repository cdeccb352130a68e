//! Integration tests for applying deprecation rules to settings trees.

use config_deprecation::{
    AmbientContext, ConfigDeprecationFactory, DeprecationRegistry, RecordedDeprecation,
    RegistryBuilder, Value, apply_deprecations, builtin::CoreDeprecations, deprecations, path,
};
use pretty_assertions::assert_eq;

fn yaml(source: &str) -> Value {
    serde_yaml::from_str(source).expect("Failed to parse settings")
}

fn root_registry(rules: Vec<config_deprecation::Deprecation>) -> DeprecationRegistry {
    RegistryBuilder::new().rules("", rules).build()
}

fn run(settings: Value, registry: &DeprecationRegistry) -> (Value, Vec<RecordedDeprecation>) {
    let applied = apply_deprecations(settings, registry, &AmbientContext::default())
        .expect("Failed to apply deprecations");
    (applied.settings, applied.deprecations)
}

fn core_registry() -> DeprecationRegistry {
    RegistryBuilder::new().provider("", &CoreDeprecations).build()
}

#[test]
fn test_rename_without_old_path_is_noop() {
    let factory = ConfigDeprecationFactory::new("");
    let registry = root_registry(deprecations![factory.rename_from_root("a.old", "a.new")]);

    for source in ["{}\n", "a:\n  other: 1\n", "a: 5\n", "a:\n  new: [1, 2]\n"] {
        let settings = yaml(source);
        let (result, messages) = run(settings.clone(), &registry);
        assert_eq!(result, settings, "{source}");
        assert!(messages.is_empty(), "{source}");
    }
}

#[test]
fn test_rename_moves_value_with_one_message() {
    let factory = ConfigDeprecationFactory::new("");
    let registry = root_registry(deprecations![factory.rename_from_root("a.old", "b.new")]);

    for source in [
        "a:\n  old: 1\n",
        "a:\n  old:\n    nested: [x]\n",
        "a:\n  old: null\n  keep: true\n",
    ] {
        let settings = yaml(source);
        let original = path::get(&settings, "a.old").cloned();

        let (result, messages) = run(settings, &registry);

        assert_eq!(path::get(&result, "b.new").cloned(), original, "{source}");
        assert!(!path::has(&result, "a.old"), "{source}");
        assert_eq!(messages.len(), 1, "{source}");
        assert!(messages[0].message.message.contains("\"a.old\""));
        assert!(messages[0].message.message.contains("\"b.new\""));
    }
}

#[test]
fn test_rename_never_overwrites_new_value() {
    let factory = ConfigDeprecationFactory::new("");
    let registry = root_registry(deprecations![factory.rename_from_root("a.old", "a.new")]);

    let (result, messages) = run(yaml("a:\n  old: 1\n  new: 2\n"), &registry);

    assert_eq!(path::get(&result, "a.new"), Some(&Value::from(2i64)));
    assert!(!path::has(&result, "a.old"));
    assert_eq!(messages.len(), 1);
    assert!(messages[0].message.message.contains("However both keys are present"));
}

#[test]
fn test_order_a_then_b() {
    let factory = ConfigDeprecationFactory::new("");
    let registry = root_registry(deprecations![
        factory.rename_from_root("x.y", "x.z"),
        factory.rename_from_root("x", "w"),
    ]);

    let (result, messages) = run(yaml("x:\n  y: 1\n"), &registry);

    assert_eq!(result, yaml("w:\n  z: 1\n"));
    assert_eq!(messages.len(), 2);
}

#[test]
fn test_order_b_then_a() {
    let factory = ConfigDeprecationFactory::new("");
    let registry = root_registry(deprecations![
        factory.rename_from_root("x", "w"),
        factory.rename_from_root("x.y", "x.z"),
    ]);

    let (result, messages) = run(yaml("x:\n  y: 1\n"), &registry);

    // x was already moved when the narrower rule ran
    assert_eq!(result, yaml("w:\n  y: 1\n"));
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].rule, "rename(x -> w)");
}

#[test]
fn test_base_path_scenario() {
    let settings = yaml("server:\n  basePath: /x\n");
    let (result, messages) = run(settings.clone(), &core_registry());

    assert_eq!(result, settings);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].message.message.contains("server.rewriteBasePath"));
}

#[test]
fn test_cors_scenario() {
    let (result, messages) = run(yaml("server:\n  cors: true\n"), &core_registry());

    assert_eq!(result, yaml("server:\n  cors:\n    enabled: true\n"));
    assert_eq!(messages.len(), 1);
}

#[test]
fn test_ops_logging_scenario() {
    let settings = yaml("logging:\n  events:\n    ops: {}\n");
    let (result, messages) = run(settings.clone(), &core_registry());

    assert_eq!(result, settings);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].message.message.contains("\"logging.events.ops\""));
    assert!(messages[0].message.documentation_url.is_some());
}

/// Rules that rewrite the tree; everything else only reports.
fn rewrites(deprecation: &RecordedDeprecation) -> bool {
    deprecation.rule.starts_with("rename(")
        || deprecation.rule == "rewriteCorsSettings"
        || deprecation.rule == "cspRulesDeprecation"
}

#[test]
fn test_second_pass_over_standard_registry_changes_nothing() {
    let registry = DeprecationRegistry::standard();
    let settings = yaml(
        r#"
server:
  cors: true
  basePath: /kibana
  xsrf:
    whitelist: [/api/status]
csp:
  rules:
    - "script-src 'unsafe-eval' {nonce}"
    - "style-src 'unsafe-inline'"
cpu:
  cgroup:
    path:
      override: /sys/fs/cgroup
xpack:
  telemetry:
    enabled: false
  monitoring:
    max_bucket_size: 10000
    elasticsearch:
      username: elastic
    cluster_alerts:
      email_notifications:
        email_address: ops@example.com
logging:
  dest: stdout
  events:
    ops: "*"
optimize:
  lazy: true
"#,
    );

    let (first_tree, first_messages) = run(settings, &registry);
    assert!(first_messages.iter().any(rewrites));

    let (second_tree, second_messages) = run(first_tree.clone(), &registry);

    assert_eq!(second_tree, first_tree);
    let informational: Vec<_> = first_messages
        .into_iter()
        .filter(|d| !rewrites(d))
        .collect();
    assert_eq!(second_messages, informational);
}

#[test]
fn test_standard_registry_end_to_end() {
    let registry = DeprecationRegistry::standard();
    let settings = yaml(
        r#"
xpack:
  monitoring:
    min_interval_seconds: 10
    elasticsearch:
      ssl:
        certificate: /cert.pem
    cluster_alerts:
      enabled: false
"#,
    );

    let (result, messages) = run(settings, &registry);

    // monitoring exists once the narrow renames ran, so cluster_alerts is
    // dropped by the blanket rename and the default applies again
    assert_eq!(
        result,
        yaml(
            r#"
monitoring:
  ui:
    min_interval_seconds: 10
    elasticsearch:
      ssl:
        certificate: /cert.pem
"#
        )
    );
    let rules: Vec<_> = messages.iter().map(|d| d.rule.as_str()).collect();
    assert_eq!(
        rules,
        vec![
            "rename(xpack.monitoring.min_interval_seconds -> monitoring.ui.min_interval_seconds)",
            "rename(xpack.monitoring.elasticsearch -> monitoring.ui.elasticsearch)",
            "rename(xpack.monitoring -> monitoring)",
            "clusterAlertsEmailAddress",
            "elasticsearchSslPairing",
        ]
    );
    assert!(messages[2].message.message.contains("However both keys are present"));
    assert!(messages.iter().all(|d| d.domain == "monitoring"));
}

#[test]
fn test_rename_conflict_between_mappings_keeps_new_value() {
    let factory = ConfigDeprecationFactory::new("");
    let registry = root_registry(deprecations![factory.rename_from_root("old", "new")]);

    let (result, messages) = run(yaml("old:\n  a: 1\nnew:\n  c: 4\n"), &registry);

    assert_eq!(result, yaml("new:\n  c: 4\n"));
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].message.message,
        "\"old\" is deprecated and has been replaced by \"new\". \
         However both keys are present, ignoring \"old\""
    );
    assert_eq!(messages[0].message.manual_steps.len(), 2);
}

#[test]
fn test_environment_rules_read_the_snapshot() {
    let ambient =
        AmbientContext::from_vars([("CONFIG_PATH", "/etc/kibana"), ("DATA_PATH", "/data")]);

    let applied = apply_deprecations(Value::mapping(), &core_registry(), &ambient)
        .expect("Failed to apply deprecations");

    let rules: Vec<_> = applied.deprecations.iter().map(|d| d.rule.as_str()).collect();
    assert_eq!(rules, vec!["configPathDeprecation", "dataPathDeprecation"]);
    assert_eq!(applied.settings, Value::mapping());
}

#[test]
fn test_malformed_csp_rules_abort_the_run() {
    let err = apply_deprecations(
        yaml("csp:\n  rules: \"script-src 'self'\"\n"),
        &core_registry(),
        &AmbientContext::default(),
    )
    .unwrap_err();

    match err {
        config_deprecation::Error::Rule { domain, rule, .. } => {
            assert_eq!(domain, "");
            assert_eq!(rule, "cspRulesDeprecation");
        }
        other => panic!("Unexpected error: {other}"),
    }
}
