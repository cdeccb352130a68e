//! Applying a registry to a settings tree.
//!
//! [`apply_deprecations`] folds every registered rule over the tree in
//! registration order. Each rule sees the tree as left by the rules before
//! it. The first rule that fails aborts the run: its error is returned
//! wrapped in [`Error::Rule`] and the partially rewritten tree is dropped.
use tracing::{debug, trace};

use crate::{
    context::AmbientContext,
    error::Error,
    message::RecordedDeprecation,
    registry::DeprecationRegistry,
    rule::{DeprecationCollector, DeprecationContext},
    value::Value,
};

/// The outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedDeprecations {
    /// The rewritten settings tree.
    pub settings: Value,
    /// Every reported deprecation, in the order the rules emitted them.
    pub deprecations: Vec<RecordedDeprecation>,
}

impl AppliedDeprecations {
    pub fn critical_count(&self) -> usize {
        self.deprecations.iter().filter(|d| d.is_critical()).count()
    }
}

/// Runs every rule of `registry` over `settings`.
///
/// # Errors
///
/// Returns [`Error::Rule`] naming the domain and rule of the first rule that
/// failed. No later rule runs.
pub fn apply_deprecations(
    mut settings: Value,
    registry: &DeprecationRegistry,
    ambient: &AmbientContext,
) -> Result<AppliedDeprecations, Error> {
    let mut deprecations = Vec::new();

    for entry in registry.iter() {
        let rule = entry.deprecation();
        let ctx = DeprecationContext::new(entry.domain(), ambient);
        let mut collector =
            DeprecationCollector::new(entry.domain(), rule.name(), &mut deprecations);

        trace!(domain = entry.domain(), rule = rule.name(), "Applying config deprecation");
        rule.apply(&mut settings, &ctx, &mut collector)
            .map_err(|source| Error::Rule {
                domain: entry.domain().to_string(),
                rule: rule.name().to_string(),
                source: Box::new(source),
            })?;
    }

    debug!(
        rules = registry.len(),
        deprecations = deprecations.len(),
        "Applied config deprecations"
    );
    Ok(AppliedDeprecations {
        settings,
        deprecations,
    })
}

/// A registry paired with one ambient snapshot.
///
/// Every call to [`DeprecationEngine::apply`] sees the same environment, so
/// running the engine twice over the same input yields the same output.
#[derive(Debug, Clone)]
pub struct DeprecationEngine {
    registry: DeprecationRegistry,
    ambient: AmbientContext,
}

impl DeprecationEngine {
    pub fn new(registry: DeprecationRegistry, ambient: AmbientContext) -> Self {
        Self { registry, ambient }
    }

    pub fn registry(&self) -> &DeprecationRegistry {
        &self.registry
    }

    pub fn ambient(&self) -> &AmbientContext {
        &self.ambient
    }

    pub fn apply(&self, settings: Value) -> Result<AppliedDeprecations, Error> {
        apply_deprecations(settings, &self.registry, &self.ambient)
    }
}
