//! The deprecation rule model.
//!
//! A rule inspects the settings tree, reports deprecated usage through a
//! [`DeprecationCollector`] and may rewrite the tree into its supported form.
//! Rules must be idempotent: once a rule has rewritten the tree, applying it
//! again must change nothing.
use std::fmt;

use crate::{
    context::AmbientContext,
    error::Error,
    message::{DeprecationMessage, RecordedDeprecation},
    value::Value,
};

/// What a rule can see while it runs.
#[derive(Debug, Clone, Copy)]
pub struct DeprecationContext<'a> {
    from_path: &'a str,
    ambient: &'a AmbientContext,
}

impl<'a> DeprecationContext<'a> {
    pub fn new(from_path: &'a str, ambient: &'a AmbientContext) -> Self {
        Self { from_path, ambient }
    }

    /// Config path of the component that contributed the rule. Empty for
    /// rules contributed by the root.
    pub fn from_path(&self) -> &'a str {
        self.from_path
    }

    pub fn ambient(&self) -> &'a AmbientContext {
        self.ambient
    }

    pub fn env_var(&self, name: &str) -> Option<&'a str> {
        self.ambient.env_var(name)
    }

    pub fn has_env_var(&self, name: &str) -> bool {
        self.ambient.has_env_var(name)
    }
}

/// Accumulates the messages of one rule, tagging each with the rule's
/// domain and name. Adding a message never fails.
pub struct DeprecationCollector<'a> {
    domain: &'a str,
    rule: &'a str,
    sink: &'a mut Vec<RecordedDeprecation>,
}

impl<'a> DeprecationCollector<'a> {
    pub fn new(domain: &'a str, rule: &'a str, sink: &'a mut Vec<RecordedDeprecation>) -> Self {
        Self { domain, rule, sink }
    }

    pub fn add(&mut self, message: impl Into<DeprecationMessage>) {
        self.sink.push(RecordedDeprecation {
            domain: self.domain.to_string(),
            rule: self.rule.to_string(),
            message: message.into(),
        });
    }
}

/// A unit of deprecation logic.
pub trait ConfigDeprecation: Send + Sync {
    /// A short name identifying the rule in logs and errors.
    fn name(&self) -> &str;

    fn apply(
        &self,
        settings: &mut Value,
        ctx: &DeprecationContext<'_>,
        collector: &mut DeprecationCollector<'_>,
    ) -> Result<(), Error>;
}

/// An owned, type-erased rule as stored in the registry.
pub struct Deprecation(Box<dyn ConfigDeprecation>);

impl Deprecation {
    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn apply(
        &self,
        settings: &mut Value,
        ctx: &DeprecationContext<'_>,
        collector: &mut DeprecationCollector<'_>,
    ) -> Result<(), Error> {
        self.0.apply(settings, ctx, collector)
    }
}

impl<T: ConfigDeprecation + 'static> From<T> for Deprecation {
    fn from(rule: T) -> Self {
        Deprecation(Box::new(rule))
    }
}

impl fmt::Debug for Deprecation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Deprecation").field(&self.name()).finish()
    }
}

/// A rule backed by an arbitrary function, for checks that are not a
/// rename or a removal.
pub struct CustomDeprecation<F> {
    name: String,
    f: F,
}

impl<F> CustomDeprecation<F>
where
    F: Fn(&mut Value, &DeprecationContext<'_>, &mut DeprecationCollector<'_>) -> Result<(), Error>
        + Send
        + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> ConfigDeprecation for CustomDeprecation<F>
where
    F: Fn(&mut Value, &DeprecationContext<'_>, &mut DeprecationCollector<'_>) -> Result<(), Error>
        + Send
        + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(
        &self,
        settings: &mut Value,
        ctx: &DeprecationContext<'_>,
        collector: &mut DeprecationCollector<'_>,
    ) -> Result<(), Error> {
        (self.f)(settings, ctx, collector)
    }
}

/// Builds a `Vec<Deprecation>` from rules of any concrete type.
///
/// ```rust
/// use config_deprecation::{deprecations, factory::ConfigDeprecationFactory};
///
/// let factory = ConfigDeprecationFactory::new("monitoring");
/// let rules = deprecations![
///     factory.rename("enabled", "ui.enabled"),
///     factory.unused_from_root("optimize.lazy"),
/// ];
/// assert_eq!(rules.len(), 2);
/// ```
#[macro_export]
macro_rules! deprecations {
    ($($rule:expr),* $(,)?) => {
        vec![$($crate::rule::Deprecation::from($rule)),*]
    };
}
